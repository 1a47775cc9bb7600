//! `islet config`: locate, show, and initialize the config file.

use islet_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;
use crate::output::print_output;

pub fn handle(args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => print_output(&islet_config::config_path().display().to_string()),
        ConfigCommand::Show => {
            let cfg = islet_config::load_config()?;
            print_output(toml::to_string_pretty(&cfg)?.trim_end())
        }
        ConfigCommand::Init { force } => {
            let path = islet_config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            let written = islet_config::save_config(&Config::default())?;
            print_output(&format!("Wrote {}", written.display()))
        }
    }
}
