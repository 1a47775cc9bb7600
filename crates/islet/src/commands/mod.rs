//! Command dispatch.

pub mod classify;
pub mod config_cmd;
mod fetch;
mod lists;

use std::path::PathBuf;

use islet_config::Config;
use islet_core::{ClientConfig, Repository, Stores, TlsVerification};
use tracing::debug;

use crate::cli::{Command, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Everything a networked command needs, after merging the config file
/// with command-line overrides.
pub struct Settings {
    pub client: ClientConfig,
    pub output: OutputFormat,
    pub feed_uuid: Option<String>,
    pub cache_dir: PathBuf,
}

impl Settings {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut cfg: Config = islet_config::load_config()?;
        if let Some(ref url) = global.base_url {
            cfg.base_url.clone_from(url);
        }
        if let Some(timeout) = global.timeout {
            cfg.timeout = timeout;
        }

        let mut client = cfg.to_client_config()?;
        if global.insecure {
            client.tls = TlsVerification::DangerAcceptInvalid;
        }

        Ok(Self {
            client,
            output: output_format(global, &cfg)?,
            cache_dir: cfg.resolved_cache_dir(),
            feed_uuid: cfg.feed_uuid,
        })
    }
}

/// `-o` wins; otherwise the config file's `output`.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    match cfg.output.as_str() {
        "plain" => Ok(OutputFormat::Plain),
        "json" => Ok(OutputFormat::Json),
        other => Err(CliError::Validation {
            field: "output".into(),
            reason: format!("expected 'plain' or 'json', got '{other}'"),
        }),
    }
}

pub async fn dispatch(cmd: Command, settings: &Settings) -> Result<(), CliError> {
    debug!(dir = %settings.cache_dir.display(), "opening list cache");
    let stores = Stores::open(&settings.cache_dir).await?;
    let repo = Repository::with_stores(&settings.client, stores)?;
    let format = settings.output;

    match cmd {
        Command::Communities(args) => lists::communities(&repo, &args, format).await,
        Command::Timelines(args) => lists::timelines(&repo, &args, format).await,
        Command::Notice(args) => lists::notice(&repo, &args, format).await,
        Command::Feeds(args) => {
            let uuid = args
                .uuid
                .clone()
                .or_else(|| settings.feed_uuid.clone())
                .ok_or_else(|| CliError::Validation {
                    field: "uuid".into(),
                    reason: "pass --uuid or set feed_uuid in the config file".into(),
                })?;
            lists::feeds(&repo, &uuid, &args.refresh, format).await
        }
        Command::Search(args) => fetch::search(&repo, &args, format).await,
        Command::Thread(args) => fetch::thread(&repo, &args, format).await,
        Command::Release => fetch::release(&repo, format).await,
        Command::Classify(_) | Command::Config(_) | Command::Completions(_) => {
            unreachable!("offline commands are handled before dispatch")
        }
    }
}
