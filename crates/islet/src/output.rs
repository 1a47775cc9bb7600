//! Output formatting: plain text or JSON lines.
//!
//! Plain output is for people; JSON emits one serde document per line so
//! a reconciled command's envelopes can be consumed as a stream.

use std::io::{self, Write};

use serde::Serialize;

use islet_core::{LoadingStatus, Origin, Resource};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Render one envelope of a reconciled list.
pub fn render_envelope<T: Serialize>(
    format: OutputFormat,
    envelope: &Resource<Vec<T>>,
    line: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string(envelope)?);
    }

    let origin = match envelope.origin {
        Origin::Local => "cache",
        Origin::Remote => "server",
    };
    let mut out = format!("# {origin}: {}", envelope.status);
    match (&envelope.data, envelope.status) {
        (Some(items), LoadingStatus::Success) => {
            for item in items {
                out.push('\n');
                out.push_str(&line(item));
            }
        }
        (_, LoadingStatus::Error) => {
            if let Some(message) = &envelope.message {
                out.push('\n');
                out.push_str(message);
            }
        }
        _ => {}
    }
    Ok(out)
}

/// Render a single value.
pub fn render_single<T: Serialize>(
    format: OutputFormat,
    data: &T,
    detail: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(data)?),
        OutputFormat::Plain => Ok(detail(data)),
    }
}

/// Print rendered output to stdout. Empty output prints nothing.
pub fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

/// First line of `text`, cut to `max` characters.
pub fn snippet(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= max {
        line.to_owned()
    } else {
        let cut: String = line.chars().take(max).collect();
        format!("{cut}…")
    }
}
