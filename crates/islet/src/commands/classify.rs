//! `islet classify`: run the reply classifier over a saved body.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::debug;

use islet_api::{ClassifiedMessage, RawResponse, classify_payload};

use crate::cli::{ClassifyArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{print_output, render_single};

pub async fn handle(args: &ClassifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let body = read_body(&args.file).await?;
    debug!(bytes = body.len(), status = args.status, "classifying saved reply");

    let raw = RawResponse::new(args.status, body);
    let classified = classify_payload(&raw);
    let format = global.output.unwrap_or(OutputFormat::Plain);
    print_output(&render_single(format, &classified, describe)?)
}

async fn read_body(path: &Path) -> Result<Vec<u8>, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        Ok(buf)
    } else {
        Ok(tokio::fs::read(path).await?)
    }
}

fn describe(classified: &ClassifiedMessage) -> String {
    let mut out = format!(
        "kind: {}\ntype: {}\nmessage: {}",
        snake(&classified.kind),
        snake(&classified.message_type),
        classified.display_text()
    );
    if let Some(title) = classified.document.as_ref().and_then(|d| d.title.as_deref()) {
        out.push_str("\ntitle: ");
        out.push_str(title);
    }
    out
}

/// The serde name of a unit variant.
fn snake<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}
