//! Reconciled list commands: print every envelope until the server answers.

use std::pin::pin;

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tracing::debug;

use islet_core::{Community, Feed, Forum, LoadingStatus, Notice, Origin, Repository, Resource, Timeline};

use crate::cli::{OutputFormat, RefreshArgs};
use crate::error::CliError;
use crate::output::{print_output, render_envelope, snippet};

pub async fn communities(
    repo: &Repository,
    args: &RefreshArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    drain(repo.communities(args.refresh), format, community_line).await
}

pub async fn timelines(
    repo: &Repository,
    args: &RefreshArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    drain(repo.timelines(args.refresh), format, |t: &Timeline| {
        format!("{}\t{}\t{} pages", t.id, t.display_name, t.max_page)
    })
    .await
}

pub async fn notice(
    repo: &Repository,
    args: &RefreshArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    drain(repo.notice(args.refresh), format, |n: &Notice| n.content.clone()).await
}

pub async fn feeds(
    repo: &Repository,
    uuid: &str,
    args: &RefreshArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let stream = repo.feeds(uuid, args.refresh)?;
    drain(stream, format, |f: &Feed| {
        let headline = if f.title.is_empty() || f.title == "无标题" {
            snippet(&f.content, 40)
        } else {
            f.title.clone()
        };
        format!("No.{}\t{}", f.id, headline)
    })
    .await
}

fn community_line(c: &Community) -> String {
    let boards: Vec<&str> = c.forums.iter().map(Forum::display_name).collect();
    format!("{}\t{}\t{}", c.id, c.name, boards.join(", "))
}

/// Print envelopes until the remote branch has finished. A remote error
/// becomes the command's error; in plain mode miette prints it on the way out.
async fn drain<T: Serialize>(
    stream: impl Stream<Item = Resource<Vec<T>>>,
    format: OutputFormat,
    line: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    let mut stream = pin!(stream);
    while let Some(envelope) = stream.next().await {
        let remote_done = envelope.origin == Origin::Remote && envelope.status.is_terminal();
        let failed = envelope.status == LoadingStatus::Error;

        if !failed || format == OutputFormat::Json {
            print_output(&render_envelope(format, &envelope, &line)?)?;
        }

        if remote_done {
            debug!(status = %envelope.status, "remote branch finished");
            if failed {
                return Err(CliError::Rejected {
                    message: envelope.message.unwrap_or_default(),
                });
            }
            break;
        }
    }
    Ok(())
}
