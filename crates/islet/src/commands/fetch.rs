//! One-shot remote reads: threads, search, and the release check.

use chrono::NaiveDateTime;
use serde::Serialize;

use islet_core::{Comment, LoadingStatus, Post, Release, Repository, Resource, SearchResult};

use crate::cli::{OutputFormat, SearchArgs, ThreadArgs};
use crate::error::CliError;
use crate::output::{print_output, render_single, snippet};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn thread(
    repo: &Repository,
    args: &ThreadArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let resource = repo.thread(&args.id, args.page).await?;
    show(format, resource, render_post)
}

pub async fn search(
    repo: &Repository,
    args: &SearchArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let resource = repo.search(&args.query, args.page).await?;
    show(format, resource, render_search)
}

pub async fn release(repo: &Repository, format: OutputFormat) -> Result<(), CliError> {
    let resource = repo.latest_release().await;
    show(format, resource, |r: &Release| {
        let mut out = format!("{}\n{}", r.tag_name, r.html_url);
        if !r.body.trim().is_empty() {
            out.push_str("\n\n");
            out.push_str(r.body.trim());
        }
        out
    })
}

/// Print a success, turn an error into `Rejected`. `NoData` prints its
/// message (or nothing) and is not a failure.
fn show<T: Serialize>(
    format: OutputFormat,
    resource: Resource<T>,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    if resource.status == LoadingStatus::Error {
        return Err(CliError::Rejected {
            message: resource.message.unwrap_or_default(),
        });
    }
    match (&resource.data, format) {
        (Some(data), _) => print_output(&render_single(format, data, detail)?),
        (None, OutputFormat::Json) => print_output(&serde_json::to_string(&resource)?),
        (None, OutputFormat::Plain) => print_output(resource.message.as_deref().unwrap_or_default()),
    }
}

fn render_post(post: &Post) -> String {
    let mut out = header(&post.id, &post.userid, &post.now, &post.title, post.is_sage());
    out.push_str(&format!("  [{} replies]\n{}", post.reply_count, post.content));
    for reply in &post.replies {
        out.push_str("\n\n");
        out.push_str(&render_comment(reply));
    }
    out
}

fn render_comment(c: &Comment) -> String {
    let head = header(&c.id, &c.userid, &c.now, &c.title, c.sage == "1");
    let body: String = c
        .content
        .lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("  {head}\n{body}")
}

fn header(id: &str, userid: &str, now: &NaiveDateTime, title: &str, sage: bool) -> String {
    let mut out = format!("No.{id}  {userid}  {}", now.format(TIME_FORMAT));
    if !title.is_empty() && title != "无标题" {
        out.push_str(&format!("  {title}"));
    }
    if sage {
        out.push_str("  SAGE");
    }
    out
}

fn render_search(result: &SearchResult) -> String {
    let mut out = format!(
        "\"{}\": {} hits (page {})",
        result.query, result.query_hits, result.page
    );
    for hit in &result.hits {
        let target = if hit.resto.is_empty() || hit.resto == "0" {
            format!("No.{}", hit.id)
        } else {
            format!("No.{} in No.{}", hit.id, hit.resto)
        };
        out.push_str(&format!("\n{target}\t{}", snippet(&hit.content, 60)));
    }
    out
}
