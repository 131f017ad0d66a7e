//! GitHub CLI (`gh`) fallback for pull request listing and diffs.
//!
//! `gh` is optional. Every call here degrades to an empty result when the
//! binary is missing or fails.

use crate::data::{PrStatus, PullRequest};
use serde::Deserialize;
use tokio::process::Command;

pub const NO_DIFF: &str = "No diff available.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    author: Option<GhAuthor>,
    #[serde(default)]
    head_ref_name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    #[serde(default)]
    login: String,
}

pub fn gh_available() -> bool {
    which::which("gh").is_ok()
}

/// Map a `gh` PR state onto the tracker's vocabulary.
pub fn map_gh_state(state: &str) -> PrStatus {
    match state.to_ascii_uppercase().as_str() {
        "MERGED" => PrStatus::Merged,
        "CLOSED" => PrStatus::Declined,
        _ => PrStatus::Open,
    }
}

/// Parse `gh pr list --json title,url,author,headRefName,state,updatedAt` output.
pub fn parse_gh_pr_list(json: &str) -> Vec<PullRequest> {
    let items: Vec<GhPullRequest> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!("Unparseable gh output: {}", e);
            return Vec::new();
        }
    };
    items
        .into_iter()
        .map(|item| PullRequest {
            status: map_gh_state(&item.state),
            author: item.author.map(|a| a.login).unwrap_or_default(),
            repository: String::new(),
            source_branch: item.head_ref_name,
            destination_branch: String::new(),
            title: item.title,
            url: item.url,
            last_update: item.updated_at,
        })
        .collect()
}

/// Pull requests whose search text matches `ticket`, across all states.
pub async fn list_prs_for_ticket(ticket: &str) -> Vec<PullRequest> {
    if !gh_available() {
        tracing::warn!("gh not found on PATH, skipping GitHub PR lookup");
        return Vec::new();
    }
    let output = Command::new("gh")
        .args([
            "pr",
            "list",
            "--search",
            ticket,
            "--state",
            "all",
            "--json",
            "title,url,author,headRefName,state,updatedAt",
        ])
        .output()
        .await;

    match output {
        Ok(o) if o.status.success() => parse_gh_pr_list(&String::from_utf8_lossy(&o.stdout)),
        Ok(o) => {
            tracing::debug!("gh pr list failed: {}", String::from_utf8_lossy(&o.stderr).trim());
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to run gh: {}", e);
            Vec::new()
        }
    }
}

/// Unified diff of a pull request, or `None` when unavailable.
pub async fn pr_diff(url: &str) -> Option<String> {
    if url.is_empty() || !gh_available() {
        return None;
    }
    let output = Command::new("gh").args(["pr", "diff", url]).output().await.ok()?;
    if !output.status.success() || output.stdout.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}
