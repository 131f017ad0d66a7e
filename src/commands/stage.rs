//! `jg add`, `jg commit`, `jg push`.

use super::{create_branch, ensure_ticket, prompt, prompt_new_branch, Context, Exit};
use crate::data::PrStatus;
use crate::git::staging::{StageOps, StagingSession};
use crate::git::{is_protected_branch, Git, GitError};
use crate::tui::file_picker::{FilePicker, FilePickerOutcome};
use crate::tui::{run_screen, ContextBar};
use crate::util::open_url;
use anyhow::Result;

/// Config flag: run the formatters before the commit prompt in `jg add`.
pub const FMT_ON_ADD: &str = "fmt_on_add";
/// Config flag: open the PR (or git's suggested URL) after `jg push`.
pub const OPEN_ON_PUSH: &str = "open_on_push";

/// Lines printed after applying staging operations.
pub fn summarize_ops(ops: &StageOps) -> Vec<String> {
    let mut lines = Vec::new();
    if !ops.to_stage.is_empty() {
        lines.push(format!("Staged {} file(s):", ops.to_stage.len()));
        lines.extend(ops.to_stage.iter().map(|f| format!("  + {f}")));
    }
    if !ops.to_unstage.is_empty() {
        lines.push(format!("Unstaged {} file(s):", ops.to_unstage.len()));
        lines.extend(ops.to_unstage.iter().map(|f| format!("  - {f}")));
    }
    lines
}

fn apply_ops(git: &Git, ops: &StageOps) -> Result<()> {
    let to_stage: Vec<String> = ops.to_stage.iter().cloned().collect();
    let to_unstage: Vec<String> = ops.to_unstage.iter().cloned().collect();
    git.add(&to_stage)?;
    git.restore_staged(&to_unstage)?;
    for line in summarize_ops(ops) {
        println!("{line}");
    }
    Ok(())
}

/// True when `branch` starts with `ticket`, ignoring case.
pub fn is_ticket_branch(branch: Option<&str>, ticket: &str) -> bool {
    branch.is_some_and(|b| b.to_lowercase().starts_with(&ticket.to_lowercase()))
}

pub async fn add(ctx: &mut Context) -> Result<()> {
    let ticket = ensure_ticket(ctx).await?;
    if ctx.git.current_branch().is_some_and(|b| is_protected_branch(&b))
        && !prompt_new_branch(ctx, &ticket).await?
    {
        return Ok(());
    }

    let statuses = ctx.git.file_statuses()?;
    if statuses.is_clean() {
        println!("Nothing to do — working tree clean.");
        return Ok(());
    }

    let mut picker = FilePicker::new(
        ctx.git.clone(),
        StagingSession::new(&statuses),
        ctx.store.formatters(),
        ctx.store.flag(FMT_ON_ADD, false),
        ContextBar::detect(Some(ticket.clone())),
    );
    let (ops, commit_message) = match run_screen(&mut picker).await? {
        FilePickerOutcome::Aborted => {
            eprintln!("Aborted.");
            return Ok(());
        }
        FilePickerOutcome::Apply { ops, commit_message } => (ops, commit_message),
    };

    apply_ops(&ctx.git, &ops)?;

    match commit_message {
        Some(message) => {
            if !is_ticket_branch(ctx.git.current_branch().as_deref(), &ticket) {
                let suffix = prompt(&format!(
                    "Not on a {ticket} branch. Branch suffix (will create {ticket}-<suffix>)"
                ))?;
                create_branch(&ctx.git, &format!("{ticket}-{suffix}"), None)?;
            }
            commit(&ctx.git, &format!("{ticket} {message}"), true, &[])
        }
        None if ops.is_empty() => {
            eprintln!("No changes made.");
            Ok(())
        }
        None => Ok(()),
    }
}

/// git has already shown its own output when an interactive commit fails.
fn commit(git: &Git, message: &str, no_verify: bool, extra: &[String]) -> Result<()> {
    match git.commit(message, no_verify, extra) {
        Err(GitError::Command { .. }) => Err(Exit::err(String::new())),
        other => Ok(other?),
    }
}

/// `jg commit MESSAGE [GIT_ARGS...]`
pub fn commit_with_ticket(ctx: &Context, message: &str, git_args: &[String]) -> Result<()> {
    ctx.git.ensure_not_protected()?;
    let ticket = ctx
        .tickets
        .current()
        .ok_or_else(|| Exit::err("No ticket set. Use 'jg set TICKET-123' first."))?;
    commit(&ctx.git, &format!("{ticket} {message}"), false, git_args)
}

pub async fn push(ctx: &mut Context) -> Result<()> {
    let ticket = ensure_ticket(ctx).await?;
    let outcome = match ctx.git.push_upstream() {
        Ok(outcome) => outcome,
        Err(GitError::Command { stderr, .. }) => {
            eprintln!("{stderr}");
            return Err(Exit::err(String::new()));
        }
        Err(e) => return Err(e.into()),
    };
    eprint!("{}", outcome.stderr);

    if !ctx.store.flag(OPEN_ON_PUSH, true) {
        return Ok(());
    }
    if let Some(url) = open_pr_url(ctx, &ticket).await {
        println!("Opening PR: {url}");
        return open_url(&url);
    }
    if let Some(url) = outcome.url {
        println!("Opening: {url}");
        open_url(&url)?;
    }
    Ok(())
}

/// URL of the ticket's first open PR. Tracker failures only mean there is nothing to open.
async fn open_pr_url(ctx: &Context, ticket: &str) -> Option<String> {
    let lookup = async {
        let client = ctx.client()?;
        let issue_id = client.issue_id(ticket).await?;
        Ok::<_, anyhow::Error>(client.pull_requests(&issue_id).await?)
    };
    match lookup.await {
        Ok(prs) => prs
            .into_iter()
            .find(|pr| pr.status == PrStatus::Open)
            .map(|pr| pr.url),
        Err(e) => {
            tracing::debug!("Skipping PR lookup: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summarize_ops() {
        let ops = StageOps {
            to_stage: ["b.rs".to_string(), "a.rs".to_string()].into_iter().collect(),
            to_unstage: ["c.rs".to_string()].into_iter().collect(),
        };
        assert_eq!(
            summarize_ops(&ops),
            vec!["Staged 2 file(s):", "  + a.rs", "  + b.rs", "Unstaged 1 file(s):", "  - c.rs"]
        );
        assert!(summarize_ops(&StageOps::default()).is_empty());
    }

    #[test]
    fn test_is_ticket_branch() {
        assert!(is_ticket_branch(Some("swy-12-login"), "SWY-12"));
        assert!(!is_ticket_branch(Some("main"), "SWY-12"));
        assert!(!is_ticket_branch(None, "SWY-12"));
    }
}
