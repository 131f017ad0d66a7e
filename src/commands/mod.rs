//! CLI subcommands. `main` only parses arguments and calls into here.
//!
//! Core modules return typed errors; this layer turns them into user-facing
//! messages with `anyhow` context. A stop with a fixed message and no
//! `Error:` prefix is an [`Exit`].

pub mod branch;
pub mod config;
pub mod fmt;
pub mod shell;
pub mod stage;
pub mod sync;
pub mod ticket;

use crate::config::ConfigStore;
use crate::filters::FilterSession;
use crate::git::{Git, GitError};
use crate::integrations::fetch::{collect_extra_fields, fetch_issues_for_projects, fetch_issues_with_jql};
use crate::integrations::jira::{FieldCatalog, JiraClient};
use crate::ticket::TicketStore;
use crate::tui::branch_picker::BranchPrompt;
use crate::tui::ticket_picker::{TicketOutcome, TicketPicker, TicketPickerInput};
use crate::tui::{run_screen, ContextBar};
use anyhow::{bail, Result};
use std::io::{self, Write};
use thiserror::Error;

/// Default cap on fetched issues.
pub const DEFAULT_MAX_RESULTS: usize = 200;

/// Stop the command with `message` on stderr and exit status 1.
///
/// Cancelling a picker is usually not an error; only flows that cannot
/// continue without an answer use this.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Exit(pub String);

impl Exit {
    pub fn err(message: impl Into<String>) -> anyhow::Error {
        Self(message.into()).into()
    }
}

/// Everything one invocation works against.
pub struct Context {
    pub store: ConfigStore,
    pub tickets: TicketStore,
    pub session: FilterSession,
    pub git: Git,
}

impl Context {
    pub fn load() -> Result<Self> {
        Ok(Self {
            store: ConfigStore::open_default()?,
            tickets: TicketStore::open_default()?,
            session: FilterSession::new(),
            git: Git::new(),
        })
    }

    pub fn client(&self) -> Result<JiraClient> {
        Ok(JiraClient::from_config(&self.store)?)
    }

    pub fn projects(&self) -> Vec<String> {
        self.store.projects()
    }

    fn context_bar(&self, ticket: Option<String>) -> ContextBar {
        ContextBar::new(ticket, self.git.current_branch())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal prompts
// ─────────────────────────────────────────────────────────────────────────────

/// Ask until a non-empty answer is given.
pub(crate) fn prompt(label: &str) -> Result<String> {
    loop {
        print!("{label}: ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err(Exit::err("Aborted."));
        }
        let answer = input.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

pub(crate) fn parse_confirm(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

pub(crate) fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{question} {hint}: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_confirm(&input, default))
}

/// Stderr of a failed git command, else the error text.
pub(crate) fn git_stderr(err: &GitError) -> String {
    match err {
        GitError::Command { stderr, .. } | GitError::DirtyWorktree { stderr } => stderr.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared flows
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) enum TicketPick {
    NoIssues,
    Selected(String),
    Cancelled,
}

async fn field_catalog(client: &JiraClient, extra_fields: &[String]) -> FieldCatalog {
    if extra_fields.is_empty() {
        return FieldCatalog::default();
    }
    client.list_fields().await.unwrap_or_else(|e| {
        tracing::warn!("Could not load field names: {}", e);
        FieldCatalog::default()
    })
}

/// Fetch issues and run the ticket picker, re-fetching whenever it asks to reload.
pub(crate) async fn pick_ticket(
    ctx: &mut Context,
    client: &JiraClient,
    jql: Option<&str>,
    max_results: usize,
) -> Result<TicketPick> {
    let projects = ctx.projects();
    loop {
        let extra_fields = collect_extra_fields(&ctx.store, &projects);
        let issues = match jql {
            Some(jql) => fetch_issues_with_jql(client, jql, max_results, &extra_fields).await?,
            None => {
                fetch_issues_for_projects(
                    client,
                    &ctx.store,
                    &ctx.session,
                    &projects,
                    max_results,
                    &extra_fields,
                )
                .await?
            }
        };
        if issues.is_empty() {
            return Ok(TicketPick::NoIssues);
        }

        let input = TicketPickerInput {
            issues,
            catalog: field_catalog(client, &extra_fields).await,
            extra_fields,
            projects: projects.clone(),
            context: ctx.context_bar(ctx.tickets.current()),
        };
        let mut picker = TicketPicker::new(&mut ctx.store, &mut ctx.session, client.clone(), input);
        match run_screen(&mut picker).await? {
            TicketOutcome::Selected(key) => return Ok(TicketPick::Selected(key)),
            TicketOutcome::Cancelled => return Ok(TicketPick::Cancelled),
            TicketOutcome::Reload => eprintln!("Reloading with updated fields…"),
        }
    }
}

/// The active ticket, or one chosen in the picker (and persisted).
pub(crate) async fn ensure_ticket(ctx: &mut Context) -> Result<String> {
    if let Some(ticket) = ctx.tickets.current() {
        return Ok(ticket);
    }
    let client = ctx.client()?;
    eprintln!("No ticket set — fetching tickets…");
    match pick_ticket(ctx, &client, None, DEFAULT_MAX_RESULTS).await? {
        TicketPick::NoIssues => bail!("No issues found."),
        TicketPick::Cancelled => Err(Exit::err("No ticket selected.")),
        TicketPick::Selected(key) => {
            ctx.tickets.save(&key, &ctx.projects())?;
            eprintln!("Ticket set to {key}");
            Ok(key)
        }
    }
}

/// `switch -C name [base]`, announcing what is created.
pub(crate) fn create_branch(git: &Git, name: &str, base: Option<&str>) -> Result<()> {
    match base {
        Some(base) => println!("Creating branch: {name} (from {base})"),
        None => println!("Creating branch: {name}"),
    }
    git.switch_create(name, base)?;
    Ok(())
}

pub(crate) fn switch_branch(git: &Git, name: &str) -> Result<()> {
    match git.switch(name) {
        Ok(()) => {
            println!("Switched to branch: {name}");
            Ok(())
        }
        Err(e) => bail!("Failed to switch to '{name}':\n{}", git_stderr(&e)),
    }
}

/// Show the branch prompt for `ticket` and create `TICKET-<suffix>` from the default branch.
/// Returns false when the prompt was cancelled.
pub(crate) async fn prompt_new_branch(ctx: &Context, ticket: &str) -> Result<bool> {
    let mut prompt = BranchPrompt::new(ticket, Some(ctx.client()?));
    prompt.load_info();
    let Some(suffix) = run_screen(&mut prompt).await? else {
        eprintln!("Cancelled.");
        return Ok(false);
    };
    let base = ctx.git.default_branch();
    create_branch(&ctx.git, &format!("{ticket}-{suffix}"), Some(&base))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirm_defaults() {
        assert!(parse_confirm("", true));
        assert!(!parse_confirm("\n", false));
        assert!(parse_confirm("Y\n", false));
        assert!(!parse_confirm("no", true));
        assert!(!parse_confirm("maybe", false));
    }

    #[test]
    fn test_git_stderr_prefers_raw_stderr() {
        let err = GitError::Command {
            command: "switch".into(),
            stderr: "fatal: invalid reference: nope".into(),
        };
        assert_eq!(git_stderr(&err), "fatal: invalid reference: nope");
        assert_eq!(
            git_stderr(&GitError::NotARepository),
            "Not a git repository or git not available."
        );
    }

    #[test]
    fn test_exit_message_is_verbatim() {
        let err = Exit::err("Cancelled.");
        assert_eq!(err.to_string(), "Cancelled.");
        assert!(err.downcast_ref::<Exit>().is_some());
    }
}
