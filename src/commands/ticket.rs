//! Ticket commands: show/set/clear the active ticket and look it up in the tracker.

use super::{ensure_ticket, git_stderr, pick_ticket, switch_branch, Context, Exit, TicketPick};
use crate::data::{sort_pull_requests, TicketDetails};
use crate::filters::migrate_legacy_jql;
use crate::integrations::github;
use crate::integrations::jira::{browse_url, non_empty_fields};
use crate::ticket::validate_ticket_project;
use crate::tui::pr_picker::{PrOutcome, PrPicker};
use crate::tui::{run_screen, ContextBar};
use crate::util::open_url;
use anyhow::{bail, Context as _, Result};
use serde_json::Value;

const NO_TICKET: &str = "No ticket set. Use 'jg set TICKET-123' to set one.";

/// `jg` with no subcommand.
pub fn show(ctx: &Context) -> Result<()> {
    match ctx.tickets.current() {
        Some(ticket) => {
            println!("{ticket}");
            Ok(())
        }
        None => Err(Exit::err(NO_TICKET)),
    }
}

/// `jg set [TICKET]`: set directly, or browse the tracker and pick one.
pub async fn set(ctx: &mut Context, ticket: Option<String>, jql: Option<String>, max_results: usize) -> Result<()> {
    let projects = ctx.projects();
    if let Some(ticket) = ticket {
        validate_ticket_project(&ticket, &projects)?;
        ctx.tickets.save(&ticket, &projects)?;
        println!("Ticket set to {ticket}");
        return Ok(());
    }

    let client = ctx.client()?;
    for project in migrate_legacy_jql(&mut ctx.store, &mut ctx.session, &projects)? {
        eprintln!("Migrated jql.{project} to a named filter 'Default'.");
    }

    eprintln!("Fetching tickets…");
    match pick_ticket(ctx, &client, jql.as_deref(), max_results).await? {
        TicketPick::NoIssues => {
            println!("No issues found.");
            Ok(())
        }
        TicketPick::Cancelled => {
            eprintln!("No ticket selected.");
            Ok(())
        }
        TicketPick::Selected(key) => {
            ctx.tickets.save(&key, &projects)?;
            println!("Ticket set to {key}");
            Ok(())
        }
    }
}

pub fn clear(ctx: &Context) -> Result<()> {
    ctx.tickets.clear()?;
    println!("Ticket cleared");
    Ok(())
}

fn ticket_or_current(ctx: &Context, ticket: Option<String>) -> Result<String> {
    ticket.or_else(|| ctx.tickets.current()).ok_or_else(|| Exit::err(NO_TICKET))
}

/// Plain-text ticket summary for `jg info`.
pub fn render_ticket_info(details: &TicketDetails, url: &str) -> String {
    let mut out = format!("{}  {}\n\n", details.key, details.summary);
    out.push_str(&format!("  Status:    {:<20}Priority: {}\n", details.status, details.priority_label()));
    out.push_str(&format!(
        "  Assignee:  {:<20}Reporter: {}\n",
        details.assignee_label(),
        details.reporter_label()
    ));
    out.push_str(&format!("  Labels:    {}\n", details.labels_label()));
    out.push_str(&format!("  URL:       {url}\n"));

    let (description, truncated) = details.description_excerpt();
    if !description.is_empty() {
        out.push_str("\nDescription:\n");
        for line in description.lines() {
            out.push_str(&format!("  {line}\n"));
        }
        if truncated {
            out.push_str("  …truncated\n");
        }
    }
    out
}

pub async fn info(ctx: &Context, ticket: Option<String>) -> Result<()> {
    let key = ticket_or_current(ctx, ticket)?;
    let client = ctx.client()?;
    let details = client.ticket_details(&key).await?;
    print!("{}", render_ticket_info(&details, &client.browse_url(&key)));
    Ok(())
}

pub fn open(ctx: &Context, ticket: Option<String>) -> Result<()> {
    let key = ticket_or_current(ctx, ticket)?;
    let url = browse_url(&ctx.store.server()?, &key);
    println!("Opening {url}");
    open_url(&url)
}

/// `jg debug TICKET`: the non-empty raw fields as pretty JSON.
pub async fn debug(ctx: &Context, ticket: &str) -> Result<()> {
    let client = ctx.client()?;
    let (key, fields) = client.raw_issue(ticket).await?;
    let summary = fields.get("summary").and_then(Value::as_str).unwrap_or_default();
    println!("\n{key}  {summary}\n");
    let pretty = serde_json::to_string_pretty(&Value::Object(non_empty_fields(&fields)))
        .context("Failed to render issue fields")?;
    println!("{pretty}");
    Ok(())
}

/// Switch to `branch`, creating it from the default branch when it only exists remotely.
fn switch_or_create(ctx: &Context, branch: &str) -> Result<()> {
    if ctx.git.verify_ref(branch) {
        return switch_branch(&ctx.git, branch);
    }
    let default = ctx.git.default_branch();
    eprintln!("Branch '{branch}' not found locally. Creating from {default}…");
    match ctx.git.switch_new(branch, &default) {
        Ok(()) => {
            println!("Created and switched to branch: {branch} (from {default})");
            Ok(())
        }
        Err(e) => bail!("Failed to create branch '{branch}' from {default}:\n{}", git_stderr(&e)),
    }
}

/// `jg prs [TICKET]`: linked pull requests, falling back to `gh` when the tracker has none.
pub async fn prs(ctx: &mut Context, ticket: Option<String>) -> Result<()> {
    let key = match ticket {
        Some(ticket) => ticket,
        None => ensure_ticket(ctx).await?,
    };
    let client = ctx.client()?;
    eprintln!("Fetching PRs for {key}…");
    let issue_id = client.issue_id(&key).await?;
    let mut prs = client
        .pull_requests(&issue_id)
        .await
        .context("Failed to fetch PRs")?;
    if prs.is_empty() && github::gh_available() {
        tracing::debug!("No linked PRs in the tracker, asking gh");
        prs = github::list_prs_for_ticket(&key).await;
    }
    if prs.is_empty() {
        println!("No PRs linked to {key}.");
        return Ok(());
    }

    sort_pull_requests(&mut prs);
    let mut picker = PrPicker::new(prs, ContextBar::detect(Some(key)));
    match run_screen(&mut picker).await? {
        PrOutcome::Closed => Ok(()),
        PrOutcome::Switch(branch) => switch_or_create(ctx, &branch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn details() -> TicketDetails {
        TicketDetails {
            key: "SWY-7".into(),
            summary: "Fix login".into(),
            status: "In Progress".into(),
            assignee: Some("Ana".into()),
            labels: vec!["auth".into(), "web".into()],
            description: Some("Users cannot log in.\nSee logs.".into()),
            ..TicketDetails::default()
        }
    }

    #[test]
    fn test_render_ticket_info() {
        let text = render_ticket_info(&details(), "https://acme.atlassian.net/browse/SWY-7");
        assert_eq!(
            text,
            "SWY-7  Fix login\n\n\
             \x20 Status:    In Progress         Priority: —\n\
             \x20 Assignee:  Ana                 Reporter: Unknown\n\
             \x20 Labels:    auth, web\n\
             \x20 URL:       https://acme.atlassian.net/browse/SWY-7\n\
             \nDescription:\n\
             \x20 Users cannot log in.\n\
             \x20 See logs.\n"
        );
    }

    #[test]
    fn test_render_ticket_info_without_description() {
        let mut d = details();
        d.description = None;
        assert!(!render_ticket_info(&d, "u").contains("Description"));
    }
}
