//! `jg branch`: create, pick and switch ticket branches.

use super::{create_branch, ensure_ticket, prompt_new_branch, switch_branch, Context};
use crate::git::is_protected_branch;
use crate::git::branches::BranchDescriptor;
use crate::ticket::{branch_in_projects, ticket_from_branch};
use crate::tui::branch_picker::{BranchOutcome, BranchPicker};
use crate::tui::{run_screen, ContextBar};
use anyhow::{bail, Result};

pub async fn run(ctx: &mut Context, name: Option<String>, all: bool) -> Result<()> {
    if all && name.is_none() {
        return pick_any_project_branch(ctx).await;
    }

    let ticket = ensure_ticket(ctx).await?;
    if let Some(name) = name {
        let base = ctx.git.default_branch();
        return create_branch(&ctx.git, &format!("{ticket}-{name}"), Some(&base));
    }

    if ctx.git.current_branch().is_some_and(|b| is_protected_branch(&b))
        && !prompt_new_branch(ctx, &ticket).await?
    {
        return Ok(());
    }

    let branches = ctx.git.ticket_branches(&ticket)?;
    if branches.is_empty() {
        return Ok(());
    }
    match pick_branch(ctx, branches, Some(ticket.clone())).await? {
        BranchOutcome::Switch(branch) => switch_branch(&ctx.git, &branch),
        BranchOutcome::NewBranch => prompt_new_branch(ctx, &ticket).await.map(drop),
        BranchOutcome::Cancelled => Ok(()),
    }
}

async fn pick_branch(
    ctx: &Context,
    branches: Vec<BranchDescriptor>,
    ticket: Option<String>,
) -> Result<BranchOutcome> {
    let mut picker = BranchPicker::new(ctx.git.clone(), branches, ContextBar::detect(ticket));
    run_screen(&mut picker).await
}

/// `--all`: any local branch of a configured project; picking one also sets the ticket.
async fn pick_any_project_branch(ctx: &mut Context) -> Result<()> {
    let projects = ctx.projects();
    if projects.is_empty() {
        bail!("No projects configured. Run: jg config set projects MYPROJECT");
    }
    let branches = ctx
        .git
        .local_branch_descriptors(|name| branch_in_projects(name, &projects))?;
    if branches.is_empty() {
        println!("No local branches found for projects: {}.", projects.join(", "));
        return Ok(());
    }

    let selected = match pick_branch(ctx, branches, ctx.tickets.current()).await? {
        BranchOutcome::Switch(branch) => branch,
        BranchOutcome::NewBranch => {
            let ticket = ensure_ticket(ctx).await?;
            return prompt_new_branch(ctx, &ticket).await.map(drop);
        }
        BranchOutcome::Cancelled => {
            eprintln!("No branch selected.");
            return Ok(());
        }
    };

    if let Some(ticket) = ticket_from_branch(&selected, &projects) {
        ctx.tickets.save(&ticket, &projects)?;
        println!("Ticket set to {ticket}");
    }
    switch_branch(&ctx.git, &selected)
}
