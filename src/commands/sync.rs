//! Keeping branches current: `jg reset`, `jg sync`, `jg prune`.

use super::{confirm, git_stderr, switch_branch, Context, Exit};
use crate::git::GitError;
use crate::tui::prune::PrunePicker;
use crate::tui::{run_screen, ContextBar};
use anyhow::{anyhow, bail, Result};

const ABORTED: &str = "Aborted!";

const REBASE_CONFLICT: &str = "\nRebase conflict detected. Resolve the conflicts then run:\n  \
                               git rebase --continue\nOr to cancel:\n  git rebase --abort";

/// Switch to the default branch and pull it, stashing local changes if needed.
pub fn reset(ctx: &Context) -> Result<()> {
    let git = &ctx.git;
    let default = git.default_branch();
    let mut stashed = false;

    if git.current_branch().as_deref() != Some(default.as_str()) {
        println!("Switching to {default}…");
        match git.switch(&default) {
            Ok(()) => {}
            Err(GitError::DirtyWorktree { stderr }) => {
                eprintln!("{stderr}");
                if !confirm("Stash your local changes and continue?", false)? {
                    return Err(Exit::err(ABORTED));
                }
                git.stash_push()?;
                stashed = true;
                git.switch(&default)
                    .map_err(|e| anyhow!("Still could not switch to {default}:\n{}", git_stderr(&e)))?;
            }
            Err(e) => {
                eprintln!("{}", git_stderr(&e));
                return Err(Exit::err(ABORTED));
            }
        }
    }

    println!("Pulling latest from origin/{default}…");
    if !git.pull(&default)? {
        if stashed {
            eprintln!("\nYour changes are safely stashed. Run 'git stash pop' to restore them.");
        }
        return Err(Exit::err(ABORTED));
    }

    if stashed && confirm("Restore your stashed changes?", true)? {
        match git.stash_pop() {
            Ok(()) => println!("Stashed changes restored."),
            Err(e) => {
                eprintln!("{}", git_stderr(&e));
                eprintln!("Stash pop had conflicts — resolve them, then run 'git stash drop'.");
            }
        }
    }
    Ok(())
}

/// Rebase the current branch onto the freshly fetched default branch.
pub fn sync(ctx: &Context) -> Result<()> {
    let git = &ctx.git;
    let Some(current) = git.current_branch() else {
        bail!("Not on a branch (detached HEAD).");
    };
    let default = git.default_branch();
    if current == default {
        bail!("Already on {default}. Use 'jg reset' to pull the latest.");
    }

    println!("Fetching origin…");
    git.fetch_origin()
        .map_err(|e| anyhow!("Fetch failed:\n{}", git_stderr(&e)))?;

    println!("Rebasing {current} onto origin/{default}…");
    if !git.rebase_onto_origin(&default)? {
        eprintln!("{REBASE_CONFLICT}");
        return Err(Exit::err(ABORTED));
    }
    println!("Done. {current} is up to date with origin/{default}.");
    Ok(())
}

/// Pick stale local branches to delete.
pub async fn prune(ctx: &Context) -> Result<()> {
    let git = &ctx.git;
    println!("Fetching and pruning remote refs…");
    git.fetch_prune()
        .map_err(|e| anyhow!("Fetch failed:\n{}", git_stderr(&e)))?;

    let candidates = git.prune_candidates()?;
    if candidates.is_empty() {
        println!("No prunable local branches found.");
        return Ok(());
    }

    let mut picker = PrunePicker::new(git.clone(), candidates, ContextBar::detect(ctx.tickets.current()));
    let outcome = run_screen(&mut picker).await?;
    if !outcome.deleted.is_empty() {
        println!(
            "Deleted {} branch(es): {}",
            outcome.deleted.len(),
            outcome.deleted.join(", ")
        );
    }
    if let Some(branch) = outcome.switch_to {
        switch_branch(git, &branch)?;
    }
    Ok(())
}
