//! Tests against a real throwaway repository. Skipped when git is missing.

mod test_utils;

use jira_git_helper::git::branches::Tracking;
use jira_git_helper::git::{FileEntry, GitError};
use pretty_assertions::assert_eq;
use test_utils::{git_in, init_repo};

#[test]
fn test_clean_repo_then_changes() {
    let Some((dir, git)) = init_repo() else { return };
    assert!(git.file_statuses().unwrap().is_clean());

    std::fs::write(dir.path().join("README.md"), "changed\n").unwrap();
    std::fs::write(dir.path().join("new.txt"), "new\n").unwrap();
    let statuses = git.file_statuses().unwrap();

    assert_eq!(statuses.modified, vec![FileEntry::new('M', "README.md")]);
    assert_eq!(statuses.untracked, vec![FileEntry::new('?', "new.txt")]);
    assert_eq!(statuses.changed_paths(), vec!["README.md", "new.txt"]);
}

#[test]
fn test_add_and_restore_staged() {
    let Some((dir, git)) = init_repo() else { return };
    std::fs::write(dir.path().join("new.txt"), "new\n").unwrap();

    git.add(&["new.txt".to_string()]).unwrap();
    assert_eq!(git.file_statuses().unwrap().staged, vec![FileEntry::new('A', "new.txt")]);

    git.restore_staged(&["new.txt".to_string()]).unwrap();
    let statuses = git.file_statuses().unwrap();
    assert!(statuses.staged.is_empty());
    assert_eq!(statuses.untracked, vec![FileEntry::new('?', "new.txt")]);
}

#[test]
fn test_branches_and_default() {
    let Some((dir, git)) = init_repo() else { return };
    assert_eq!(git.current_branch().as_deref(), Some("main"));
    assert_eq!(git.default_branch(), "main");
    assert!(git.ensure_not_protected().is_err());

    git.switch_create("SWY-1-login", None).unwrap();
    git_in(dir.path(), &["branch", "swy-1-other"]);
    git_in(dir.path(), &["branch", "ABC-9-unrelated"]);

    assert_eq!(git.current_branch().as_deref(), Some("SWY-1-login"));
    assert!(git.ensure_not_protected().is_ok());
    assert!(git.verify_ref("ABC-9-unrelated"));
    assert!(!git.verify_ref("nope"));

    let branches = git.ticket_branches("SWY-1").unwrap();
    let names: Vec<(&str, bool)> = branches
        .iter()
        .map(|b| (b.name.as_str(), b.is_current))
        .collect();
    assert_eq!(names, vec![("SWY-1-login", true), ("swy-1-other", false)]);
    assert!(branches.iter().all(|b| b.tracking == Tracking::NeverPushed));
}

#[test]
fn test_prune_candidates_skip_current_and_default() {
    let Some((dir, git)) = init_repo() else { return };
    git_in(dir.path(), &["branch", "SWY-2-stale"]);
    git.switch_create("SWY-3-work", None).unwrap();

    let candidates = git.prune_candidates().unwrap();
    let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["SWY-2-stale"]);
    assert_eq!(candidates[0].tracking, Tracking::NeverPushed);

    git.delete_branch("SWY-2-stale").unwrap();
    assert!(git.prune_candidates().unwrap().is_empty());
}

#[test]
fn test_switch_new_refuses_existing_branch() {
    let Some((dir, git)) = init_repo() else { return };
    git_in(dir.path(), &["branch", "SWY-4-x"]);
    let err = git.switch_new("SWY-4-x", "main").unwrap_err();
    assert!(matches!(err, GitError::Command { .. }));
    git.switch("SWY-4-x").unwrap();
    assert_eq!(git.current_branch().as_deref(), Some("SWY-4-x"));
}

#[test]
fn test_outside_a_repository() {
    let Some(_) = init_repo() else { return };
    let dir = tempfile::tempdir().unwrap();
    let git = jira_git_helper::git::Git::in_dir(dir.path());
    assert!(matches!(git.file_statuses(), Err(GitError::NotARepository)));
    assert_eq!(git.current_branch(), None);
}

#[test]
fn test_non_ascii_paths_round_trip_through_add() {
    let Some((dir, git)) = init_repo() else { return };
    git_in(dir.path(), &["config", "core.quotePath", "true"]);
    std::fs::write(dir.path().join("café.rs"), "fn main() {}\n").unwrap();

    let statuses = git.file_statuses().unwrap();
    assert_eq!(statuses.untracked, vec![FileEntry::new('?', "café.rs")]);

    git.add(&["café.rs".to_string()]).unwrap();
    assert_eq!(git.file_statuses().unwrap().staged, vec![FileEntry::new('A', "café.rs")]);
}
