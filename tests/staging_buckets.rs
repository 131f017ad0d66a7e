//! Tests for the file picker's stage/unstage reconciliation.
//!
//! Toggling only changes which view an item is shown in; the net git
//! operations are computed once against the original staged set.

use jira_git_helper::git::staging::{Bucket, ItemId, StagingSession};
use jira_git_helper::git::{parse_porcelain, FileEntry, FileStatus, FileStatuses};
use pretty_assertions::assert_eq;

fn paths(session: &StagingSession, bucket: Bucket) -> Vec<String> {
    session
        .view(bucket)
        .into_iter()
        .map(|item| item.id.path)
        .collect()
}

fn sample() -> FileStatuses {
    FileStatuses {
        staged: vec![FileEntry::new('M', "src/lib.rs"), FileEntry::new('D', "old.txt")],
        modified: vec![FileEntry::new('M', "src/lib.rs"), FileEntry::new('M', "README.md")],
        deleted: vec![FileEntry::new('D', "gone.rs")],
        untracked: vec![FileEntry::new('?', "notes.md")],
    }
}

#[test]
fn test_initial_views_mirror_git() {
    let session = StagingSession::new(&sample());
    assert_eq!(paths(&session, Bucket::Staged), vec!["old.txt", "src/lib.rs"]);
    assert_eq!(paths(&session, Bucket::Modified), vec!["README.md", "src/lib.rs"]);
    assert_eq!(paths(&session, Bucket::Deleted), vec!["gone.rs"]);
    assert_eq!(paths(&session, Bucket::Untracked), vec!["notes.md"]);
    assert!(session.operations().is_empty());
}

#[test]
fn test_stage_then_unstage_is_a_no_op() {
    let mut session = StagingSession::new(&sample());
    let readme = ItemId::new(Bucket::Modified, "README.md");

    session.toggle(Bucket::Modified, &readme);
    assert_eq!(paths(&session, Bucket::Staged), vec!["README.md", "old.txt", "src/lib.rs"]);
    assert_eq!(paths(&session, Bucket::Modified), vec!["src/lib.rs"]);

    session.toggle(Bucket::Staged, &readme);
    assert!(session.operations().is_empty());
    assert_eq!(paths(&session, Bucket::Modified), vec!["README.md", "src/lib.rs"]);
}

#[test]
fn test_unstage_then_restage_from_fallback_is_a_no_op() {
    let statuses = FileStatuses {
        staged: vec![FileEntry::new('M', "x")],
        ..Default::default()
    };
    let mut session = StagingSession::new(&statuses);

    session.toggle(Bucket::Staged, &ItemId::new(Bucket::Staged, "x"));
    assert!(session.view(Bucket::Staged).is_empty());

    let fallen_back = session.view(Bucket::Modified);
    assert_eq!(fallen_back.len(), 1);
    let id = fallen_back[0].id.clone();
    assert_eq!(id, ItemId::new(Bucket::Staged, "x"));

    session.toggle(Bucket::Modified, &id);
    assert_eq!(paths(&session, Bucket::Staged), vec!["x"]);
    assert!(session.view(Bucket::Modified).is_empty());
    assert!(session.operations().is_empty());
}

#[test]
fn test_same_path_in_two_buckets_has_two_identities() {
    let mut session = StagingSession::new(&sample());
    session.toggle(Bucket::Modified, &ItemId::new(Bucket::Modified, "src/lib.rs"));

    let staged = session.view(Bucket::Staged);
    let lib_rows = staged.iter().filter(|i| i.path() == "src/lib.rs").count();
    assert_eq!(lib_rows, 2);

    let ops = session.operations();
    assert_eq!(ops.to_stage.into_iter().collect::<Vec<_>>(), vec!["src/lib.rs"]);
    assert!(ops.to_unstage.is_empty());
}

#[test]
fn test_unstaged_deletion_falls_back_to_deleted_view() {
    let mut session = StagingSession::new(&sample());
    session.toggle(Bucket::Staged, &ItemId::new(Bucket::Staged, "old.txt"));

    let deleted = session.view(Bucket::Deleted);
    assert_eq!(deleted.len(), 2);
    let old = deleted.iter().find(|i| i.path() == "old.txt").unwrap();
    assert_eq!(old.status, FileStatus::Deleted);
    assert_eq!(old.status.code(), 'D');
    assert_eq!(
        session.operations().to_unstage.into_iter().collect::<Vec<_>>(),
        vec!["old.txt"]
    );
}

#[test]
fn test_staged_modification_falls_back_to_modified_view() {
    let statuses = FileStatuses {
        staged: vec![FileEntry::new('M', "a.rs")],
        ..Default::default()
    };
    let mut session = StagingSession::new(&statuses);
    assert!(!session.is_visible(Bucket::Untracked));
    assert!(session.is_visible(Bucket::Modified));

    session.toggle(Bucket::Staged, &ItemId::new(Bucket::Staged, "a.rs"));
    assert_eq!(paths(&session, Bucket::Modified), vec!["a.rs"]);
    assert!(!session.has_staged());
}

#[test]
fn test_reload_drops_vanished_identities() {
    let mut session = StagingSession::new(&sample());
    session.toggle(Bucket::Untracked, &ItemId::new(Bucket::Untracked, "notes.md"));
    session.toggle(Bucket::Modified, &ItemId::new(Bucket::Modified, "README.md"));

    let fresh = FileStatuses {
        modified: vec![FileEntry::new('M', "README.md")],
        ..Default::default()
    };
    session.reload(&fresh);

    assert_eq!(paths(&session, Bucket::Staged), vec!["README.md"]);
    assert!(session.view(Bucket::Untracked).is_empty());
}

#[test]
fn test_parse_porcelain_buckets() {
    let output = " M src/main.rs\nMM src/lib.rs\nD  old.txt\n D gone.rs\n?? notes.md\nR  a.rs -> b.rs\nA  \"with space.rs\"\n";
    let statuses = parse_porcelain(output);

    assert_eq!(
        statuses.staged,
        vec![
            FileEntry::new('M', "src/lib.rs"),
            FileEntry::new('D', "old.txt"),
            FileEntry::new('R', "b.rs"),
            FileEntry::new('A', "with space.rs"),
        ]
    );
    assert_eq!(
        statuses.modified,
        vec![FileEntry::new('M', "src/main.rs"), FileEntry::new('M', "src/lib.rs")]
    );
    assert_eq!(statuses.deleted, vec![FileEntry::new('D', "gone.rs")]);
    assert_eq!(statuses.untracked, vec![FileEntry::new('?', "notes.md")]);
    assert!(!statuses.is_clean());
    assert!(parse_porcelain("").is_clean());
}
