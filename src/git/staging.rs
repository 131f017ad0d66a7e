//! Stage/unstage reconciliation for the file picker.
//!
//! The picker never mutates git while open. It keeps the four original
//! buckets plus an ordered list of item identities the user wants staged,
//! and derives every view from those two inputs.

use super::{FileStatus, FileStatuses};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Staged,
    Modified,
    Deleted,
    Untracked,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Staged,
        Bucket::Modified,
        Bucket::Deleted,
        Bucket::Untracked,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Staged => "Staged  (space to unstage)",
            Self::Modified => "Modified  (space to stage)",
            Self::Deleted => "Deleted  (space to stage)",
            Self::Untracked => "Untracked  (space to stage)",
        }
    }
}

/// Origin bucket plus path. The same path can originate in two buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    pub origin: Bucket,
    pub path: String,
}

impl ItemId {
    pub fn new(origin: Bucket, path: impl Into<String>) -> Self {
        Self {
            origin,
            path: path.into(),
        }
    }
}

/// One row in a derived view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub id: ItemId,
    pub status: FileStatus,
}

impl FileItem {
    pub fn path(&self) -> &str {
        &self.id.path
    }
}

/// Paths to pass to `git add` and `git restore --staged`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOps {
    pub to_stage: BTreeSet<String>,
    pub to_unstage: BTreeSet<String>,
}

impl StageOps {
    pub fn is_empty(&self) -> bool {
        self.to_stage.is_empty() && self.to_unstage.is_empty()
    }
}

fn falls_back_to(status: FileStatus) -> Bucket {
    match status {
        FileStatus::Deleted => Bucket::Deleted,
        FileStatus::Added | FileStatus::Untracked => Bucket::Untracked,
        _ => Bucket::Modified,
    }
}

#[derive(Debug, Clone)]
pub struct StagingSession {
    original: Vec<FileItem>,
    staged: Vec<ItemId>,
}

impl StagingSession {
    pub fn new(statuses: &FileStatuses) -> Self {
        let original = Self::items_from(statuses);
        let staged = original
            .iter()
            .filter(|item| item.id.origin == Bucket::Staged)
            .map(|item| item.id.clone())
            .collect();
        Self { original, staged }
    }

    fn items_from(statuses: &FileStatuses) -> Vec<FileItem> {
        let buckets = [
            (Bucket::Staged, &statuses.staged),
            (Bucket::Modified, &statuses.modified),
            (Bucket::Deleted, &statuses.deleted),
            (Bucket::Untracked, &statuses.untracked),
        ];
        buckets
            .into_iter()
            .flat_map(|(bucket, entries)| {
                entries.iter().map(move |entry| FileItem {
                    id: ItemId::new(bucket, entry.path.clone()),
                    status: entry.status,
                })
            })
            .collect()
    }

    fn is_staged(&self, id: &ItemId) -> bool {
        self.staged.contains(id)
    }

    /// Items currently shown in `bucket`, sorted by path.
    pub fn view(&self, bucket: Bucket) -> Vec<FileItem> {
        let mut items: Vec<FileItem> = match bucket {
            Bucket::Staged => self
                .staged
                .iter()
                .filter_map(|id| self.original.iter().find(|item| &item.id == id))
                .cloned()
                .collect(),
            _ => self
                .original
                .iter()
                .filter(|item| !self.is_staged(&item.id))
                .filter(|item| {
                    item.id.origin == bucket
                        || (item.id.origin == Bucket::Staged && falls_back_to(item.status) == bucket)
                })
                .cloned()
                .collect(),
        };
        items.sort_by(|a, b| a.id.path.cmp(&b.id.path));
        items
    }

    /// Toggle `id` from the view it is shown in.
    pub fn toggle(&mut self, shown_in: Bucket, id: &ItemId) {
        if shown_in == Bucket::Staged {
            self.staged.retain(|s| s != id);
        } else if !self.is_staged(id) {
            self.staged.push(id.clone());
        }
    }

    /// Whether `bucket` has a section at all: it holds originals, or staged
    /// items that would fall back into it.
    pub fn is_visible(&self, bucket: Bucket) -> bool {
        bucket == Bucket::Staged
            || self.original.iter().any(|item| {
                item.id.origin == bucket
                    || (item.id.origin == Bucket::Staged && falls_back_to(item.status) == bucket)
            })
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Net operations relative to the original staged set.
    pub fn operations(&self) -> StageOps {
        let original: BTreeSet<&ItemId> = self
            .original
            .iter()
            .map(|item| &item.id)
            .filter(|id| id.origin == Bucket::Staged)
            .collect();
        let current: BTreeSet<&ItemId> = self.staged.iter().collect();
        StageOps {
            to_stage: current.difference(&original).map(|id| id.path.clone()).collect(),
            to_unstage: original.difference(&current).map(|id| id.path.clone()).collect(),
        }
    }

    /// Re-derive from fresh git output, keeping only staged identities that still exist.
    pub fn reload(&mut self, statuses: &FileStatuses) {
        self.original = Self::items_from(statuses);
        let original = &self.original;
        self.staged
            .retain(|id| original.iter().any(|item| &item.id == id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileEntry;
    use pretty_assertions::assert_eq;

    fn statuses(staged: &[(char, &str)], modified: &[(char, &str)]) -> FileStatuses {
        FileStatuses {
            staged: staged.iter().map(|(c, p)| FileEntry::new(*c, *p)).collect(),
            modified: modified.iter().map(|(c, p)| FileEntry::new(*c, *p)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_added_file_falls_back_to_untracked() {
        let mut session = StagingSession::new(&statuses(&[('A', "new.rs")], &[]));
        let id = ItemId::new(Bucket::Staged, "new.rs");
        session.toggle(Bucket::Staged, &id);
        assert_eq!(session.view(Bucket::Untracked).len(), 1);
        assert!(session.view(Bucket::Modified).is_empty());
        assert_eq!(session.operations().to_unstage.len(), 1);
    }

    #[test]
    fn test_same_path_in_two_buckets() {
        let mut session = StagingSession::new(&statuses(&[('M', "x.rs")], &[('M', "x.rs")]));
        let modified_id = ItemId::new(Bucket::Modified, "x.rs");
        session.toggle(Bucket::Modified, &modified_id);
        assert_eq!(session.view(Bucket::Staged).len(), 2);
        assert!(session.view(Bucket::Modified).is_empty());
        let ops = session.operations();
        assert_eq!(ops.to_stage.into_iter().collect::<Vec<_>>(), vec!["x.rs".to_string()]);
        assert!(ops.to_unstage.is_empty());
    }

    #[test]
    fn test_duplicate_toggle_is_idempotent() {
        let mut session = StagingSession::new(&statuses(&[], &[('M', "a.rs")]));
        let id = ItemId::new(Bucket::Modified, "a.rs");
        session.toggle(Bucket::Modified, &id);
        session.toggle(Bucket::Modified, &id);
        assert_eq!(session.view(Bucket::Staged).len(), 1);
    }

    #[test]
    fn test_visibility() {
        let session = StagingSession::new(&statuses(&[('D', "gone.rs")], &[]));
        assert!(session.is_visible(Bucket::Deleted));
        assert!(!session.is_visible(Bucket::Modified));
        assert!(!session.is_visible(Bucket::Untracked));
    }
}
