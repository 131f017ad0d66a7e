//! Branch tracking classification and prune candidates.

use std::collections::HashSet;

/// A branch's relationship to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tracking {
    /// Local with a healthy upstream.
    Tracked,
    /// Local with no upstream configured.
    NeverPushed,
    /// Local whose upstream was pushed once and has since been deleted.
    UpstreamGone,
    /// Exists only on origin.
    RemoteOnly,
}

impl Tracking {
    /// Short kind shown in the Tracking column.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Tracked => "tracked",
            Self::NeverPushed | Self::UpstreamGone => "local",
            Self::RemoteOnly => "remote",
        }
    }

    /// Human status label; empty when healthy.
    pub fn status_label(self) -> &'static str {
        match self {
            Self::Tracked => "",
            Self::NeverPushed => "never pushed",
            Self::UpstreamGone => "remote deleted",
            Self::RemoteOnly => "remote only",
        }
    }

    /// Classify from `%(upstream:short)` and `%(upstream:track)`.
    pub fn classify(upstream: &str, track: &str) -> Self {
        if upstream.is_empty() {
            Self::NeverPushed
        } else if track.contains("[gone]") {
            Self::UpstreamGone
        } else {
            Self::Tracked
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchDescriptor {
    pub name: String,
    pub is_current: bool,
    pub tracking: Tracking,
}

impl BranchDescriptor {
    pub fn status_label(&self) -> &'static str {
        self.tracking.status_label()
    }
}

/// A local branch `jg prune` offers to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneCandidate {
    pub name: String,
    pub tracking: Tracking,
}

/// Parse `for-each-ref --format=%(refname:short)\t%(upstream:short)\t%(upstream:track) refs/heads/`.
pub fn parse_local_refs(output: &str) -> Vec<(String, Tracking)> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.trim().split('\t');
            let name = parts.next().filter(|n| !n.is_empty())?;
            let upstream = parts.next().unwrap_or("");
            let track = parts.next().unwrap_or("");
            Some((name.to_string(), Tracking::classify(upstream, track)))
        })
        .collect()
}

/// Parse `for-each-ref --format=%(refname:short) refs/remotes/origin/` into short names.
pub fn parse_remote_refs(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|r| !r.is_empty() && *r != "origin/HEAD" && *r != "origin")
        .map(|r| r.strip_prefix("origin/").unwrap_or(r).to_string())
        .filter(|short| short != "HEAD")
        .collect()
}

/// Merge local and remote refs accepted by `keep`. Remote refs with a local
/// counterpart are dropped. Sorted current-first, then by lowercase name.
pub fn assemble_branches(
    local: Vec<(String, Tracking)>,
    remote: Vec<String>,
    current: Option<&str>,
    keep: impl Fn(&str) -> bool,
) -> Vec<BranchDescriptor> {
    let local: Vec<(String, Tracking)> = local.into_iter().filter(|(n, _)| keep(n)).collect();
    let local_names: HashSet<&str> = local.iter().map(|(n, _)| n.as_str()).collect();

    let remote_only: Vec<BranchDescriptor> = remote
        .iter()
        .filter(|n| keep(n) && !local_names.contains(n.as_str()))
        .map(|name| BranchDescriptor {
            name: name.clone(),
            is_current: false,
            tracking: Tracking::RemoteOnly,
        })
        .collect();

    let mut branches: Vec<BranchDescriptor> = local
        .iter()
        .map(|(name, tracking)| BranchDescriptor {
            name: name.clone(),
            is_current: current == Some(name.as_str()),
            tracking: *tracking,
        })
        .chain(remote_only)
        .collect();

    branches.sort_by_key(|b| (!b.is_current, b.name.to_lowercase()));
    branches
}

/// Parse `git branch -vv`, skipping the current and default branches.
pub fn parse_prune_candidates(
    output: &str,
    current: Option<&str>,
    default_branch: &str,
) -> Vec<PruneCandidate> {
    output
        .lines()
        .filter_map(|line| {
            let name = line.trim_start_matches(['*', ' ']).split_whitespace().next()?;
            if Some(name) == current || name == default_branch || name.starts_with('(') {
                return None;
            }
            let tracking = if line.contains(": gone]") {
                Tracking::UpstreamGone
            } else if !line.contains("[origin/") {
                Tracking::NeverPushed
            } else {
                return None;
            };
            Some(PruneCandidate {
                name: name.to_string(),
                tracking,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify() {
        assert_eq!(Tracking::classify("", ""), Tracking::NeverPushed);
        assert_eq!(Tracking::classify("origin/x", "[gone]"), Tracking::UpstreamGone);
        assert_eq!(Tracking::classify("origin/x", "[ahead 1]"), Tracking::Tracked);
        assert_eq!(Tracking::UpstreamGone.kind(), "local");
        assert_eq!(Tracking::RemoteOnly.status_label(), "remote only");
    }

    #[test]
    fn test_assemble_filters_and_sorts() {
        let local = parse_local_refs(
            "swy-2-b\torigin/swy-2-b\t\nSWY-1-a\t\t\nmain\torigin/main\t\nSWY-3-c\torigin/SWY-3-c\t[gone]\n",
        );
        let remote = parse_remote_refs("origin/HEAD\norigin/main\norigin/SWY-1-a\norigin/SWY-9-z\n");
        let branches = assemble_branches(local, remote, Some("SWY-3-c"), |n| {
            n.to_lowercase().contains("swy")
        });

        let summary: Vec<(&str, bool, Tracking)> = branches
            .iter()
            .map(|b| (b.name.as_str(), b.is_current, b.tracking))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("SWY-3-c", true, Tracking::UpstreamGone),
                ("SWY-1-a", false, Tracking::NeverPushed),
                ("swy-2-b", false, Tracking::Tracked),
                ("SWY-9-z", false, Tracking::RemoteOnly),
            ]
        );
    }

    #[test]
    fn test_prune_candidates() {
        let out = "\
* SWY-1-current 1111111 [origin/SWY-1-current] wip
  main          2222222 [origin/main] base
  SWY-2-gone    3333333 [origin/SWY-2-gone: gone] old
  SWY-3-local   4444444 never pushed
  SWY-4-ok      5555555 [origin/SWY-4-ok: ahead 1] fine
";
        let candidates = parse_prune_candidates(out, Some("SWY-1-current"), "main");
        assert_eq!(
            candidates,
            vec![
                PruneCandidate {
                    name: "SWY-2-gone".to_string(),
                    tracking: Tracking::UpstreamGone
                },
                PruneCandidate {
                    name: "SWY-3-local".to_string(),
                    tracking: Tracking::NeverPushed
                },
            ]
        );
    }
}
