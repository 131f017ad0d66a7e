//! Local `git` subprocess runner and output parsers.
//!
//! Every call captures stdout/stderr unless it is one of the few long-running
//! commands (pull, rebase, commit) whose progress the user should see live.

pub mod branches;
pub mod staging;

use branches::{
    assemble_branches, parse_local_refs, parse_prune_candidates, parse_remote_refs,
    BranchDescriptor, PruneCandidate,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;

/// Branches that refuse direct commits.
pub const PROTECTED_BRANCHES: [&str; 2] = ["main", "master"];

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository or git not available.")]
    NotARepository,

    #[error("git {command} failed:\n{stderr}")]
    Command { command: String, stderr: String },

    #[error("{stderr}")]
    DirtyWorktree { stderr: String },

    #[error("You are on '{0}', which is branch-protected. Create a feature branch first (e.g. jg branch <name>).")]
    ProtectedBranch(String),

    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// File status
// ─────────────────────────────────────────────────────────────────────────────

/// One porcelain status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileStatus {
    Modified,
    Deleted,
    Added,
    Untracked,
    Renamed,
    Copied,
    Other(char),
}

impl FileStatus {
    pub fn from_code(code: char) -> Self {
        match code {
            'M' => Self::Modified,
            'D' => Self::Deleted,
            'A' => Self::Added,
            '?' => Self::Untracked,
            'R' => Self::Renamed,
            'C' => Self::Copied,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Added => 'A',
            Self::Untracked => '?',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Other(c) => c,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Added => "added",
            Self::Untracked => "untracked",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Other(_) => "changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    pub status: FileStatus,
    pub path: String,
}

impl FileEntry {
    pub fn new(code: char, path: impl Into<String>) -> Self {
        Self {
            status: FileStatus::from_code(code),
            path: path.into(),
        }
    }
}

/// The four raw buckets reported by `git status --porcelain`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStatuses {
    pub staged: Vec<FileEntry>,
    pub modified: Vec<FileEntry>,
    pub deleted: Vec<FileEntry>,
    pub untracked: Vec<FileEntry>,
}

impl FileStatuses {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.modified.is_empty()
            && self.deleted.is_empty()
            && self.untracked.is_empty()
    }

    /// Staged, modified and untracked paths, deduplicated and sorted.
    pub fn changed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .staged
            .iter()
            .chain(&self.modified)
            .chain(&self.untracked)
            .map(|e| e.path.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        paths.sort();
        paths
    }
}

/// Undo git's C-style path quoting: `caf\303\251.rs` is `café.rs`.
pub fn unquote_path(quoted: &str) -> String {
    let raw = quoted.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'\\' || i + 1 == raw.len() {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        // \ooo is one raw byte of a multi-byte UTF-8 sequence
        if let Some(digits) = raw
            .get(i + 1..i + 4)
            .filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)))
        {
            out.push(digits.iter().fold(0u8, |acc, d| acc.wrapping_mul(8).wrapping_add(d - b'0')));
            i += 4;
            continue;
        }
        out.push(match raw[i + 1] {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            other => other,
        });
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn porcelain_path(raw: &str) -> String {
    let path = raw.rsplit_once(" -> ").map_or(raw, |(_, to)| to);
    match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(quoted) => unquote_path(quoted),
        None => path.to_string(),
    }
}

/// Parse `git status --porcelain` output into buckets.
pub fn parse_porcelain(output: &str) -> FileStatuses {
    let mut statuses = FileStatuses::default();
    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let mut chars = line.chars();
        let (Some(x), Some(y)) = (chars.next(), chars.next()) else {
            continue;
        };
        let path = porcelain_path(&line[3..]);

        if x == '?' && y == '?' {
            statuses.untracked.push(FileEntry::new('?', path));
            continue;
        }
        if x != ' ' && x != '?' {
            statuses.staged.push(FileEntry::new(x, path.clone()));
        }
        if y != ' ' && y != '?' {
            if y == 'D' {
                statuses.deleted.push(FileEntry::new('D', path));
            } else {
                statuses.modified.push(FileEntry::new(y, path));
            }
        }
    }
    statuses
}

// ─────────────────────────────────────────────────────────────────────────────
// Other parsers
// ─────────────────────────────────────────────────────────────────────────────

/// True when git refused a switch because local changes would be overwritten.
pub fn is_dirty_worktree_error(stderr: &str) -> bool {
    stderr.contains("overwritten") || stderr.contains("commit your changes or stash")
}

/// First `https://` URL on a line mentioning github.com (the "create a PR" hint).
pub fn extract_push_url(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .filter(|line| line.contains("https://") && line.contains("github.com"))
        .find_map(|line| {
            line.split_whitespace()
                .find(|word| word.starts_with("https://"))
                .map(str::to_string)
        })
}

/// Paths that `git ls-files --eol` classifies as binary in the worktree.
pub fn parse_ls_files_eol(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let (info, path) = line.split_once('\t')?;
            let worktree = info.split_whitespace().nth(1)?;
            (worktree == "w/-text").then(|| path.to_string())
        })
        .collect()
}

pub fn is_protected_branch(name: &str) -> bool {
    PROTECTED_BRANCHES.contains(&name)
}

/// Parse `git branch` output into `(name, is_current)` pairs.
pub fn parse_branch_list(output: &str) -> Vec<(String, bool)> {
    output
        .lines()
        .filter_map(|line| {
            let current = line.starts_with('*');
            let name = line.trim_start_matches('*').trim();
            if name.is_empty() || name.starts_with('(') {
                return None;
            }
            Some((name.to_string(), current))
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────────────────────────

/// Push result: git's stderr (shown to the user) and the PR hint URL, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub stderr: String,
    pub url: Option<String>,
}

/// Runs `git` in a fixed working directory, or the process cwd.
#[derive(Debug, Clone, Default)]
pub struct Git {
    workdir: Option<PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(dir.into()),
        }
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!("git {}", args.join(" "));
        Ok(self.command().args(args).output()?)
    }

    /// Run and require success; returns stdout.
    fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(command_error(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run with the terminal attached; returns whether git succeeded.
    fn interactive(&self, args: &[&str]) -> Result<bool, GitError> {
        tracing::debug!("git {} (interactive)", args.join(" "));
        let status = self
            .command()
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.success())
    }

    // ── reads ──

    pub fn file_statuses(&self) -> Result<FileStatuses, GitError> {
        let output = self.output(&["status", "--porcelain"])?;
        if !output.status.success() {
            return Err(GitError::NotARepository);
        }
        Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
    }

    /// `None` on a detached HEAD or outside a repository.
    pub fn current_branch(&self) -> Option<String> {
        let output = self.output(&["symbolic-ref", "--short", "HEAD"]).ok()?;
        if !output.status.success() {
            return None;
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!name.is_empty()).then_some(name)
    }

    /// origin's HEAD, else a local main/master, else "main".
    pub fn default_branch(&self) -> String {
        if let Ok(out) = self.stdout(&["symbolic-ref", "refs/remotes/origin/HEAD"]) {
            if let Some(name) = out.trim().rsplit('/').next().filter(|n| !n.is_empty()) {
                return name.to_string();
            }
        }
        let local: HashSet<String> = self
            .local_branches()
            .unwrap_or_default()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        PROTECTED_BRANCHES
            .iter()
            .find(|name| local.contains(**name))
            .unwrap_or(&"main")
            .to_string()
    }

    pub fn local_branches(&self) -> Result<Vec<(String, bool)>, GitError> {
        Ok(parse_branch_list(&self.stdout(&["branch"])?))
    }

    /// Local and remote-only branches whose names contain `needle`, classified.
    pub fn ticket_branches(&self, needle: &str) -> Result<Vec<BranchDescriptor>, GitError> {
        let local = parse_local_refs(&self.stdout(&[
            "for-each-ref",
            "--format=%(refname:short)\t%(upstream:short)\t%(upstream:track)",
            "refs/heads/",
        ])?);
        let remote = parse_remote_refs(&self.stdout(&[
            "for-each-ref",
            "--format=%(refname:short)",
            "refs/remotes/origin/",
        ])?);
        let current = self.current_branch();
        Ok(assemble_branches(local, remote, current.as_deref(), |name| {
            name.to_lowercase().contains(&needle.to_lowercase())
        }))
    }

    /// Local branches (no remote-only entries) accepted by `keep`, classified.
    pub fn local_branch_descriptors(
        &self,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<BranchDescriptor>, GitError> {
        let local = parse_local_refs(&self.stdout(&[
            "for-each-ref",
            "--format=%(refname:short)\t%(upstream:short)\t%(upstream:track)",
            "refs/heads/",
        ])?);
        let current = self.current_branch();
        Ok(assemble_branches(local, Vec::new(), current.as_deref(), keep))
    }

    /// Local branches whose remote is gone or that were never pushed.
    pub fn prune_candidates(&self) -> Result<Vec<PruneCandidate>, GitError> {
        let output = self.stdout(&["branch", "-vv"])?;
        let current = self.current_branch();
        let default = self.default_branch();
        Ok(parse_prune_candidates(&output, current.as_deref(), &default))
    }

    pub fn toplevel(&self) -> Result<PathBuf, GitError> {
        let out = self
            .stdout(&["rev-parse", "--show-toplevel"])
            .map_err(|_| GitError::NotARepository)?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Which of `paths` git considers binary in the worktree.
    pub fn binary_paths(&self, paths: &[String]) -> Result<HashSet<String>, GitError> {
        if paths.is_empty() {
            return Ok(HashSet::new());
        }
        let mut args = vec!["ls-files", "--eol", "--"];
        args.extend(paths.iter().map(String::as_str));
        let output = self.output(&args)?;
        Ok(parse_ls_files_eol(&String::from_utf8_lossy(&output.stdout)))
    }

    pub fn verify_ref(&self, name: &str) -> bool {
        self.output(&["rev-parse", "--verify", "--quiet", name])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// `git diff base...branch`.
    pub fn diff_range(&self, base: &str, branch: &str) -> Result<String, GitError> {
        self.stdout(&["diff", &format!("{base}...{branch}")])
    }

    // ── writes ──

    pub fn switch(&self, name: &str) -> Result<(), GitError> {
        let output = self.output(&["switch", name])?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_dirty_worktree_error(&stderr) {
            Err(GitError::DirtyWorktree { stderr })
        } else {
            Err(GitError::Command {
                command: format!("switch {name}"),
                stderr,
            })
        }
    }

    /// `switch -C name [base]`: create or reset `name` and switch to it.
    pub fn switch_create(&self, name: &str, base: Option<&str>) -> Result<(), GitError> {
        let mut args = vec!["switch", "-C", name];
        args.extend(base);
        self.stdout(&args).map(drop)
    }

    /// `switch -c name base`: fails if `name` already exists.
    pub fn switch_new(&self, name: &str, base: &str) -> Result<(), GitError> {
        self.stdout(&["switch", "-c", name, base]).map(drop)
    }

    pub fn stash_push(&self) -> Result<(), GitError> {
        self.stdout(&["stash", "--include-untracked"]).map(drop)
    }

    pub fn stash_pop(&self) -> Result<(), GitError> {
        self.stdout(&["stash", "pop"]).map(drop)
    }

    pub fn pull(&self, branch: &str) -> Result<bool, GitError> {
        self.interactive(&["pull", "origin", branch])
    }

    pub fn fetch_origin(&self) -> Result<(), GitError> {
        self.stdout(&["fetch", "origin"]).map(drop)
    }

    pub fn fetch_prune(&self) -> Result<(), GitError> {
        self.stdout(&["fetch", "--prune"]).map(drop)
    }

    pub fn rebase_onto_origin(&self, branch: &str) -> Result<bool, GitError> {
        self.interactive(&["rebase", &format!("origin/{branch}")])
    }

    /// `push -u origin HEAD`. A failed push carries git's stderr.
    pub fn push_upstream(&self) -> Result<PushOutcome, GitError> {
        let output = self.output(&["push", "-u", "origin", "HEAD"])?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(GitError::Command {
                command: "push".to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        let url = extract_push_url(&stderr);
        Ok(PushOutcome { stderr, url })
    }

    /// `git add -- paths` from the repository root.
    pub fn add(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let root = Git::in_dir(self.toplevel()?);
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        root.stdout(&args).map(drop)
    }

    /// `git restore --staged -- paths` from the repository root.
    pub fn restore_staged(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let root = Git::in_dir(self.toplevel()?);
        let mut args = vec!["restore", "--staged", "--"];
        args.extend(paths.iter().map(String::as_str));
        root.stdout(&args).map(drop)
    }

    pub fn commit(&self, message: &str, no_verify: bool, extra: &[String]) -> Result<(), GitError> {
        let mut args = vec!["commit"];
        if no_verify {
            args.push("--no-verify");
        }
        args.extend(["-m", message]);
        args.extend(extra.iter().map(String::as_str));
        if self.interactive(&args)? {
            Ok(())
        } else {
            Err(GitError::Command {
                command: "commit".to_string(),
                stderr: String::new(),
            })
        }
    }

    pub fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        self.stdout(&["branch", "-D", name]).map(drop)
    }

    /// Refuse to continue on a protected branch.
    pub fn ensure_not_protected(&self) -> Result<(), GitError> {
        match self.current_branch() {
            Some(branch) if is_protected_branch(&branch) => Err(GitError::ProtectedBranch(branch)),
            _ => Ok(()),
        }
    }
}

fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        command: args.first().copied().unwrap_or_default().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}
