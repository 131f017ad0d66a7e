//! Test utilities and fixtures for jira-git-helper tests

#![allow(dead_code)]

use jira_git_helper::config::ConfigStore;
use jira_git_helper::data::{Issue, NamedFilter};
use jira_git_helper::git::Git;
use jira_git_helper::integrations::fetch::IssueSearch;
use jira_git_helper::integrations::jira::TrackerError;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

/// A config store in a fresh temp dir. Keep the dir alive for the test.
pub fn temp_store() -> (TempDir, ConfigStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = ConfigStore::open(dir.path().join("config")).expect("open store");
    (dir, store)
}

pub fn filter(name: &str, jql: &str) -> NamedFilter {
    NamedFilter {
        name: name.to_string(),
        jql: jql.to_string(),
    }
}

pub fn projects(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

pub fn issue(key: &str) -> Issue {
    Issue {
        key: key.to_string(),
        id: format!("id-{key}"),
        summary: format!("Summary of {key}"),
        status: "In Progress".to_string(),
        assignee: None,
        priority: None,
        parent: None,
        issue_type: None,
        fields: BTreeMap::new(),
    }
}

pub fn keys(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.key.as_str()).collect()
}

/// In-memory tracker: canned results per JQL, every query recorded.
#[derive(Default)]
pub struct FakeTracker {
    results: HashMap<String, Vec<Issue>>,
    failing: Option<String>,
    pub queries: Mutex<Vec<(String, usize, Vec<String>)>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, jql: &str, keys: &[&str]) -> Self {
        self.results
            .insert(jql.to_string(), keys.iter().map(|k| issue(k)).collect());
        self
    }

    /// Make queries for `jql` fail with an API error.
    pub fn failing_on(mut self, jql: &str) -> Self {
        self.failing = Some(jql.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<(String, usize, Vec<String>)> {
        self.queries.lock().expect("queries lock").clone()
    }
}

impl IssueSearch for FakeTracker {
    fn search(
        &self,
        jql: &str,
        max_results: usize,
        fields: &[String],
    ) -> impl Future<Output = Result<Vec<Issue>, TrackerError>> + Send {
        self.queries
            .lock()
            .expect("queries lock")
            .push((jql.to_string(), max_results, fields.to_vec()));
        let result = if self.failing.as_deref() == Some(jql) {
            Err(TrackerError::Api(format!("Error in the JQL Query: {jql}")))
        } else {
            Ok(self.results.get(jql).cloned().unwrap_or_default())
        };
        std::future::ready(result)
    }
}

pub fn git_available() -> bool {
    which::which("git").is_ok()
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("run git");
    assert!(
        status.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&status.stderr)
    );
}

/// A throwaway repository on `main` with one commit, or `None` without git.
pub fn init_repo() -> Option<(TempDir, Git)> {
    if !git_available() {
        eprintln!("git not found, skipping");
        return None;
    }
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path();
    run_git(path, &["init", "--quiet"]);
    run_git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    run_git(path, &["config", "user.email", "dev@example.com"]);
    run_git(path, &["config", "user.name", "Dev"]);
    run_git(path, &["config", "commit.gpgsign", "false"]);
    std::fs::write(path.join("README.md"), "hello\n").expect("write readme");
    run_git(path, &["add", "README.md"]);
    run_git(path, &["commit", "--quiet", "-m", "init"]);
    let git = Git::in_dir(path);
    Some((dir, git))
}

pub fn git_in(dir: &Path, args: &[&str]) {
    run_git(dir, args);
}
