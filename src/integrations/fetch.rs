//! Issue-fetch orchestration across configured projects.
//!
//! Strategy:
//! - no projects: one query with [`FALLBACK_JQL`]
//! - one project: one query with that project's effective JQL
//! - several projects, none filtered: one combined `OR` query so the tracker sorts
//! - several projects, any filtered: one query per project, merged in configured
//!   order and de-duplicated by key (first occurrence wins)

use crate::config::ConfigStore;
use crate::data::Issue;
use crate::filters::{FilterSession, FALLBACK_JQL};
use crate::integrations::jira::TrackerError;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::future::Future;

/// Fields requested for every issue, before any per-project extras.
pub const BASE_FIELDS: [&str; 6] = ["summary", "status", "assignee", "priority", "parent", "issuetype"];

/// Lowest per-project cap when queries are split per project.
pub const PER_PROJECT_FLOOR: usize = 50;

/// The search capability the orchestrator needs from a tracker client.
pub trait IssueSearch {
    fn search(
        &self,
        jql: &str,
        max_results: usize,
        fields: &[String],
    ) -> impl Future<Output = Result<Vec<Issue>, TrackerError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub jql: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    Single(PlannedQuery),
    PerProject(Vec<PlannedQuery>),
}

impl FetchPlan {
    pub fn queries(&self) -> &[PlannedQuery] {
        match self {
            Self::Single(q) => std::slice::from_ref(q),
            Self::PerProject(qs) => qs,
        }
    }
}

/// Decide which queries to run for `projects`.
pub fn plan_fetch(
    store: &ConfigStore,
    session: &FilterSession,
    projects: &[String],
    max_results: usize,
) -> FetchPlan {
    match projects {
        [] => FetchPlan::Single(PlannedQuery {
            jql: FALLBACK_JQL.to_string(),
            max_results,
        }),
        [project] => FetchPlan::Single(PlannedQuery {
            jql: session.jql_for_project(store, project),
            max_results,
        }),
        _ if !session.any_filter_active(store, projects) => {
            let clause = projects
                .iter()
                .map(|p| format!("project = {p}"))
                .collect::<Vec<_>>()
                .join(" OR ");
            FetchPlan::Single(PlannedQuery {
                jql: format!("({clause}) AND assignee = currentUser() ORDER BY updated DESC"),
                max_results,
            })
        }
        _ => {
            let per_project = PER_PROJECT_FLOOR.max(max_results / projects.len());
            FetchPlan::PerProject(
                projects
                    .iter()
                    .map(|p| PlannedQuery {
                        jql: session.jql_for_project(store, p),
                        max_results: per_project,
                    })
                    .collect(),
            )
        }
    }
}

/// Base fields followed by `extra`, without duplicates.
pub fn requested_fields(extra: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    BASE_FIELDS
        .iter()
        .map(|f| f.to_string())
        .chain(extra.iter().cloned())
        .filter(|f| seen.insert(f.clone()))
        .collect()
}

/// Extra field ids across `projects`, first-seen order.
pub fn collect_extra_fields(store: &ConfigStore, projects: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    projects
        .iter()
        .flat_map(|p| store.fields_for(p))
        .filter(|f| seen.insert(f.clone()))
        .collect()
}

/// Concatenate batches in order, keeping the first issue seen for each key.
pub fn merge_unique(batches: Vec<Vec<Issue>>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|issue| seen.insert(issue.key.clone()))
        .collect()
}

/// Execute a plan. Any failing query fails the whole fetch.
pub async fn execute_plan<S: IssueSearch>(
    client: &S,
    plan: &FetchPlan,
    fields: &[String],
) -> Result<Vec<Issue>, TrackerError> {
    match plan {
        FetchPlan::Single(query) => client.search(&query.jql, query.max_results, fields).await,
        FetchPlan::PerProject(queries) => {
            // try_join_all keeps input order in its output
            let batches = try_join_all(
                queries
                    .iter()
                    .map(|q| client.search(&q.jql, q.max_results, fields)),
            )
            .await?;
            Ok(merge_unique(batches))
        }
    }
}

/// Fetch the merged issue list for `projects`.
pub async fn fetch_issues_for_projects<S: IssueSearch>(
    client: &S,
    store: &ConfigStore,
    session: &FilterSession,
    projects: &[String],
    max_results: usize,
    extra_fields: &[String],
) -> Result<Vec<Issue>, TrackerError> {
    let plan = plan_fetch(store, session, projects, max_results);
    tracing::debug!("Fetching issues with {} query(ies)", plan.queries().len());
    execute_plan(client, &plan, &requested_fields(extra_fields)).await
}

/// Fetch with a raw JQL override, bypassing filters and project config.
pub async fn fetch_issues_with_jql<S: IssueSearch>(
    client: &S,
    jql: &str,
    max_results: usize,
    extra_fields: &[String],
) -> Result<Vec<Issue>, TrackerError> {
    client
        .search(jql, max_results, &requested_fields(extra_fields))
        .await
}
