use crate::config::{ConfigError, ConfigStore, JiraCredentials};
use crate::data::{FieldValue, Issue, PrStatus, PullRequest, TicketDetails};
use crate::integrations::fetch::IssueSearch;
use crate::integrations::{DEV_STATUS_TIMEOUT, HTTP_CLIENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use thiserror::Error;

/// Issues requested per page from the search endpoint.
const PAGE_SIZE: usize = 100;

/// Fields fetched for the ticket info panel.
pub const DETAIL_FIELDS: [&str; 8] = [
    "summary",
    "status",
    "assignee",
    "reporter",
    "priority",
    "labels",
    "description",
    "issuetype",
];

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("JIRA API error: {0}")]
    Api(String),
    #[error("JIRA request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// Type-safe response structures for the JIRA REST API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<IssueNode>,
    next_page_token: Option<String>,
    is_last: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    id: String,
    key: String,
    /// Kept raw so any field id can back an extra column, base fields included.
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFields {
    summary: Option<String>,
    status: Option<NamedNode>,
    assignee: Option<UserNode>,
    reporter: Option<UserNode>,
    priority: Option<NamedNode>,
    parent: Option<ParentNode>,
    issuetype: Option<NamedNode>,
    labels: Option<Vec<String>>,
    description: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserNode {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ParentNode {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    id: String,
    key: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct DevStatusResponse {
    #[serde(default)]
    detail: Vec<DevStatusDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevStatusDetail {
    #[serde(default)]
    pull_requests: Vec<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestNode {
    #[serde(default)]
    status: String,
    author: Option<AuthorNode>,
    #[serde(default)]
    repository_name: String,
    source: Option<BranchNode>,
    destination: Option<BranchNode>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    last_update: String,
}

#[derive(Debug, Deserialize)]
struct AuthorNode {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct BranchNode {
    #[serde(default)]
    branch: String,
}

/// A field definition from `/rest/api/2/field`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldInfo {
    pub id: String,
    pub name: String,
}

/// Field id ↔ display name lookups.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    name_by_id: HashMap<String, String>,
    id_by_name: HashMap<String, String>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        let mut catalog = Self::default();
        for field in fields {
            catalog
                .id_by_name
                .insert(field.name.to_lowercase(), field.id.clone());
            catalog.name_by_id.insert(field.id, field.name);
        }
        catalog
    }

    /// Display name for `id`, or the id itself when unknown.
    pub fn name_for(&self, id: &str) -> String {
        self.name_by_id
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Case-insensitive reverse lookup.
    pub fn id_for(&self, name: &str) -> Option<&str> {
        self.id_by_name.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.name_by_id.is_empty()
    }
}

/// Browse URL for a ticket.
pub fn browse_url(server: &str, key: &str) -> String {
    format!("{}/browse/{}", server.trim_end_matches('/'), urlencoding::encode(key))
}

/// Human-readable message from a JIRA error response.
pub fn api_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let mut parts = envelope.error_messages;
        parts.extend(envelope.errors.into_iter().map(|(k, v)| format!("{k}: {v}")));
        if !parts.is_empty() {
            return parts.join("; ");
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", crate::data::truncate_chars(body, 300))
    }
}

fn typed_fields(raw: Map<String, Value>) -> Result<IssueFields, TrackerError> {
    serde_json::from_value(Value::Object(raw))
        .map_err(|e| TrackerError::Api(format!("unexpected response shape: {e}")))
}

/// Reduce raw issue JSON into the picker's [`Issue`] shape.
fn issue_from_node(node: IssueNode) -> Result<Issue, TrackerError> {
    let fields = node
        .fields
        .iter()
        .filter_map(|(id, raw)| FieldValue::from_json(raw).map(|v| (id.clone(), v)))
        .collect();
    let f = typed_fields(node.fields)?;
    Ok(Issue {
        key: node.key,
        id: node.id,
        summary: f.summary.unwrap_or_default(),
        status: f.status.map(|s| s.name).unwrap_or_default(),
        assignee: f.assignee.and_then(|a| a.display_name),
        priority: f.priority.map(|p| p.name),
        parent: f.parent.map(|p| p.key),
        issue_type: f.issuetype.map(|t| t.name),
        fields,
    })
}

fn details_from_node(node: IssueNode) -> Result<TicketDetails, TrackerError> {
    let f = typed_fields(node.fields)?;
    Ok(TicketDetails {
        key: node.key,
        summary: f.summary.unwrap_or_default(),
        status: f.status.map(|s| s.name).unwrap_or_default(),
        assignee: f.assignee.and_then(|a| a.display_name),
        reporter: f.reporter.and_then(|r| r.display_name),
        priority: f.priority.map(|p| p.name),
        labels: f.labels.unwrap_or_default(),
        description: f.description.and_then(|d| match d {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }),
        issue_type: f.issuetype.map(|t| t.name),
    })
}

fn pull_request_from_node(node: PullRequestNode) -> PullRequest {
    PullRequest {
        status: PrStatus::parse(&node.status),
        author: node.author.map(|a| a.name).unwrap_or_default(),
        repository: node.repository_name,
        source_branch: node.source.map(|b| b.branch).unwrap_or_default(),
        destination_branch: node.destination.map(|b| b.branch).unwrap_or_default(),
        title: node.name,
        url: node.url,
        last_update: node.last_update,
    }
}

fn flatten_dev_status(response: DevStatusResponse) -> Vec<PullRequest> {
    response
        .detail
        .into_iter()
        .flat_map(|d| d.pull_requests)
        .map(pull_request_from_node)
        .collect()
}

/// Flatten `detail[].pullRequests[]` from a dev-status response body.
pub fn parse_dev_status(body: &str) -> Result<Vec<PullRequest>, serde_json::Error> {
    serde_json::from_str(body).map(flatten_dev_status)
}

/// Non-empty raw fields of an issue, for `jg debug` and the field picker.
pub fn non_empty_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(_, v)| match v {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            _ => true,
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// JIRA REST client authenticated with basic auth (email + API token).
#[derive(Debug, Clone)]
pub struct JiraClient {
    credentials: JiraCredentials,
}

impl JiraClient {
    pub fn new(credentials: JiraCredentials) -> Self {
        Self { credentials }
    }

    pub fn from_config(store: &ConfigStore) -> Result<Self, ConfigError> {
        Ok(Self::new(store.credentials()?))
    }

    pub fn server(&self) -> &str {
        &self.credentials.server
    }

    pub fn browse_url(&self, key: &str) -> String {
        browse_url(&self.credentials.server, key)
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        HTTP_CLIENT
            .get(format!("{}{}", self.credentials.server, path))
            .basic_auth(&self.credentials.email, Some(&self.credentials.token))
            .header("Accept", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, TrackerError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TrackerError::Api(api_error_message(status, &body)));
        }
        serde_json::from_str(&body)
            .map_err(|e| TrackerError::Api(format!("unexpected response shape: {e}")))
    }

    /// Run a JQL search, following pagination until `max_results` issues are collected.
    pub async fn search_issues(
        &self,
        jql: &str,
        max_results: usize,
        fields: &[String],
    ) -> Result<Vec<Issue>, TrackerError> {
        tracing::debug!("JQL search (max {}): {}", max_results, jql);
        let field_list = fields.join(",");
        let mut issues = Vec::new();
        let mut page_token: Option<String> = None;

        while issues.len() < max_results {
            let page_size = (max_results - issues.len()).min(PAGE_SIZE);
            let mut query = vec![
                ("jql", jql.to_string()),
                ("maxResults", page_size.to_string()),
                ("fields", field_list.clone()),
            ];
            if let Some(token) = &page_token {
                query.push(("nextPageToken", token.clone()));
            }

            let page: SearchPage = self
                .send(self.request("/rest/api/2/search/jql").query(&query))
                .await?;
            let fetched = page.issues.len();
            for node in page.issues {
                issues.push(issue_from_node(node)?);
            }

            match page.next_page_token {
                Some(token) if fetched > 0 && page.is_last != Some(true) => page_token = Some(token),
                _ => break,
            }
        }

        issues.truncate(max_results);
        tracing::debug!("JQL search returned {} issues", issues.len());
        Ok(issues)
    }

    async fn issue_node(&self, key: &str, fields: &[&str]) -> Result<IssueNode, TrackerError> {
        let path = format!("/rest/api/2/issue/{}", urlencoding::encode(key));
        self.send(self.request(&path).query(&[("fields", fields.join(","))]))
            .await
    }

    /// Summary fields for the info panel.
    pub async fn ticket_details(&self, key: &str) -> Result<TicketDetails, TrackerError> {
        self.issue_node(key, &DETAIL_FIELDS).await.and_then(details_from_node)
    }

    /// Numeric id of an issue (needed by the dev-status endpoint).
    pub async fn issue_id(&self, key: &str) -> Result<String, TrackerError> {
        self.issue_node(key, &["summary"]).await.map(|n| n.id)
    }

    /// Every raw field of an issue, keyed by field id.
    pub async fn raw_issue(&self, key: &str) -> Result<(String, Map<String, Value>), TrackerError> {
        let path = format!("/rest/api/2/issue/{}", urlencoding::encode(key));
        let raw: RawIssue = self.send(self.request(&path)).await?;
        tracing::debug!("Fetched raw issue {} (id {})", raw.key, raw.id);
        Ok((raw.key, raw.fields))
    }

    pub async fn list_fields(&self) -> Result<FieldCatalog, TrackerError> {
        let fields: Vec<FieldInfo> = self.send(self.request("/rest/api/2/field")).await?;
        Ok(FieldCatalog::new(fields))
    }

    /// Pull requests linked to an issue through the dev-status integration.
    pub async fn pull_requests(&self, issue_id: &str) -> Result<Vec<PullRequest>, TrackerError> {
        let request = self
            .request("/rest/dev-status/1.0/issue/details")
            .query(&[
                ("issueId", issue_id),
                ("applicationType", "GitHub"),
                ("dataType", "pullrequest"),
            ])
            .timeout(DEV_STATUS_TIMEOUT);
        let response: DevStatusResponse = self.send(request).await?;
        Ok(flatten_dev_status(response))
    }
}

impl IssueSearch for JiraClient {
    fn search(
        &self,
        jql: &str,
        max_results: usize,
        fields: &[String],
    ) -> impl Future<Output = Result<Vec<Issue>, TrackerError>> + Send {
        self.search_issues(jql, max_results, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_issue_from_node_normalizes_fields() {
        let node: IssueNode = serde_json::from_value(json!({
            "id": "10001",
            "key": "SWY-7",
            "fields": {
                "summary": "Fix login",
                "status": {"name": "In Progress"},
                "assignee": null,
                "priority": {"name": "High"},
                "parent": {"key": "SWY-1"},
                "issuetype": {"name": "Story"},
                "customfield_1": {"value": "Team A"},
                "customfield_2": null,
                "components": [{"name": "api"}, {"name": "web"}]
            }
        }))
        .unwrap();
        let issue = issue_from_node(node).unwrap();
        assert_eq!(issue.assignee_label(), "Unassigned");
        assert_eq!(issue.parent.as_deref(), Some("SWY-1"));
        assert_eq!(issue.field_text("customfield_1"), "Team A");
        assert_eq!(issue.field_text("components"), "api, web");
        assert!(!issue.fields.contains_key("customfield_2"));
    }

    #[test]
    fn test_standard_fields_can_back_extra_columns() {
        let node: IssueNode = serde_json::from_value(json!({
            "id": "10002",
            "key": "SWY-8",
            "fields": {
                "summary": "s",
                "labels": ["auth", "web"],
                "reporter": {"displayName": "Ada Lovelace"},
                "status": {"name": "Done"}
            }
        }))
        .unwrap();
        let issue = issue_from_node(node).unwrap();
        assert_eq!(issue.summary, "s");
        assert_eq!(issue.status, "Done");
        assert_eq!(issue.field_text("labels"), "auth, web");
        assert_eq!(issue.field_text("reporter"), "Ada Lovelace");
        assert_eq!(issue.field_text("status"), "Done");
    }

    #[test]
    fn test_mistyped_base_field_is_an_api_error() {
        let node: IssueNode = serde_json::from_value(json!({
            "id": "1",
            "key": "SWY-9",
            "fields": {"summary": 42}
        }))
        .unwrap();
        assert!(matches!(issue_from_node(node), Err(TrackerError::Api(_))));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"errorMessages":["Field 'foo' does not exist."],"errors":{}}"#;
        assert_eq!(
            api_error_message(reqwest::StatusCode::BAD_REQUEST, body),
            "Field 'foo' does not exist."
        );
        assert_eq!(
            api_error_message(reqwest::StatusCode::UNAUTHORIZED, ""),
            "HTTP 401 Unauthorized"
        );
    }

    #[test]
    fn test_parse_dev_status_flattens_details() {
        let body = json!({
            "detail": [
                {"pullRequests": [{
                    "status": "OPEN",
                    "author": {"name": "dev"},
                    "repositoryName": "acme/api",
                    "source": {"branch": "SWY-7-fix"},
                    "destination": {"branch": "main"},
                    "name": "Fix login",
                    "url": "https://github.com/acme/api/pull/1",
                    "lastUpdate": "2024-01-01T00:00:00.000+0000"
                }]},
                {"pullRequests": [{"status": "MERGED", "url": "u2"}]}
            ]
        })
        .to_string();
        let prs = parse_dev_status(&body).unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].status, PrStatus::Open);
        assert_eq!(prs[0].source_branch, "SWY-7-fix");
        assert_eq!(prs[1].status, PrStatus::Merged);
        assert_eq!(prs[1].author, "");
    }

    #[test]
    fn test_browse_url() {
        assert_eq!(
            browse_url("https://acme.atlassian.net/", "SWY-1"),
            "https://acme.atlassian.net/browse/SWY-1"
        );
    }

    #[test]
    fn test_field_catalog_lookups() {
        let catalog = FieldCatalog::new(vec![FieldInfo {
            id: "customfield_10020".into(),
            name: "Sprint".into(),
        }]);
        assert_eq!(catalog.name_for("customfield_10020"), "Sprint");
        assert_eq!(catalog.name_for("unknown"), "unknown");
        assert_eq!(catalog.id_for("sprint"), Some("customfield_10020"));
    }
}
