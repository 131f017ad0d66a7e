pub mod hierarchy;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Longest preview shown for a single field value.
pub const PREVIEW_WIDTH: usize = 80;

/// Longest description excerpt shown in ticket info panels.
pub const DESCRIPTION_LIMIT: usize = 800;

/// A saved JQL query for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedFilter {
    pub name: String,
    pub jql: String,
}

/// An external formatting command applied to files whose basename matches `glob`.
///
/// `cmd` carries a `{}` placeholder that is replaced with the absolute file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatterRule {
    pub name: String,
    pub glob: String,
    pub cmd: String,
}

impl FormatterRule {
    pub fn command_for(&self, abs_path: &str) -> String {
        self.cmd.replace("{}", abs_path)
    }
}

/// Normalized value of a tracker field that is not part of the base set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Named(String),
}

/// Keys probed, in order, when reducing a JSON object to a single display name.
const NAMED_KEYS: [&str; 4] = ["value", "name", "displayName", "key"];
/// List elements prefer `name` first (components, versions, sprints).
const LIST_ITEM_KEYS: [&str; 4] = ["name", "value", "displayName", "key"];

impl FieldValue {
    /// Normalize a raw JSON field value. Null and empty values yield `None`.
    pub fn from_json(raw: &Value) -> Option<Self> {
        match raw {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Text(b.to_string())),
            Value::Number(n) => Some(Self::Text(n.to_string())),
            Value::Array(items) => {
                if items.is_empty() {
                    return None;
                }
                let names: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(_) => first_named(item, &LIST_ITEM_KEYS),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                Some(Self::List(names))
            }
            Value::Object(map) => {
                if map.is_empty() {
                    return None;
                }
                Some(Self::Named(
                    first_named(raw, &NAMED_KEYS).unwrap_or_else(|| raw.to_string()),
                ))
            }
        }
    }

    /// Full display string used in table cells.
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) | Self::Named(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }

    /// Short preview: lists show the first four entries then `+N`, everything capped.
    pub fn preview(&self) -> String {
        let text = match self {
            Self::Text(s) | Self::Named(s) => s.clone(),
            Self::List(items) => {
                let mut text = items.iter().take(4).cloned().collect::<Vec<_>>().join(", ");
                if items.len() > 4 {
                    text.push_str(&format!(" +{}", items.len() - 4));
                }
                text
            }
        };
        truncate_chars(&text, PREVIEW_WIDTH)
    }
}

fn first_named(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(k)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    })
}

/// Truncate to at most `max` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// A read-only snapshot of a tracker issue as fetched for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub key: String,
    pub id: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub parent: Option<String>,
    pub issue_type: Option<String>,
    /// Extra fields keyed by tracker field id.
    pub fields: BTreeMap<String, FieldValue>,
}

impl Issue {
    /// Project prefix of the key (`SWY` for `SWY-12`).
    pub fn project(&self) -> &str {
        self.key.split('-').next().unwrap_or(&self.key)
    }

    pub fn assignee_label(&self) -> &str {
        self.assignee.as_deref().unwrap_or("Unassigned")
    }

    pub fn priority_label(&self) -> &str {
        self.priority.as_deref().unwrap_or("—")
    }

    pub fn field_text(&self, field_id: &str) -> String {
        self.fields
            .get(field_id)
            .map(FieldValue::display)
            .unwrap_or_default()
    }

    /// Case-insensitive substring match over every visible column.
    pub fn matches(&self, query: &str, extra_fields: &[String]) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        self.key.to_lowercase().contains(&q)
            || self.summary.to_lowercase().contains(&q)
            || self
                .assignee
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&q))
            || self.status.to_lowercase().contains(&q)
            || extra_fields
                .iter()
                .any(|f| self.field_text(f).to_lowercase().contains(&q))
    }
}

/// Detail view of a single ticket (info modal, `jg info`, branch prompt).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketDetails {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub priority: Option<String>,
    pub labels: Vec<String>,
    pub description: Option<String>,
    pub issue_type: Option<String>,
}

impl TicketDetails {
    pub fn assignee_label(&self) -> &str {
        self.assignee.as_deref().unwrap_or("Unassigned")
    }

    pub fn reporter_label(&self) -> &str {
        self.reporter.as_deref().unwrap_or("Unknown")
    }

    pub fn priority_label(&self) -> &str {
        self.priority.as_deref().unwrap_or("—")
    }

    pub fn labels_label(&self) -> String {
        if self.labels.is_empty() {
            "—".to_string()
        } else {
            self.labels.join(", ")
        }
    }

    /// Description trimmed and cut at [`DESCRIPTION_LIMIT`] characters.
    /// The flag reports whether anything was cut.
    pub fn description_excerpt(&self) -> (String, bool) {
        let desc = self.description.as_deref().unwrap_or("").trim();
        if desc.chars().count() > DESCRIPTION_LIMIT {
            (truncate_chars(desc, DESCRIPTION_LIMIT), true)
        } else {
            (desc.to_string(), false)
        }
    }
}

/// Pull request state as reported by the tracker's dev-status endpoint or `gh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrStatus {
    Open,
    Draft,
    Merged,
    Declined,
    Other(String),
}

impl PrStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "OPEN" => Self::Open,
            "DRAFT" => Self::Draft,
            "MERGED" => Self::Merged,
            "DECLINED" => Self::Declined,
            _ => Self::Other(raw.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Open => "OPEN",
            Self::Draft => "DRAFT",
            Self::Merged => "MERGED",
            Self::Declined => "DECLINED",
            Self::Other(raw) => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub status: PrStatus,
    pub author: String,
    pub repository: String,
    pub source_branch: String,
    pub destination_branch: String,
    pub title: String,
    pub url: String,
    pub last_update: String,
}

impl PullRequest {
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let q = query.to_lowercase();
        [
            self.status.label(),
            &self.author,
            &self.repository,
            &self.source_branch,
            &self.title,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&q))
    }
}

/// Open pull requests first, then by last update.
pub fn sort_pull_requests(prs: &mut [PullRequest]) {
    prs.sort_by(|a, b| {
        (a.status != PrStatus::Open, &a.last_update)
            .cmp(&(b.status != PrStatus::Open, &b.last_update))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_shapes() {
        assert_eq!(
            FieldValue::from_json(&json!("plain")),
            Some(FieldValue::Text("plain".into()))
        );
        assert_eq!(
            FieldValue::from_json(&json!({"value": "High", "id": "1"})),
            Some(FieldValue::Named("High".into()))
        );
        assert_eq!(
            FieldValue::from_json(&json!([{"name": "api"}, "web"])),
            Some(FieldValue::List(vec!["api".into(), "web".into()]))
        );
        assert_eq!(FieldValue::from_json(&json!(null)), None);
        assert_eq!(FieldValue::from_json(&json!([])), None);
        assert_eq!(FieldValue::from_json(&json!("")), None);
    }

    #[test]
    fn test_list_preview_collapses_tail() {
        let value = FieldValue::List((1..=6).map(|n| format!("c{n}")).collect());
        assert_eq!(value.preview(), "c1, c2, c3, c4 +2");
        assert_eq!(value.display(), "c1, c2, c3, c4, c5, c6");
    }

    #[test]
    fn test_preview_truncates() {
        let value = FieldValue::Text("x".repeat(200));
        assert_eq!(value.preview().chars().count(), PREVIEW_WIDTH);
    }

    #[test]
    fn test_ticket_details_labels() {
        let details = TicketDetails::default();
        assert_eq!(details.assignee_label(), "Unassigned");
        assert_eq!(details.reporter_label(), "Unknown");
        assert_eq!(details.priority_label(), "—");
        assert_eq!(details.labels_label(), "—");
    }

    #[test]
    fn test_description_excerpt_cut() {
        let details = TicketDetails {
            description: Some("é".repeat(900)),
            ..Default::default()
        };
        let (text, cut) = details.description_excerpt();
        assert!(cut);
        assert_eq!(text.chars().count(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_pr_sort_open_first() {
        let pr = |status: &str, updated: &str| PullRequest {
            status: PrStatus::parse(status),
            author: String::new(),
            repository: String::new(),
            source_branch: String::new(),
            destination_branch: String::new(),
            title: updated.to_string(),
            url: String::new(),
            last_update: updated.to_string(),
        };
        let mut prs = vec![pr("MERGED", "1"), pr("OPEN", "3"), pr("OPEN", "2")];
        sort_pull_requests(&mut prs);
        let order: Vec<_> = prs.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(order, vec!["2", "3", "1"]);
    }
}
