//! Persistent `key=value` configuration.
//!
//! The store keeps an in-memory snapshot for lookups. Every mutation re-reads
//! the file, applies the change, and replaces the whole file, so a concurrent
//! writer can lose an update but never leave a half-written line behind.

use crate::data::{FormatterRule, NamedFilter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "jira-git-helper";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JIRA server not configured. Run: jg config set server https://yourcompany.atlassian.net")]
    MissingServer,
    #[error("JIRA token not configured. Run: jg config set token <api-token>")]
    MissingToken,
    #[error("JIRA email not configured. Run: jg config set email you@example.com")]
    MissingEmail,
    #[error("Invalid ticket format: {0}")]
    InvalidTicket(String),
    #[error("Ticket {ticket} does not match configured projects ({allowed})")]
    UnknownProject { ticket: String, allowed: String },
    #[error("Could not determine home directory")]
    NoHomeDir,
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `~/.config/jira-git-helper`
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".config").join(APP_DIR))
}

/// `~/.local/share/jira-git-helper`
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".local").join("share").join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config"))
}

/// Parse config text. Blank lines, `#` comments, and lines without `=` are skipped.
pub fn parse_config(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

/// Render config text: one `key=value` per line, sorted by key, trailing newline.
pub fn render_config(values: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (k, v) in values {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push('\n');
    }
    if out.is_empty() {
        out.push('\n');
    }
    out
}

/// Credentials for the tracker's REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub server: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl ConfigStore {
    /// Open the store at the default location.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(default_config_path()?)
    }

    /// Open the store at `path`. A missing file is an empty config.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = read_file(&path)?;
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Non-empty value for `key`.
    fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.mutate(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    pub fn remove(&mut self, key: &str) -> Result<(), ConfigError> {
        self.mutate(|values| {
            values.remove(key);
        })
    }

    /// Read-modify-write against the file on disk, then refresh the snapshot.
    pub fn mutate(
        &mut self,
        apply: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), ConfigError> {
        let mut values = read_file(&self.path)?;
        apply(&mut values);
        write_file(&self.path, &values)?;
        self.values = values;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Typed helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Configured project keys, upper-cased, in configured order.
    pub fn projects(&self) -> Vec<String> {
        split_list(self.get("projects").unwrap_or(""))
            .map(|p| p.to_uppercase())
            .collect()
    }

    /// Extra field ids shown as columns for `project`.
    pub fn fields_for(&self, project: &str) -> Vec<String> {
        split_list(self.get(&format!("fields.{project}")).unwrap_or(""))
            .map(str::to_string)
            .collect()
    }

    pub fn set_fields_for(&mut self, project: &str, field_ids: &[String]) -> Result<(), ConfigError> {
        let mut sorted = field_ids.to_vec();
        sorted.sort();
        sorted.dedup();
        self.set(&format!("fields.{project}"), &sorted.join(","))
    }

    /// Named filters for `project`. Malformed JSON reads as an empty list.
    pub fn filters_for(&self, project: &str) -> Vec<NamedFilter> {
        let key = format!("filters.{project}");
        decode_list(&key, self.get(&key))
    }

    pub fn set_filters_for(&mut self, project: &str, filters: &[NamedFilter]) -> Result<(), ConfigError> {
        let key = format!("filters.{project}");
        let encoded = encode_list(&key, filters)?;
        self.set(&key, &encoded)
    }

    /// Persisted default filter name for `project`.
    pub fn default_filter(&self, project: &str) -> Option<String> {
        self.get_nonempty(&format!("filters.{project}.default"))
            .map(str::to_string)
    }

    /// Set or clear the persisted default filter. `None` removes the key.
    pub fn set_default_filter(&mut self, project: &str, name: Option<&str>) -> Result<(), ConfigError> {
        let key = format!("filters.{project}.default");
        match name.filter(|n| !n.is_empty()) {
            Some(name) => self.set(&key, name),
            None => self.remove(&key),
        }
    }

    /// Project keys that have a `filters.<P>` list, sorted.
    pub fn filter_projects(&self) -> Vec<String> {
        self.values
            .keys()
            .filter_map(|k| k.strip_prefix("filters."))
            .filter(|rest| !rest.contains('.'))
            .map(str::to_string)
            .collect()
    }

    pub fn formatters(&self) -> Vec<FormatterRule> {
        decode_list("fmt", self.get("fmt"))
    }

    pub fn set_formatters(&mut self, formatters: &[FormatterRule]) -> Result<(), ConfigError> {
        let encoded = encode_list("fmt", formatters)?;
        self.set("fmt", &encoded)
    }

    /// Boolean flag: `"true"` is true, any other value is false, absent is `default`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => value == "true",
            None => default,
        }
    }

    /// Tracker base URL with any trailing slash removed.
    pub fn server(&self) -> Result<String, ConfigError> {
        self.get_nonempty("server")
            .map(|s| s.trim_end_matches('/').to_string())
            .ok_or(ConfigError::MissingServer)
    }

    pub fn credentials(&self) -> Result<JiraCredentials, ConfigError> {
        let server = self.server()?;
        let token = self
            .get_nonempty("token")
            .ok_or(ConfigError::MissingToken)?
            .to_string();
        let email = self
            .get_nonempty("email")
            .ok_or(ConfigError::MissingEmail)?
            .to_string();
        Ok(JiraCredentials {
            server,
            email,
            token,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn decode_list<T: serde::de::DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(list) => list,
        Err(e) => {
            tracing::debug!("Ignoring malformed {}: {}", key, e);
            Vec::new()
        }
    }
}

fn encode_list<T: Serialize>(key: &str, items: &[T]) -> Result<String, ConfigError> {
    // serde_json's compact writer emits no whitespace between separators.
    serde_json::to_string(items).map_err(|source| ConfigError::Encode {
        key: key.to_string(),
        source,
    })
}

fn read_file(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_config(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

fn write_file(path: &Path, values: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
    }
    std::fs::write(path, render_config(values)).map_err(|e| ConfigError::io(path, e))?;

    // The file holds an API token
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .map_err(|e| ConfigError::io(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_skips_comments_and_junk() {
        let parsed = parse_config("# comment\n\nserver = https://x \nnot a pair\nprojects=SWY,abc\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["server"], "https://x");
        assert_eq!(parsed["projects"], "SWY,abc");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let parsed = parse_config("filters.SWY=[{\"name\":\"a\",\"jql\":\"x = 1\"}]\n");
        assert_eq!(parsed["filters.SWY"], "[{\"name\":\"a\",\"jql\":\"x = 1\"}]");
    }

    #[test]
    fn test_render_sorted_with_trailing_newline() {
        let mut values = BTreeMap::new();
        values.insert("token".to_string(), "t".to_string());
        values.insert("email".to_string(), "e".to_string());
        assert_eq!(render_config(&values), "email=e\ntoken=t\n");
    }

    #[test]
    fn test_flag_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        assert!(store.flag("open_on_push", true));
        store.set("open_on_push", "false").unwrap();
        assert!(!store.flag("open_on_push", true));
        store.set("open_on_push", "yes").unwrap();
        assert!(!store.flag("open_on_push", true));
        store.set("open_on_push", "true").unwrap();
        assert!(store.flag("open_on_push", false));
    }

    #[test]
    fn test_credentials_report_first_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        assert!(matches!(store.credentials(), Err(ConfigError::MissingServer)));
        store.set("server", "https://acme.atlassian.net/").unwrap();
        assert!(matches!(store.credentials(), Err(ConfigError::MissingToken)));
        store.set("token", "secret").unwrap();
        assert!(matches!(store.credentials(), Err(ConfigError::MissingEmail)));
        store.set("email", "me@acme.io").unwrap();
        let creds = store.credentials().unwrap();
        assert_eq!(creds.server, "https://acme.atlassian.net");
    }
}
