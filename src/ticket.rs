//! The active ticket for the current shell.
//!
//! Resolution order:
//!   1. `JG_TICKET` when defined, even if empty. An empty value means the
//!      shell explicitly cleared its ticket and must not fall through.
//!   2. The persisted state file.
//!   3. Nothing.

use crate::config::{self, ConfigError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub const TICKET_ENV: &str = "JG_TICKET";

static TICKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9]*)-\d+$").expect("ticket regex"));

/// Resolve the active ticket from the environment value and state file contents.
pub fn resolve_ticket(env: Option<&str>, state_file: Option<&str>) -> Option<String> {
    let raw = match env {
        Some(value) => value,
        None => state_file?,
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Reject tickets whose project prefix is not configured. Anything goes with no projects.
pub fn validate_ticket_project(ticket: &str, projects: &[String]) -> Result<(), ConfigError> {
    if projects.is_empty() {
        return Ok(());
    }
    let caps = TICKET_RE
        .captures(ticket)
        .ok_or_else(|| ConfigError::InvalidTicket(ticket.to_string()))?;
    let prefix = caps[1].to_uppercase();
    if projects.iter().any(|p| p.eq_ignore_ascii_case(&prefix)) {
        Ok(())
    } else {
        Err(ConfigError::UnknownProject {
            ticket: ticket.to_string(),
            allowed: projects.join(", "),
        })
    }
}

/// Extract `PROJ-123` from the start of a branch name for any configured project.
pub fn ticket_from_branch(branch: &str, projects: &[String]) -> Option<String> {
    projects.iter().find_map(|project| {
        let pattern = format!(r"(?i)^({}-\d+)", regex::escape(project));
        let re = Regex::new(&pattern).ok()?;
        re.captures(branch).map(|c| c[1].to_uppercase())
    })
}

/// True when `branch` starts with `<project>-` for one of `projects`.
pub fn branch_in_projects(branch: &str, projects: &[String]) -> bool {
    let upper = branch.to_uppercase();
    projects
        .iter()
        .any(|p| upper.starts_with(&format!("{}-", p.to_uppercase())))
}

#[derive(Debug, Clone)]
pub struct TicketStore {
    state_file: PathBuf,
}

impl TicketStore {
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::at(config::data_dir()?.join("ticket")))
    }

    pub fn at(state_file: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
        }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Active ticket for this process.
    pub fn current(&self) -> Option<String> {
        let env = std::env::var_os(TICKET_ENV).map(|v| v.to_string_lossy().into_owned());
        self.current_with_env(env.as_deref())
    }

    /// Active ticket given an explicit environment value.
    pub fn current_with_env(&self, env: Option<&str>) -> Option<String> {
        if env.is_some() {
            return resolve_ticket(env, None);
        }
        let contents = match std::fs::read_to_string(&self.state_file) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", self.state_file.display(), e);
                None
            }
        };
        resolve_ticket(None, contents.as_deref())
    }

    /// The persisted ticket, ignoring the environment.
    pub fn persisted(&self) -> Option<String> {
        self.current_with_env(None)
    }

    pub fn save(&self, ticket: &str, projects: &[String]) -> Result<(), ConfigError> {
        validate_ticket_project(ticket, projects)?;
        if let Some(parent) = self.state_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        std::fs::write(&self.state_file, ticket).map_err(|e| ConfigError::io(&self.state_file, e))
    }

    pub fn clear(&self) -> Result<(), ConfigError> {
        match std::fs::remove_file(&self.state_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::io(&self.state_file, e)),
        }
    }
}
