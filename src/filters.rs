//! Filter resolution: which JQL governs a project right now.
//!
//! Three layers, highest first:
//!   1. A session override held by [`FilterSession`] for this process only.
//!      An override of `None` forces the built-in query.
//!   2. The persisted default (`filters.<P>.default`).
//!   3. The built-in query for the project.

use crate::config::{ConfigError, ConfigStore};
use crate::data::NamedFilter;
use std::collections::HashMap;

/// Query used when no project is configured at all.
pub const FALLBACK_JQL: &str = "assignee = currentUser() ORDER BY updated DESC";

/// Built-in per-project query.
pub fn builtin_jql(project: &str) -> String {
    format!("project = {project} AND assignee = currentUser() ORDER BY updated DESC")
}

/// Session-scoped filter activations, owned by one CLI invocation.
///
/// Presence in the map matters: an absent project falls back to the persisted
/// default, while a present `None` forces no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSession {
    overrides: HashMap<String, Option<String>>,
}

impl FilterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when the project has no override, `Some(None)` for a forced "no filter".
    pub fn override_for(&self, project: &str) -> Option<Option<&str>> {
        self.overrides.get(project).map(|v| v.as_deref())
    }

    pub fn set_override(&mut self, project: &str, name: Option<String>) {
        self.overrides.insert(project.to_string(), name);
    }

    pub fn clear_override(&mut self, project: &str) {
        self.overrides.remove(project);
    }

    /// Name of the filter governing `project`, if any.
    pub fn effective_filter_name(&self, store: &ConfigStore, project: &str) -> Option<String> {
        match self.overrides.get(project) {
            Some(name) => name.clone().filter(|n| !n.is_empty()),
            None => store.default_filter(project),
        }
    }

    /// JQL for `project`. A name that no longer resolves falls back to the built-in query.
    pub fn jql_for_project(&self, store: &ConfigStore, project: &str) -> String {
        if let Some(name) = self.effective_filter_name(store, project) {
            if let Some(filter) = store.filters_for(project).into_iter().find(|f| f.name == name) {
                return filter.jql;
            }
            tracing::debug!("Filter {} for {} no longer exists, using built-in", name, project);
        }
        builtin_jql(project)
    }

    /// True when any of `projects` has an effective named filter.
    pub fn any_filter_active(&self, store: &ConfigStore, projects: &[String]) -> bool {
        projects
            .iter()
            .any(|p| self.effective_filter_name(store, p).is_some())
    }

    /// Activate `name` for this session, or drop the override if it is already effective.
    pub fn toggle_active(&mut self, store: &ConfigStore, project: &str, name: &str) {
        if self.effective_filter_name(store, project).as_deref() == Some(name) {
            self.clear_override(project);
        } else {
            self.set_override(project, Some(name.to_string()));
        }
    }

    /// Make `name` the persisted default, or clear it if it already is. The
    /// session override follows so the change is visible immediately.
    pub fn toggle_default(
        &mut self,
        store: &mut ConfigStore,
        project: &str,
        name: &str,
    ) -> Result<(), ConfigError> {
        if store.default_filter(project).as_deref() == Some(name) {
            store.set_default_filter(project, None)?;
            self.clear_override(project);
        } else {
            store.set_default_filter(project, Some(name))?;
            self.set_override(project, Some(name.to_string()));
        }
        Ok(())
    }

    /// Run the built-in query for `project` for the rest of this session.
    pub fn force_unfiltered(&mut self, project: &str) {
        self.set_override(project, None);
    }

    /// One `P: name` entry per project, `*` when no filter applies.
    pub fn status_line(&self, store: &ConfigStore, projects: &[String]) -> String {
        projects
            .iter()
            .map(|p| {
                let name = self
                    .effective_filter_name(store, p)
                    .unwrap_or_else(|| "*".to_string());
                format!("{p}: {name}")
            })
            .collect::<Vec<_>>()
            .join("  ")
    }
}

/// Marker shown beside a filter in the filter manager.
pub fn filter_marker(name: &str, effective: Option<&str>, default: Option<&str>) -> &'static str {
    if effective == Some(name) {
        if default == Some(name) {
            "●"
        } else {
            "▶"
        }
    } else if default == Some(name) {
        "○"
    } else {
        " "
    }
}

/// Append a filter. Returns `false` without writing when the name is taken.
pub fn add_filter(
    store: &mut ConfigStore,
    project: &str,
    filter: NamedFilter,
) -> Result<bool, ConfigError> {
    let mut filters = store.filters_for(project);
    if filters.iter().any(|f| f.name == filter.name) {
        return Ok(false);
    }
    filters.push(filter);
    store.set_filters_for(project, &filters)?;
    Ok(true)
}

/// Replace the JQL of an existing filter. Returns `false` when no filter has that name.
pub fn update_filter_jql(
    store: &mut ConfigStore,
    project: &str,
    name: &str,
    jql: &str,
) -> Result<bool, ConfigError> {
    let mut filters = store.filters_for(project);
    let Some(filter) = filters.iter_mut().find(|f| f.name == name) else {
        return Ok(false);
    };
    filter.jql = jql.to_string();
    store.set_filters_for(project, &filters)?;
    Ok(true)
}

/// Delete a filter and clear the default or session override that named it.
pub fn delete_filter(
    store: &mut ConfigStore,
    session: &mut FilterSession,
    project: &str,
    name: &str,
) -> Result<(), ConfigError> {
    let filters: Vec<NamedFilter> = store
        .filters_for(project)
        .into_iter()
        .filter(|f| f.name != name)
        .collect();
    store.set_filters_for(project, &filters)?;
    if store.default_filter(project).as_deref() == Some(name) {
        store.set_default_filter(project, None)?;
    }
    if session.override_for(project) == Some(Some(name)) {
        session.clear_override(project);
    }
    Ok(())
}

/// Convert legacy `jql.<P>` keys into a named filter "Default".
///
/// The filter is only created when the project has no filters yet; the legacy
/// key is always removed. Returns the projects that gained a filter.
pub fn migrate_legacy_jql(
    store: &mut ConfigStore,
    session: &mut FilterSession,
    projects: &[String],
) -> Result<Vec<String>, ConfigError> {
    let mut migrated = Vec::new();
    for project in projects {
        let key = format!("jql.{project}");
        let Some(legacy) = store.get(&key).filter(|v| !v.is_empty()).map(str::to_string) else {
            continue;
        };
        if store.filters_for(project).is_empty() {
            let filter = NamedFilter {
                name: "Default".to_string(),
                jql: legacy,
            };
            store.set_filters_for(project, &[filter])?;
            store.set_default_filter(project, Some("Default"))?;
            session.set_override(project, Some("Default".to_string()));
            tracing::info!("Migrated {} to a named filter 'Default'", key);
            migrated.push(project.clone());
        }
        store.remove(&key)?;
    }
    Ok(migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(filter_marker("a", Some("a"), Some("a")), "●");
        assert_eq!(filter_marker("a", Some("a"), None), "▶");
        assert_eq!(filter_marker("a", Some("b"), Some("a")), "○");
        assert_eq!(filter_marker("a", None, None), " ");
    }

    #[test]
    fn test_builtin_jql() {
        assert_eq!(
            builtin_jql("SWY"),
            "project = SWY AND assignee = currentUser() ORDER BY updated DESC"
        );
    }
}
