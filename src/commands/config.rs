//! `jg config get|set|list`.

use super::fmt::render_list;
use super::{Context, Exit};
use super::stage::{FMT_ON_ADD, OPEN_ON_PUSH};
use crate::config::ConfigStore;
use anyhow::Result;

struct KnownKey {
    key: &'static str,
    description: &'static str,
    secret: bool,
}

const KNOWN_KEYS: [KnownKey; 6] = [
    KnownKey {
        key: "server",
        description: "JIRA server URL, e.g. https://yourcompany.atlassian.net",
        secret: false,
    },
    KnownKey {
        key: "email",
        description: "JIRA account email",
        secret: false,
    },
    KnownKey {
        key: "token",
        description: "JIRA API token",
        secret: true,
    },
    KnownKey {
        key: "projects",
        description: "Project key(s) for the ticket picker, e.g. SWY or SWY,ABC (optional)",
        secret: false,
    },
    KnownKey {
        key: FMT_ON_ADD,
        description: "Run formatters before committing in 'jg add' (true/false, default false)",
        secret: false,
    },
    KnownKey {
        key: OPEN_ON_PUSH,
        description: "Open the PR in the browser after 'jg push' (true/false, default true)",
        secret: false,
    },
];

pub fn get(ctx: &Context, key: &str) -> Result<()> {
    match ctx.store.get(key) {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(Exit::err(format!("{key} is not set"))),
    }
}

pub fn set(ctx: &mut Context, key: &str, value: &str) -> Result<()> {
    ctx.store.set(key, value)?;
    println!("{key} = {value}");
    Ok(())
}

/// Known keys (token masked), then named filters, then formatters.
pub fn render_config_list(store: &ConfigStore) -> String {
    let mut out = String::new();
    for known in &KNOWN_KEYS {
        match store.get(known.key).filter(|v| !v.is_empty()) {
            Some(_) if known.secret => out.push_str(&format!("{} = ****\n", known.key)),
            Some(value) => out.push_str(&format!("{} = {value}\n", known.key)),
            None => out.push_str(&format!("{} = (not set)  # {}\n", known.key, known.description)),
        }
    }

    let filter_projects = store.filter_projects();
    if !filter_projects.is_empty() {
        out.push('\n');
        for project in filter_projects {
            let default = store.default_filter(&project);
            for filter in store.filters_for(&project) {
                let marker = if default.as_deref() == Some(filter.name.as_str()) {
                    " (default)"
                } else {
                    ""
                };
                out.push_str(&format!("filters.{project}  {}{marker}\n", filter.name));
                out.push_str(&format!("  jql: {}\n", filter.jql));
            }
        }
    }

    let formatters = store.formatters();
    if !formatters.is_empty() {
        out.push('\n');
        out.push_str(&render_list(&formatters, "fmt  "));
    }
    out
}

pub fn list(ctx: &Context) -> Result<()> {
    print!("{}", render_config_list(&ctx.store));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NamedFilter;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_masks_token_and_marks_default_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("config")).unwrap();
        store.set("server", "https://acme.atlassian.net").unwrap();
        store.set("token", "secret").unwrap();
        store.set(OPEN_ON_PUSH, "false").unwrap();
        store
            .set_filters_for(
                "SWY",
                &[
                    NamedFilter {
                        name: "Mine".into(),
                        jql: "assignee = currentUser()".into(),
                    },
                    NamedFilter {
                        name: "All".into(),
                        jql: "project = SWY".into(),
                    },
                ],
            )
            .unwrap();
        store.set_default_filter("SWY", Some("Mine")).unwrap();

        let text = render_config_list(&store);
        assert_eq!(
            text,
            "server = https://acme.atlassian.net\n\
             email = (not set)  # JIRA account email\n\
             token = ****\n\
             projects = (not set)  # Project key(s) for the ticket picker, e.g. SWY or SWY,ABC (optional)\n\
             fmt_on_add = (not set)  # Run formatters before committing in 'jg add' (true/false, default false)\n\
             open_on_push = false\n\
             \n\
             filters.SWY  Mine (default)\n\
             \x20 jql: assignee = currentUser()\n\
             filters.SWY  All\n\
             \x20 jql: project = SWY\n"
        );
        assert!(!text.contains("secret"));
    }
}
