//! Tests for filter resolution across session overrides and persisted defaults.
//!
//! These tests verify:
//! 1. A session override (even an explicit "none") beats the persisted default
//! 2. Activating the same filter twice returns to the unfiltered state
//! 3. Stale filter names fall back to the built-in query
//! 4. Default toggling keeps the session in sync
//! 5. Deleting a filter clears whatever named it
//! 6. Legacy `jql.<P>` keys migrate into a "Default" filter

mod test_utils;

use jira_git_helper::filters::{
    add_filter, builtin_jql, delete_filter, migrate_legacy_jql, update_filter_jql, FilterSession,
};
use pretty_assertions::assert_eq;
use test_utils::{filter, projects, temp_store};

#[test]
fn test_session_override_beats_persisted_default() {
    let (_dir, mut store) = temp_store();
    store
        .set_filters_for("SWY", &[filter("Mine", "assignee = me"), filter("Bugs", "type = Bug")])
        .unwrap();
    store.set_default_filter("SWY", Some("Mine")).unwrap();

    let mut session = FilterSession::new();
    assert_eq!(session.effective_filter_name(&store, "SWY").as_deref(), Some("Mine"));

    session.set_override("SWY", Some("Bugs".into()));
    assert_eq!(session.effective_filter_name(&store, "SWY").as_deref(), Some("Bugs"));
    assert_eq!(session.jql_for_project(&store, "SWY"), "type = Bug");

    session.force_unfiltered("SWY");
    assert_eq!(session.effective_filter_name(&store, "SWY"), None);
    assert_eq!(session.jql_for_project(&store, "SWY"), builtin_jql("SWY"));
}

#[test]
fn test_absent_override_is_not_the_same_as_none() {
    let (_dir, mut store) = temp_store();
    store.set_filters_for("SWY", &[filter("Mine", "assignee = me")]).unwrap();
    store.set_default_filter("SWY", Some("Mine")).unwrap();

    let mut session = FilterSession::new();
    session.force_unfiltered("SWY");
    assert_eq!(session.override_for("SWY"), Some(None));

    session.clear_override("SWY");
    assert_eq!(session.override_for("SWY"), None);
    assert_eq!(session.effective_filter_name(&store, "SWY").as_deref(), Some("Mine"));
}

#[test]
fn test_toggle_active_twice_restores_previous_state() {
    let (_dir, mut store) = temp_store();
    store.set_filters_for("SWY", &[filter("Bugs", "type = Bug")]).unwrap();
    let mut session = FilterSession::new();
    let before = session.clone();

    session.toggle_active(&store, "SWY", "Bugs");
    assert_eq!(session.effective_filter_name(&store, "SWY").as_deref(), Some("Bugs"));

    session.toggle_active(&store, "SWY", "Bugs");
    assert_eq!(session, before);
    assert_eq!(session.effective_filter_name(&store, "SWY"), None);
}

#[test]
fn test_stale_name_falls_back_to_builtin() {
    let (_dir, store) = temp_store();
    let mut session = FilterSession::new();
    session.set_override("SWY", Some("Gone".into()));
    assert_eq!(session.jql_for_project(&store, "SWY"), builtin_jql("SWY"));
}

#[test]
fn test_toggle_default_syncs_session() {
    let (_dir, mut store) = temp_store();
    store.set_filters_for("SWY", &[filter("Mine", "assignee = me")]).unwrap();
    let mut session = FilterSession::new();

    session.toggle_default(&mut store, "SWY", "Mine").unwrap();
    assert_eq!(store.default_filter("SWY").as_deref(), Some("Mine"));
    assert_eq!(session.override_for("SWY"), Some(Some("Mine")));

    session.toggle_default(&mut store, "SWY", "Mine").unwrap();
    assert_eq!(store.default_filter("SWY"), None);
    assert_eq!(session.override_for("SWY"), None);
    assert_eq!(store.get("filters.SWY.default"), None);
}

#[test]
fn test_add_edit_delete_filters() {
    let (_dir, mut store) = temp_store();
    let mut session = FilterSession::new();

    assert!(add_filter(&mut store, "SWY", filter("Mine", "assignee = me")).unwrap());
    assert!(!add_filter(&mut store, "SWY", filter("Mine", "other")).unwrap());
    assert!(update_filter_jql(&mut store, "SWY", "Mine", "assignee = currentUser()").unwrap());
    assert!(!update_filter_jql(&mut store, "SWY", "Nope", "x").unwrap());
    assert_eq!(store.filters_for("SWY"), vec![filter("Mine", "assignee = currentUser()")]);

    session.toggle_default(&mut store, "SWY", "Mine").unwrap();
    delete_filter(&mut store, &mut session, "SWY", "Mine").unwrap();
    assert!(store.filters_for("SWY").is_empty());
    assert_eq!(store.default_filter("SWY"), None);
    assert_eq!(session.override_for("SWY"), None);
}

#[test]
fn test_malformed_filter_json_reads_as_empty() {
    let (_dir, mut store) = temp_store();
    store.set("filters.SWY", "[{not json").unwrap();
    assert!(store.filters_for("SWY").is_empty());
    let session = FilterSession::new();
    assert_eq!(session.jql_for_project(&store, "SWY"), builtin_jql("SWY"));
}

#[test]
fn test_legacy_jql_migration() {
    let (_dir, mut store) = temp_store();
    store.set("jql.SWY", "project = SWY AND sprint in openSprints()").unwrap();
    store.set("jql.ABC", "project = ABC").unwrap();
    store.set_filters_for("ABC", &[filter("Existing", "x")]).unwrap();
    let mut session = FilterSession::new();

    let migrated = migrate_legacy_jql(&mut store, &mut session, &projects(&["SWY", "ABC"])).unwrap();

    assert_eq!(migrated, vec!["SWY".to_string()]);
    assert_eq!(
        store.filters_for("SWY"),
        vec![filter("Default", "project = SWY AND sprint in openSprints()")]
    );
    assert_eq!(store.default_filter("SWY").as_deref(), Some("Default"));
    assert_eq!(session.override_for("SWY"), Some(Some("Default")));
    // ABC already had filters: untouched, but the legacy key is still dropped
    assert_eq!(store.filters_for("ABC"), vec![filter("Existing", "x")]);
    assert_eq!(store.get("jql.SWY"), None);
    assert_eq!(store.get("jql.ABC"), None);
}

#[test]
fn test_status_line() {
    let (_dir, mut store) = temp_store();
    store.set_filters_for("SWY", &[filter("Mine", "x")]).unwrap();
    store.set_default_filter("SWY", Some("Mine")).unwrap();
    let session = FilterSession::new();
    assert_eq!(session.status_line(&store, &projects(&["SWY", "ABC"])), "SWY: Mine  ABC: *");
}
