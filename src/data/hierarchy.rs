//! Parent/child grouping for the ticket picker's tree mode.

use super::Issue;
use std::collections::{HashMap, HashSet};

/// One visible row of the flattened issue tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    /// Index into the issue slice the tree was built from.
    pub index: usize,
    pub depth: usize,
    /// False when the row is only shown because a descendant matched.
    pub matched: bool,
}

/// Group issues under their parents. Issues whose parent is not in the slice are roots.
pub fn build_tree(issues: &[Issue]) -> (Vec<usize>, HashMap<String, Vec<usize>>) {
    let keys: HashSet<&str> = issues.iter().map(|i| i.key.as_str()).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<String, Vec<usize>> = HashMap::new();

    for (idx, issue) in issues.iter().enumerate() {
        match issue.parent.as_deref() {
            Some(parent) if keys.contains(parent) && parent != issue.key => {
                children.entry(parent.to_string()).or_default().push(idx);
            }
            _ => roots.push(idx),
        }
    }
    (roots, children)
}

/// Depth-first flattening that keeps an ancestor visible when any descendant matches.
pub fn flatten_tree(issues: &[Issue], query: &str, extra_fields: &[String]) -> Vec<TreeRow> {
    let (roots, children) = build_tree(issues);
    let mut rows = Vec::new();
    let mut visiting = HashSet::new();
    for root in roots {
        push_branch(
            issues,
            &children,
            root,
            0,
            query,
            extra_fields,
            &mut visiting,
            &mut rows,
        );
    }
    rows
}

fn branch_matches(
    issues: &[Issue],
    children: &HashMap<String, Vec<usize>>,
    idx: usize,
    query: &str,
    extra_fields: &[String],
    visiting: &mut HashSet<usize>,
) -> bool {
    if query.is_empty() || issues[idx].matches(query, extra_fields) {
        return true;
    }
    if !visiting.insert(idx) {
        return false;
    }
    let found = children
        .get(&issues[idx].key)
        .into_iter()
        .flatten()
        .any(|&c| branch_matches(issues, children, c, query, extra_fields, visiting));
    visiting.remove(&idx);
    found
}

#[allow(clippy::too_many_arguments)]
fn push_branch(
    issues: &[Issue],
    children: &HashMap<String, Vec<usize>>,
    idx: usize,
    depth: usize,
    query: &str,
    extra_fields: &[String],
    visiting: &mut HashSet<usize>,
    rows: &mut Vec<TreeRow>,
) {
    if !branch_matches(issues, children, idx, query, extra_fields, visiting) {
        return;
    }
    if !visiting.insert(idx) {
        return;
    }
    rows.push(TreeRow {
        index: idx,
        depth,
        matched: query.is_empty() || issues[idx].matches(query, extra_fields),
    });
    if let Some(kids) = children.get(&issues[idx].key) {
        for &child in kids {
            push_branch(
                issues,
                children,
                child,
                depth + 1,
                query,
                extra_fields,
                visiting,
                rows,
            );
        }
    }
    visiting.remove(&idx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn issue(key: &str, parent: Option<&str>, summary: &str) -> Issue {
        Issue {
            key: key.to_string(),
            id: key.to_string(),
            summary: summary.to_string(),
            status: "To Do".to_string(),
            assignee: None,
            priority: None,
            parent: parent.map(str::to_string),
            issue_type: None,
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn test_children_nest_under_parent() {
        let issues = vec![
            issue("A-1", None, "epic"),
            issue("A-2", Some("A-1"), "story"),
            issue("A-3", Some("X-9"), "orphan"),
        ];
        let rows = flatten_tree(&issues, "", &[]);
        let shape: Vec<_> = rows.iter().map(|r| (r.index, r.depth)).collect();
        assert_eq!(shape, vec![(0, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_ancestor_of_match_is_dimmed() {
        let issues = vec![
            issue("A-1", None, "epic"),
            issue("A-2", Some("A-1"), "login bug"),
            issue("A-3", None, "unrelated"),
        ];
        let rows = flatten_tree(&issues, "login", &[]);
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].matched);
        assert!(rows[1].matched);
    }
}
