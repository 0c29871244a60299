//! Active path resolution and branch point extraction
//!
//! The active path is the single linear conversation shown by default:
//! starting from the most recently active root, always descend into the
//! child whose subtree has the latest activity. Every fork along that path
//! yields a [`BranchPoint`] carrying the alternate continuations, each
//! flattened to its own linear path and ordered newest-first, so a viewer
//! can swap paths without re-walking the tree per click.
//!
//! Ties on the deepest-descendant timestamp go to the first node in input
//! order, both among roots and among siblings. That keeps resolution
//! deterministic but is implementation-defined, not a guarantee callers
//! should lean on.

use crate::tree::Forest;
use crate::types::Message;
use serde::{Deserialize, Serialize};

/// A fork on the active path with its alternate continuations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPoint {
    /// Position of the fork node within the active path, not the tree
    pub message_index: usize,
    /// Uuid of the forking message
    pub fork_message_uuid: String,
    /// Every child subtree of the fork, flattened, newest-first.
    /// `paths[0]` is always the continuation already on the active path.
    pub paths: Vec<Vec<Message>>,
}

/// Among candidate node indices, pick the one with the greatest
/// deepest-descendant timestamp. Strictly-greater comparison, so the first
/// candidate wins ties.
fn most_recent(forest: &Forest, candidates: &[usize]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &idx in candidates {
        match best {
            None => best = Some(idx),
            Some(b) => {
                if forest.latest_timestamp(idx) > forest.latest_timestamp(b) {
                    best = Some(idx);
                }
            }
        }
    }
    best
}

/// Flatten one subtree into a linear path by always descending into the
/// most recently active child.
fn flatten_from(forest: &Forest, start: usize) -> Vec<Message> {
    let mut path = Vec::new();
    let mut current = start;
    loop {
        path.push(forest.message(current).clone());
        match most_recent(forest, forest.children(current)) {
            Some(next) => current = next,
            None => break,
        }
    }
    path
}

/// Resolve the canonical active path through a forest.
///
/// Selects the root with the latest subtree activity, then descends by the
/// same rule until a leaf. For a forest with no forks this reproduces the
/// flat chronological ordering.
pub fn resolve_active_path(forest: &Forest) -> Vec<Message> {
    match most_recent(forest, forest.roots()) {
        Some(root) => flatten_from(forest, root),
        None => Vec::new(),
    }
}

/// Extract every branch point along the active path.
///
/// At each position whose node has more than one child, the children are
/// sorted newest-first by deepest-descendant timestamp (stable, so input
/// order breaks ties) and each is flattened into its own path. The first
/// path is always the continuation already present in `active_path` from
/// that position forward.
///
/// Each flattening is independent, so worst case is O(forest size x
/// fan-out); branch points are rare relative to message count, so this
/// stays cheap in practice.
pub fn branch_points(forest: &Forest, active_path: &[Message]) -> Vec<BranchPoint> {
    let mut points = Vec::new();

    for (position, message) in active_path.iter().enumerate() {
        let node = match forest.node_by_uuid(&message.uuid) {
            Some(n) => n,
            None => continue,
        };
        let children = forest.children(node);
        if children.len() < 2 {
            continue;
        }

        let mut ordered: Vec<usize> = children.to_vec();
        ordered.sort_by(|&a, &b| forest.latest_timestamp(b).cmp(forest.latest_timestamp(a)));

        let paths: Vec<Vec<Message>> = ordered
            .iter()
            .map(|&child| flatten_from(forest, child))
            .collect();

        points.push(BranchPoint {
            message_index: position,
            fork_message_uuid: message.uuid.clone(),
            paths,
        });
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn msg(uuid: &str, parent: Option<&str>, ts: &str) -> Message {
        let mut m = Message::new(uuid, parent.map(String::from), Role::User);
        m.timestamp = ts.to_string();
        m
    }

    fn uuids(path: &[Message]) -> Vec<&str> {
        path.iter().map(|m| m.uuid.as_str()).collect()
    }

    #[test]
    fn test_linear_session() {
        // Scenario: one root, one child, no forks
        let forest = Forest::build(vec![
            msg("u1", None, "2026-01-01T00:00:00Z"),
            msg("a1", Some("u1"), "2026-01-01T00:00:01Z"),
        ]);

        let path = resolve_active_path(&forest);
        assert_eq!(uuids(&path), vec!["u1", "a1"]);
        assert!(branch_points(&forest, &path).is_empty());
    }

    #[test]
    fn test_fork_follows_deepest_descendant() {
        // u1 -> a1, then a1 forks: u2's subtree tops out at T2.5,
        // u3's at T4, so the active path follows u3
        let forest = Forest::build(vec![
            msg("u1", None, "T0"),
            msg("a1", Some("u1"), "T1"),
            msg("u2", Some("a1"), "T2"),
            msg("u3", Some("a1"), "T3"),
            msg("u2c", Some("u2"), "T2.5"),
            msg("u3c", Some("u3"), "T4"),
        ]);

        let path = resolve_active_path(&forest);
        assert_eq!(uuids(&path), vec!["u1", "a1", "u3", "u3c"]);

        let points = branch_points(&forest, &path);
        assert_eq!(points.len(), 1);

        let point = &points[0];
        assert_eq!(point.message_index, 1);
        assert_eq!(point.fork_message_uuid, "a1");
        assert_eq!(point.paths.len(), 2);
        assert_eq!(uuids(&point.paths[0]), vec!["u3", "u3c"]);
        assert_eq!(uuids(&point.paths[1]), vec!["u2", "u2c"]);
    }

    #[test]
    fn test_paths_zero_equals_active_suffix() {
        let forest = Forest::build(vec![
            msg("r", None, "T0"),
            msg("b1", Some("r"), "T1"),
            msg("b2", Some("r"), "T2"),
            msg("b2c", Some("b2"), "T3"),
        ]);

        let path = resolve_active_path(&forest);
        let points = branch_points(&forest, &path);
        assert_eq!(points.len(), 1);

        let fork_index = points[0].message_index;
        let suffix: Vec<&str> = uuids(&path)[fork_index + 1..].to_vec();
        assert_eq!(uuids(&points[0].paths[0]), suffix);
    }

    #[test]
    fn test_newest_first_ordering_among_paths() {
        let forest = Forest::build(vec![
            msg("r", None, "T0"),
            msg("old", Some("r"), "T1"),
            msg("mid", Some("r"), "T2"),
            msg("new", Some("r"), "T3"),
        ]);

        let path = resolve_active_path(&forest);
        let points = branch_points(&forest, &path);
        let order: Vec<&str> = points[0]
            .paths
            .iter()
            .map(|p| p[0].uuid.as_str())
            .collect();
        assert_eq!(order, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_root_selection_prefers_latest_subtree() {
        let forest = Forest::build(vec![
            msg("stale", None, "T9"),
            msg("r2", None, "T0"),
            msg("r2c", Some("r2"), "T10"),
        ]);

        let path = resolve_active_path(&forest);
        assert_eq!(uuids(&path), vec!["r2", "r2c"]);
    }

    #[test]
    fn test_ties_go_to_first_in_input_order() {
        let forest = Forest::build(vec![
            msg("r", None, "T0"),
            msg("first", Some("r"), "T1"),
            msg("second", Some("r"), "T1"),
        ]);

        let path = resolve_active_path(&forest);
        assert_eq!(uuids(&path), vec!["r", "first"]);

        // Stable descending sort keeps input order among equals too
        let points = branch_points(&forest, &path);
        assert_eq!(uuids(&points[0].paths[0]), vec!["first"]);
        assert_eq!(uuids(&points[0].paths[1]), vec!["second"]);
    }

    #[test]
    fn test_no_fork_matches_chronological_order() {
        // Backward-compatibility guarantee with the flat view
        let mut messages = vec![
            msg("u1", None, "2026-01-01T00:00:00Z"),
            msg("a1", Some("u1"), "2026-01-01T00:00:10Z"),
            msg("u2", Some("a1"), "2026-01-01T00:00:20Z"),
            msg("a2", Some("u2"), "2026-01-01T00:00:30Z"),
        ];
        let forest = Forest::build(messages.clone());
        let path = resolve_active_path(&forest);

        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        assert_eq!(uuids(&path), uuids(&messages));
    }

    #[test]
    fn test_empty_forest() {
        let forest = Forest::build(Vec::new());
        let path = resolve_active_path(&forest);
        assert!(path.is_empty());
        assert!(branch_points(&forest, &path).is_empty());
    }

    #[test]
    fn test_empty_timestamp_is_valid_unknown() {
        // Empty string sorts before any real ISO timestamp
        let forest = Forest::build(vec![
            msg("r", None, ""),
            msg("known", Some("r"), "2026-01-01T00:00:00Z"),
            msg("unknown", Some("r"), ""),
        ]);

        let path = resolve_active_path(&forest);
        assert_eq!(uuids(&path), vec!["r", "known"]);
    }
}
