//! Conversation forest construction
//!
//! Turns a flat set of decoded [`Message`] values into a forest of message
//! trees using their `uuid`/`parent_uuid` links. Retries and edited turns
//! create siblings that never remerge, so the data is genuinely a forest,
//! not a list.
//!
//! The forest is an arena: one owned vector of nodes with child links
//! expressed as indices. It is built once per session load and never
//! mutated afterwards, so there is no need for shared or weak ownership.
//!
//! Each node carries its memoized deepest-descendant timestamp, computed
//! bottom-up in a single post-order traversal at build time. Sibling
//! comparison during path resolution never recomputes it.

use crate::types::Message;
use std::collections::HashMap;

/// One node in the forest arena.
#[derive(Debug, Clone)]
struct Node {
    message: Message,
    children: Vec<usize>,
    /// Deepest-descendant timestamp: the maximum timestamp anywhere in
    /// this node's subtree (lexical ISO-8601 comparison).
    latest: String,
}

/// A forest of message trees for one session.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    by_uuid: HashMap<String, usize>,
    duplicate_uuids: usize,
}

impl Forest {
    /// Build a forest from decoded messages.
    ///
    /// Two passes: index by uuid, then link children to parents. A message
    /// whose parent uuid refers to no known message becomes a root, never
    /// an error. Duplicate uuids collapse last-wins: the earlier message is
    /// discarded entirely and counted in [`Forest::duplicate_uuid_count`].
    /// Child ordering within a node is input order.
    pub fn build(messages: Vec<Message>) -> Forest {
        // Index pass: last record with a given uuid wins. An earlier
        // message sharing a uuid is discarded entirely.
        let keep = {
            let mut winner: HashMap<&str, usize> = HashMap::new();
            for (i, msg) in messages.iter().enumerate() {
                winner.insert(msg.uuid.as_str(), i);
            }
            messages
                .iter()
                .enumerate()
                .map(|(i, msg)| winner.get(msg.uuid.as_str()) == Some(&i))
                .collect::<Vec<bool>>()
        };
        let kept = keep.iter().filter(|&&k| k).count();
        let duplicate_uuids = messages.len() - kept;
        if duplicate_uuids > 0 {
            tracing::warn!(
                count = duplicate_uuids,
                "duplicate message uuids collapsed last-wins"
            );
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(kept);
        let mut by_uuid: HashMap<String, usize> = HashMap::with_capacity(kept);
        for (msg, &keep_msg) in messages.into_iter().zip(keep.iter()) {
            if !keep_msg {
                continue;
            }
            by_uuid.insert(msg.uuid.clone(), nodes.len());
            let latest = msg.timestamp.clone();
            nodes.push(Node {
                message: msg,
                children: Vec::new(),
                latest,
            });
        }

        // Link pass: attach each node to its parent when the parent exists,
        // otherwise the node is a root
        let mut roots = Vec::new();
        for idx in 0..nodes.len() {
            let parent_idx = nodes[idx]
                .message
                .parent_uuid
                .as_deref()
                .and_then(|p| by_uuid.get(p).copied())
                // A self-referential parent would form a cycle
                .filter(|&p| p != idx);
            match parent_idx {
                Some(p) => nodes[p].children.push(idx),
                None => roots.push(idx),
            }
        }

        let mut forest = Forest {
            nodes,
            roots,
            by_uuid,
            duplicate_uuids,
        };
        forest.compute_latest();
        forest
    }

    /// Compute every node's deepest-descendant timestamp bottom-up.
    ///
    /// Iterative post-order traversal from each root; recursion would
    /// overflow on pathological chain depth.
    fn compute_latest(&mut self) {
        for root in self.roots.clone() {
            let mut stack = vec![(root, false)];
            while let Some((idx, children_done)) = stack.pop() {
                if children_done {
                    let mut latest = self.nodes[idx].message.timestamp.clone();
                    for &child in &self.nodes[idx].children {
                        if self.nodes[child].latest > latest {
                            latest = self.nodes[child].latest.clone();
                        }
                    }
                    self.nodes[idx].latest = latest;
                } else {
                    stack.push((idx, true));
                    for &child in &self.nodes[idx].children {
                        stack.push((child, false));
                    }
                }
            }
        }
    }

    /// Indices of the forest roots, in input order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// The message at a node index.
    pub fn message(&self, idx: usize) -> &Message {
        &self.nodes[idx].message
    }

    /// Child indices of a node, in input order.
    pub fn children(&self, idx: usize) -> &[usize] {
        &self.nodes[idx].children
    }

    /// Deepest-descendant timestamp of a node's subtree.
    pub fn latest_timestamp(&self, idx: usize) -> &str {
        &self.nodes[idx].latest
    }

    /// Node index for a message uuid, if present.
    pub fn node_by_uuid(&self, uuid: &str) -> Option<usize> {
        self.by_uuid.get(uuid).copied()
    }

    /// Number of nodes in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// How many input messages were discarded by duplicate-uuid collapse.
    pub fn duplicate_uuid_count(&self) -> usize {
        self.duplicate_uuids
    }
}
