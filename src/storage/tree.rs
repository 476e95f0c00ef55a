//! PathTree - the primary dotted-key namespace
//!
//! Every node lives in an arena slot and is addressed by a [`NodeId`] that
//! carries the slot's generation, so a locator held elsewhere (the time index)
//! can never resolve to a node that has since been freed and reused.
//!
//! Ownership runs strictly downward through `children`; `parent` is a plain
//! locator used only when pruning upward.
//!
//! ```text
//! dataroot
//! └── cart
//!     └── veg
//!         └── basket1            <- key node for "cart.veg.basket1"
//!             ├── 1700000000     <- sample node, holds a Value
//!             └── 1700000005
//! ```

use serde::Serialize;
use std::collections::HashMap;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Timestamp, Value};

const ROOT_KEY: &str = "dataroot";

/// Generation-checked locator of a PathTree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Node {
    key: String,
    parent: Option<NodeId>,
    children: HashMap<String, NodeId>,
    value: Option<Value>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed hierarchical value tree
#[derive(Debug)]
pub struct PathTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            live: 0,
        };
        tree.root = tree.alloc(ROOT_KEY.to_string(), None, None);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when only the root remains
    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn alloc(&mut self, key: String, parent: Option<NodeId>, value: Option<Value>) -> NodeId {
        let node = Node {
            key,
            parent,
            children: HashMap::new(),
            value,
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Free a node and its whole subtree
    fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
                self.live -= 1;
                pending.extend(node.children.into_values());
            }
        }
    }

    /// Whether `id` still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn key(&self, id: NodeId) -> Option<&str> {
        self.node(id).map(|n| n.key.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn value(&self, id: NodeId) -> Option<&Value> {
        self.node(id).and_then(|n| n.value.as_ref())
    }

    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id).and_then(|n| n.children.get(key).copied())
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).map_or(0, |n| n.children.len())
    }

    /// Children of a node as (name, id), in no particular order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.node(id)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Whether any child of `id` is a sample node
    pub fn has_samples(&self, id: NodeId) -> bool {
        self.children(id).any(|(_, child)| self.value(child).is_some())
    }

    /// Sample children of a key node as (timestamp, value), in no particular order
    pub fn samples(&self, id: NodeId) -> impl Iterator<Item = (Timestamp, &Value)> + '_ {
        self.children(id).filter_map(move |(name, child)| {
            let value = self.value(child)?;
            let timestamp = name.parse::<Timestamp>().ok()?;
            Some((timestamp, value))
        })
    }

    /// Walk `segments` from the root, creating missing nodes.
    ///
    /// Idempotent. Fails without creating anything if the walk would pass
    /// through a sample node.
    pub fn ensure_path(&mut self, segments: &[&str]) -> StorageResult<NodeId> {
        let mut current = self.root;
        let mut depth = 0;

        // Existing prefix: only checks, no mutation
        while let Some(segment) = segments.get(depth) {
            let Some(child) = self.child(current, segment) else {
                break;
            };
            if self.value(child).is_some() {
                return Err(StorageError::PathConflict {
                    key: segments.join("."),
                    segment: segment.to_string(),
                    occupied_by: "sample",
                });
            }
            current = child;
            depth += 1;
        }

        for segment in &segments[depth..] {
            let child = self.alloc(segment.to_string(), Some(current), None);
            if let Some(node) = self.node_mut(current) {
                node.children.insert(segment.to_string(), child);
            }
            current = child;
        }

        Ok(current)
    }

    /// Read-only walk from the root; `None` as soon as a segment is missing
    pub fn lookup(&self, segments: &[&str]) -> Option<NodeId> {
        segments
            .iter()
            .try_fold(self.root, |current, segment| self.child(current, segment))
    }

    /// Create or merge the sample `timestamp` under `key_node`.
    ///
    /// `key` is only used for error context.
    pub fn upsert_sample(
        &mut self,
        key_node: NodeId,
        key: &str,
        timestamp: Timestamp,
        value: Value,
    ) -> StorageResult<NodeId> {
        let label = timestamp.to_string();

        if let Some(existing) = self.child(key_node, &label) {
            let node = self
                .node_mut(existing)
                .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
            let Some(stored) = node.value.as_mut() else {
                return Err(StorageError::PathConflict {
                    key: key.to_string(),
                    segment: label,
                    occupied_by: "key segment",
                });
            };
            stored
                .merge(value)
                .map_err(|mismatch| StorageError::TypeConflict {
                    key: key.to_string(),
                    timestamp,
                    existing: mismatch.existing,
                    incoming: mismatch.incoming,
                })?;
            return Ok(existing);
        }

        let sample = self.alloc(label.clone(), Some(key_node), Some(value));
        if let Some(node) = self.node_mut(key_node) {
            node.children.insert(label, sample);
        }
        Ok(sample)
    }

    /// Remove the named child of `parent` along with its subtree.
    ///
    /// Returns false if there was no such child.
    pub fn delete_child(&mut self, parent: NodeId, key: &str) -> bool {
        let removed = self
            .node_mut(parent)
            .and_then(|node| node.children.remove(key));
        match removed {
            Some(child) => {
                self.release(child);
                true
            }
            None => false,
        }
    }

    /// Remove `start` and its ancestors while they have no children and no
    /// value. The root is never removed. Returns the number of nodes removed.
    pub fn prune_empty_ancestors(&mut self, start: NodeId) -> usize {
        let mut current = start;
        let mut removed = 0;

        while current != self.root {
            let Some(node) = self.node(current) else {
                break;
            };
            if !node.children.is_empty() || node.value.is_some() {
                break;
            }
            let Some(parent) = node.parent else {
                break;
            };
            let key = node.key.clone();
            self.delete_child(parent, &key);
            removed += 1;
            current = parent;
        }

        removed
    }

    /// Serializable copy of the whole tree, children sorted by name
    pub fn snapshot(&self) -> TreeSnapshot {
        self.snapshot_from(self.root)
    }

    fn snapshot_from(&self, id: NodeId) -> TreeSnapshot {
        let Some(node) = self.node(id) else {
            return TreeSnapshot::default();
        };
        let mut children: Vec<(&String, &NodeId)> = node.children.iter().collect();
        children.sort_by(|a, b| a.0.cmp(b.0));

        TreeSnapshot {
            name: node.key.clone(),
            value: node.value.clone(),
            children: children
                .into_iter()
                .map(|(_, child)| self.snapshot_from(*child))
                .collect(),
        }
    }
}

/// JSON view of a PathTree node, used by the `/TREE` diagnostic read
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TreeSnapshot {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeSnapshot>,
}
