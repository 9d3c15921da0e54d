//! # Identity mapping
//!
//! Reconciles a live document tree against the previous key↔node mapping
//! after a batch of mutations. Keys are stable for as long as their node
//! stays in the tree; a node that leaves and comes back (or an equivalent
//! node re-created in the same place) gets a fresh key, never an old one.
//!
//! ## Design
//!
//! - Keys are path-seeded sequential ids (`"{seed}-{n}"`), so keys from
//!   different frames never collide and a retired key is never reissued.
//! - The mapper holds plain node handles, not owning references: it is the
//!   document arena that keeps nodes alive, and reconciliation drops every
//!   entry whose node is no longer reachable from the root.
//! - Reconciliation runs once per coalesced batch of mutations (the caller
//!   compares document revisions), and is idempotent: a second pass over an
//!   unchanged tree returns an identical snapshot and leaves the mapping
//!   untouched.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use webfoundry_dom::{serialize_document, Document, NodeId};

/// Attribute a rendering host may stamp on tracked elements. Paste strips it
/// from clone roots so the next reconciliation issues the clone a fresh key
/// instead of adopting the source's.
pub const TRACKING_ATTRIBUTE: &str = "data-wf-key";

/// Opaque identifier for an element, stable across mutations while the
/// element remains in its frame's tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableKey(String);

impl StableKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sequential key generator seeded from the frame path (CRC32)
#[derive(Debug, Clone)]
struct KeyAllocator {
    seed: String,
    count: u64,
}

impl KeyAllocator {
    fn new(path: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(format!("frame://{}", path).as_bytes());
        Self {
            seed: format!("{:x}", hasher.finalize()),
            count: 0,
        }
    }

    fn next_key(&mut self) -> StableKey {
        self.count += 1;
        StableKey(format!("{}-{}", self.seed, self.count))
    }
}

/// Result of one reconciliation pass: the serialized tree, tagged with the
/// document revision it reflects. Also what the persistence pipeline writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub markup: String,
    pub revision: u64,
}

/// Bidirectional key↔node association for one frame
#[derive(Debug)]
pub struct NodeMapper {
    alloc: KeyAllocator,
    key_to_node: HashMap<StableKey, NodeId>,
    node_to_key: HashMap<NodeId, StableKey>,
}

impl NodeMapper {
    pub fn new(path: &str) -> Self {
        Self {
            alloc: KeyAllocator::new(path),
            key_to_node: HashMap::new(),
            node_to_key: HashMap::new(),
        }
    }

    /// Bring the mapping up to date with the tree: new elements get fresh
    /// keys, surviving elements keep theirs, unreachable entries are dropped
    pub fn reconcile(&mut self, doc: &Document) -> Snapshot {
        let mut seen: HashSet<NodeId> = HashSet::new();
        for id in doc.descendants(doc.root()) {
            if !doc.is_element(id) {
                continue;
            }
            if !self.node_to_key.contains_key(&id) {
                let key = self.alloc.next_key();
                self.key_to_node.insert(key.clone(), id);
                self.node_to_key.insert(id, key);
            }
            seen.insert(id);
        }
        let dead: Vec<NodeId> = self
            .node_to_key
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        for id in dead {
            if let Some(key) = self.node_to_key.remove(&id) {
                self.key_to_node.remove(&key);
            }
        }
        Snapshot {
            markup: serialize_document(doc),
            revision: doc.revision(),
        }
    }

    /// Resolve a key to its node, if the key is still mapped
    pub fn node(&self, key: &StableKey) -> Option<NodeId> {
        self.key_to_node.get(key).copied()
    }

    /// Key of a node, if it is currently mapped
    pub fn key(&self, id: NodeId) -> Option<&StableKey> {
        self.node_to_key.get(&id)
    }

    pub fn len(&self) -> usize {
        self.key_to_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_to_node.is_empty()
    }

    /// Forget every association while keeping the allocator position, so a
    /// replaced document gets all-new keys
    pub(crate) fn clear(&mut self) {
        self.key_to_node.clear();
        self.node_to_key.clear();
    }
}
