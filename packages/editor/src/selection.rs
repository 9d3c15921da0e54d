//! # Selection manager
//!
//! Selections are sets of stable keys, never live node references. Each
//! change filters candidates down to nodes that are inside the editable
//! subtree and currently mapped, so a stale key is silently dropped rather
//! than carried forward. Emptying a selection saves the outgoing set as the
//! cursor's "last" selection, which toggle can restore.

use serde::{Deserialize, Serialize};
use webfoundry_dom::NodeId;

use crate::commands::EditContext;
use crate::events::EditorEvent;
use crate::frame::CursorId;
use crate::mapper::StableKey;

/// Tree relation for relative navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Parent,
    NextSibling,
    PrevSibling,
    FirstChild,
    LastChild,
}

impl EditContext<'_> {
    /// Replace the cursor's selection with the resolvable candidates.
    ///
    /// The notification is emitted unconditionally, even when the resulting
    /// set equals the previous one.
    pub(crate) fn change_selection(&mut self, cursor: &CursorId, candidates: Vec<NodeId>) {
        let body = self.doc.body();
        let mut keys: Vec<StableKey> = Vec::new();
        for id in candidates {
            if !self.doc.is_inclusive_ancestor(body, id) {
                continue;
            }
            let Some(key) = self.mapper.key(id) else {
                continue;
            };
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        if keys.is_empty() {
            let previous = self.cursors.get(cursor).cloned().unwrap_or_default();
            self.last_cursors.insert(cursor.clone(), previous);
        }
        self.cursors.insert(cursor.clone(), keys.clone());
        let _ = self.events.send(EditorEvent::SelectionChanged {
            path: self.path.to_string(),
            cursor: cursor.clone(),
            keys,
        });
    }

    /// Clear a non-empty selection (saving it as "last"), or restore the
    /// last one if its nodes are still resolvable
    pub(crate) fn toggle_selection(&mut self, cursor: &CursorId) {
        if !self.selection(cursor).is_empty() {
            self.change_selection(cursor, Vec::new());
            return;
        }
        let last = self.last_cursors.get(cursor).cloned().unwrap_or_default();
        if last.is_empty() {
            return;
        }
        let nodes: Vec<NodeId> = last.iter().filter_map(|key| self.resolve(key)).collect();
        self.change_selection(cursor, nodes);
    }

    /// Walk the selection `steps` times along `relation`. Valid only for a
    /// single-key selection; a step whose target does not exist or falls
    /// outside the editable subtree leaves the selection where it is, so
    /// asking for more steps than are reachable is not an error.
    pub(crate) fn select_relative(&mut self, cursor: &CursorId, relation: Relation, steps: usize) {
        if self.selection(cursor).len() != 1 {
            return;
        }
        let body = self.doc.body();
        for _ in 0..steps {
            let selection = self.selection(cursor);
            if selection.len() != 1 {
                break;
            }
            let Some(node) = self.resolve(&selection[0]) else {
                break;
            };
            let target = match relation {
                Relation::Parent => self.doc.parent(node),
                Relation::NextSibling => self.doc.next_element_sibling(node),
                Relation::PrevSibling => self.doc.prev_element_sibling(node),
                Relation::FirstChild => self.doc.first_element_child(node),
                Relation::LastChild => self.doc.last_element_child(node),
            };
            let Some(target) = target else {
                continue;
            };
            if self.doc.is_inclusive_ancestor(body, target) {
                self.change_selection(cursor, vec![target]);
            }
        }
    }
}
