//! # Live document tree
//!
//! An arena-allocated mutable HTML tree. Nodes are owned by the document and
//! addressed through [`NodeId`] handles; detaching a node unlinks it from the
//! tree but keeps it allocated, so a handle held by an undo command can
//! reinsert the same subtree later. Detached nodes are reclaimed when the
//! document is dropped.
//!
//! Every mutation that changes the *attached* tree (inserts, removals,
//! attribute and text edits reachable from the root) bumps a revision
//! counter. Consumers that reconcile derived state can compare revisions to
//! coalesce an entire batch of mutations into a single pass.

use serde::{Deserialize, Serialize};

use crate::error::{DomError, DomResult};
use crate::node::{ElementData, NodeId, NodeKind};

/// Insertion point relative to an anchor node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    /// Immediately before the anchor, under the anchor's parent
    Before,
    /// Immediately after the anchor, under the anchor's parent
    After,
    /// As the anchor's first child
    Prepend,
    /// As the anchor's last child
    Append,
}

impl Position {
    /// Positions that address the anchor's parent rather than the anchor
    pub fn is_sibling(self) -> bool {
        matches!(self, Position::Before | Position::After)
    }

    /// Positions where repeated insertion reverses arrival order
    pub fn is_leading(self) -> bool {
        matches!(self, Position::Before | Position::Prepend)
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    revision: u64,
}

const NO_CHILDREN: &[NodeId] = &[];

impl Document {
    /// Empty document: `<html><head></head><body></body></html>`
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link(doc.root, 0, head);
        doc.link(doc.root, 1, body);
        doc.head = head;
        doc.body = body;
        doc.revision = 0;
        doc
    }

    /// A lone `<html>` root; the parser fills in head/body afterwards
    pub(crate) fn bare() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(ElementData::new("html")),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            revision: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Counter bumped by every mutation of the attached tree
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    pub(crate) fn set_head(&mut self, id: NodeId) {
        self.head = id;
    }

    pub(crate) fn set_body(&mut self, id: NodeId) {
        self.body = id;
    }

    pub(crate) fn reset_revision(&mut self) {
        self.revision = 0;
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// New detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData::new(tag)))
    }

    /// New detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => Some(data.tag()),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => data.attribute(name),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let attached = self.is_attached(id);
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(data)) => {
                data.set_attribute(name, value);
                if attached {
                    self.revision += 1;
                }
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement),
            None => Err(DomError::DeadNode),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let attached = self.is_attached(id);
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(data)) => {
                if data.remove_attribute(name) && attached {
                    self.revision += 1;
                }
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement),
            None => Err(DomError::DeadNode),
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let attached = self.is_attached(id);
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(content)) => {
                *content = text.to_string();
                if attached {
                    self.revision += 1;
                }
                Ok(())
            }
            Some(_) => Err(DomError::NotText),
            None => Err(DomError::DeadNode),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(NO_CHILDREN)
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    /// Index among all of the parent's children
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Index among the parent's element children
    pub fn element_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent).iter().position(|&c| c == id)
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.element_children(parent);
        let at = siblings.iter().position(|&c| c == id)?;
        siblings.get(at + 1).copied()
    }

    pub fn prev_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.element_children(parent);
        let at = siblings.iter().position(|&c| c == id)?;
        at.checked_sub(1).and_then(|i| siblings.get(i).copied())
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).first().copied()
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.element_children(id).last().copied()
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut cur = id;
        loop {
            if cur == self.root {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is `id` itself or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = id;
        loop {
            if cur == ancestor {
                return true;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Preorder traversal of the subtree rooted at `id`, including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if !self.contains(cur) {
                continue;
            }
            out.push(cur);
            for &child in self.children(cur).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// First attached element carrying `name="value"`, in document order
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.attribute(id, name) == Some(value))
    }

    fn link(&mut self, parent: NodeId, index: usize, id: NodeId) {
        let at = index.min(self.children(parent).len());
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(at, id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = Some(parent);
        }
    }

    /// Insert `id` as a child of `parent` at `index` (clamped), moving it
    /// out of any previous parent first
    pub fn insert(&mut self, parent: NodeId, index: usize, id: NodeId) -> DomResult<()> {
        if !self.contains(id) || !self.contains(parent) {
            return Err(DomError::DeadNode);
        }
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement);
        }
        if id == self.root || self.is_inclusive_ancestor(id, parent) {
            return Err(DomError::Cycle);
        }
        self.detach(id);
        self.link(parent, index, id);
        if self.is_attached(parent) {
            self.revision += 1;
        }
        Ok(())
    }

    /// Insert `id` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, id: NodeId) -> DomResult<()> {
        let at = self.children(parent).len();
        self.insert(parent, at, id)
    }

    /// Insert `id` at `position` relative to `anchor`
    pub fn insert_adjacent(&mut self, anchor: NodeId, position: Position, id: NodeId) -> DomResult<()> {
        match position {
            Position::Prepend => self.insert(anchor, 0, id),
            Position::Append => self.append(anchor, id),
            Position::Before | Position::After => {
                let parent = self.parent(anchor).ok_or(DomError::Detached)?;
                if id == self.root || self.is_inclusive_ancestor(id, parent) {
                    return Err(DomError::Cycle);
                }
                // detach first so a same-parent move computes the final index
                self.detach(id);
                let at = self.child_index(anchor).ok_or(DomError::Detached)?;
                let at = if position == Position::Before { at } else { at + 1 };
                self.insert(parent, at, id)
            }
        }
    }

    /// Unlink `id` from its parent; the subtree stays allocated. No-op for
    /// detached or unknown handles.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let attached = self.is_attached(id);
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        if attached {
            self.revision += 1;
        }
    }

    /// Deep copy of the subtree rooted at `id`; the copy is detached and all
    /// of its nodes have fresh handles
    pub fn clone_subtree(&mut self, id: NodeId) -> DomResult<NodeId> {
        let kind = self.kind(id).ok_or(DomError::DeadNode)?.clone();
        let copy = self.alloc(kind);
        let children: Vec<NodeId> = self.children(id).to_vec();
        for (i, child) in children.into_iter().enumerate() {
            let child_copy = self.clone_subtree(child)?;
            self.link(copy, i, child_copy);
        }
        Ok(copy)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_has_skeleton() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.root()), Some("html"));
        assert_eq!(doc.tag(doc.head()), Some("head"));
        assert_eq!(doc.tag(doc.body()), Some("body"));
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn insert_adjacent_positions() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("p");
        let b = doc.create_element("p");
        doc.append(body, a).unwrap();
        doc.append(body, b).unwrap();

        let before = doc.create_element("i");
        let after = doc.create_element("b");
        let first = doc.create_element("em");
        let last = doc.create_element("u");
        doc.insert_adjacent(a, Position::Before, before).unwrap();
        doc.insert_adjacent(a, Position::After, after).unwrap();
        doc.insert_adjacent(body, Position::Prepend, first).unwrap();
        doc.insert_adjacent(body, Position::Append, last).unwrap();

        assert_eq!(doc.children(body), &[first, before, a, after, b, last]);
    }

    #[test]
    fn revision_tracks_attached_mutations_only() {
        let mut doc = Document::new();
        let start = doc.revision();

        // detached work is invisible
        let p = doc.create_element("p");
        doc.set_attribute(p, "class", "x").unwrap();
        assert_eq!(doc.revision(), start);

        doc.append(doc.body(), p).unwrap();
        assert_eq!(doc.revision(), start + 1);

        doc.set_attribute(p, "class", "y").unwrap();
        assert_eq!(doc.revision(), start + 2);

        doc.detach(p);
        assert_eq!(doc.revision(), start + 3);

        // further edits to the detached subtree are invisible again
        doc.set_attribute(p, "class", "z").unwrap();
        assert_eq!(doc.revision(), start + 3);
    }

    #[test]
    fn detach_keeps_subtree_alive() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let t = doc.create_text("Hi");
        doc.append(p, t).unwrap();
        doc.append(doc.body(), p).unwrap();

        doc.detach(p);
        assert!(!doc.is_attached(p));
        assert_eq!(doc.children(p), &[t]);
        assert_eq!(doc.text(t), Some("Hi"));

        doc.append(doc.body(), p).unwrap();
        assert!(doc.is_attached(t));
    }

    #[test]
    fn insert_rejects_cycles() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append(doc.body(), outer).unwrap();
        doc.append(outer, inner).unwrap();

        assert_eq!(doc.append(inner, outer), Err(DomError::Cycle));
        assert_eq!(doc.append(outer, outer), Err(DomError::Cycle));
        let root = doc.root();
        assert_eq!(doc.append(inner, root), Err(DomError::Cycle));
    }

    #[test]
    fn clone_subtree_is_deep_with_fresh_handles() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "class", "x").unwrap();
        let t = doc.create_text("Hi");
        doc.append(p, t).unwrap();
        doc.append(doc.body(), p).unwrap();

        let copy = doc.clone_subtree(p).unwrap();
        assert_ne!(copy, p);
        assert!(!doc.is_attached(copy));
        assert_eq!(doc.attribute(copy, "class"), Some("x"));
        let copy_text = doc.children(copy)[0];
        assert_ne!(copy_text, t);
        assert_eq!(doc.text(copy_text), Some("Hi"));

        // the copy is independent of the original
        doc.set_text(copy_text, "Bye").unwrap();
        assert_eq!(doc.text(t), Some("Hi"));
    }

    #[test]
    fn element_relations() {
        let mut doc = Document::new();
        let body = doc.body();
        let a = doc.create_element("p");
        let gap = doc.create_text("\n");
        let b = doc.create_element("p");
        doc.append(body, a).unwrap();
        doc.append(body, gap).unwrap();
        doc.append(body, b).unwrap();

        assert_eq!(doc.next_element_sibling(a), Some(b));
        assert_eq!(doc.prev_element_sibling(b), Some(a));
        assert_eq!(doc.first_element_child(body), Some(a));
        assert_eq!(doc.last_element_child(body), Some(b));
        assert_eq!(doc.element_index(b), Some(1));
        assert_eq!(doc.child_index(b), Some(2));
    }
}
