//! # Structural editor
//!
//! The reversible operations: create, delete, copy, paste.
//!
//! Each operation (1) computes its targets synchronously from the cursor's
//! current selection, (2) performs or records the live mutation,
//! (3) reconciles so the mutation is fully visible to identity mapping,
//! (4) recomputes the resulting selection, and (5) lands in history as one
//! command whose `apply`/`unapply` replay the whole forward/backward effect.
//!
//! ## Command semantics
//!
//! - Commands hold stable keys for anchors that live in the tree, and node
//!   handles only for subtrees they themselves own (created elements,
//!   removed nodes, pasted clones). Both are resolved at (un)apply time; an
//!   anchor removed by an interleaved operation downgrades the step to a
//!   no-op rather than an error.
//! - Re-materialized nodes get fresh stable keys on the reconciliation that
//!   follows, never their old ones.
//! - Deleting never touches the document root, body or head, even when
//!   selected, and implies a copy of the selection first.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use webfoundry_dom::{outer_html, parse_fragments, Document, NodeId, Position};

use crate::clipboard::SharedClipboard;
use crate::errors::EditorResult;
use crate::events::EditorEvent;
use crate::frame::CursorId;
use crate::history::{Command, History};
use crate::mapper::{NodeMapper, Snapshot, StableKey, TRACKING_ATTRIBUTE};

/// Everything a structural operation may touch: the frame's document and
/// mapping plus per-cursor state, and the workspace services it reports to
pub(crate) struct EditContext<'a> {
    pub(crate) path: &'a str,
    pub(crate) doc: &'a mut Document,
    pub(crate) mapper: &'a mut NodeMapper,
    pub(crate) snapshot: &'a mut Option<Snapshot>,
    pub(crate) reconciled_revision: &'a mut Option<u64>,
    pub(crate) cursors: &'a mut HashMap<CursorId, Vec<StableKey>>,
    pub(crate) last_cursors: &'a mut HashMap<CursorId, Vec<StableKey>>,
    pub(crate) clipboards: &'a mut HashMap<CursorId, String>,
    pub(crate) events: &'a broadcast::Sender<EditorEvent>,
    pub(crate) shared: &'a SharedClipboard,
}

impl EditContext<'_> {
    /// Reconcile if the document moved past the last reconciled revision.
    /// One call covers an entire operation's worth of mutations.
    pub(crate) fn sync(&mut self) {
        if *self.reconciled_revision != Some(self.doc.revision()) || self.snapshot.is_none() {
            let snapshot = self.mapper.reconcile(self.doc);
            *self.reconciled_revision = Some(snapshot.revision);
            *self.snapshot = Some(snapshot);
        }
    }

    pub(crate) fn resolve(&self, key: &StableKey) -> Option<NodeId> {
        self.mapper.node(key)
    }

    /// Resolve a key to a node still inside the editable subtree
    pub(crate) fn resolve_in_body(&self, key: &StableKey) -> Option<NodeId> {
        self.resolve(key)
            .filter(|&id| self.doc.is_inclusive_ancestor(self.doc.body(), id))
    }

    pub(crate) fn selection(&self, cursor: &CursorId) -> &[StableKey] {
        self.cursors.get(cursor).map(Vec::as_slice).unwrap_or(&[])
    }
}

struct CreateNodes {
    position: Position,
    cursor: CursorId,
    anchor: StableKey,
    created: Vec<NodeId>,
    prior: Vec<StableKey>,
}

impl Command for CreateNodes {
    fn name(&self) -> &'static str {
        "create"
    }

    fn apply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        match ctx.resolve_in_body(&self.anchor) {
            Some(anchor) => {
                for &id in &self.created {
                    if !ctx.doc.is_attached(id) {
                        ctx.doc.insert_adjacent(anchor, self.position, id)?;
                    }
                }
            }
            None => warn!(key = %self.anchor, "create anchor vanished, nothing inserted"),
        }
        ctx.sync();
        let nodes: Vec<NodeId> = self
            .created
            .iter()
            .copied()
            .filter(|&id| ctx.doc.is_attached(id))
            .collect();
        ctx.change_selection(&self.cursor, nodes);
        Ok(())
    }

    fn unapply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        for &id in &self.created {
            ctx.doc.detach(id);
        }
        ctx.sync();
        let nodes: Vec<NodeId> = self
            .prior
            .iter()
            .filter_map(|key| ctx.resolve_in_body(key))
            .collect();
        ctx.change_selection(&self.cursor, nodes);
        Ok(())
    }
}

/// Create `count` elements of `tag` at `position` relative to the single
/// selected node. Requires exactly one selected key; a sibling of the body
/// or root would leave the editable subtree, so those iterations are
/// skipped.
pub(crate) fn create_relative(
    ctx: &mut EditContext<'_>,
    histories: &mut HashMap<CursorId, History>,
    position: Position,
    cursor: &CursorId,
    tag: &str,
    count: usize,
) -> EditorResult<()> {
    let prior = ctx.selection(cursor).to_vec();
    if prior.len() != 1 {
        return Ok(());
    }
    let anchor = prior[0].clone();
    let Some(anchor_node) = ctx.resolve_in_body(&anchor) else {
        return Ok(());
    };
    let mut created = Vec::new();
    for _ in 0..count {
        if position.is_sibling()
            && (anchor_node == ctx.doc.body() || anchor_node == ctx.doc.root())
        {
            continue;
        }
        created.push(ctx.doc.create_element(tag));
    }
    if created.is_empty() {
        return Ok(());
    }
    debug!(tag, count = created.len(), ?position, "create");
    let command = CreateNodes {
        position,
        cursor: cursor.clone(),
        anchor,
        created,
        prior,
    };
    histories
        .entry(cursor.clone())
        .or_default()
        .push(Box::new(command), ctx)
}

struct DeleteNodes {
    cursor: CursorId,
    removed: Vec<NodeId>,
    parents: Vec<NodeId>,
    indices: Vec<usize>,
    replacement: Vec<NodeId>,
}

impl Command for DeleteNodes {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn apply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        for &id in &self.removed {
            ctx.doc.detach(id);
        }
        ctx.sync();
        ctx.change_selection(&self.cursor, self.replacement.clone());
        Ok(())
    }

    fn unapply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        for n in 0..self.removed.len() {
            let parent = self.parents[n];
            // recorded element index if a child still occupies it, else append
            let result = match ctx.doc.element_children(parent).get(self.indices[n]).copied() {
                Some(reference) => match ctx.doc.child_index(reference) {
                    Some(at) => ctx.doc.insert(parent, at, self.removed[n]),
                    None => ctx.doc.append(parent, self.removed[n]),
                },
                None => ctx.doc.append(parent, self.removed[n]),
            };
            if let Err(err) = result {
                warn!(%err, "removed node could not be restored");
            }
        }
        ctx.sync();
        ctx.change_selection(&self.cursor, self.removed.clone());
        Ok(())
    }
}

/// Remove the selected nodes, `count` times over, copying the selection to
/// the clipboard first. The root, body and head are filtered out of the
/// removal set even when selected. The replacement selection follows the
/// observed fallback: for a single removal the sibling now occupying the
/// node's former index, else the one before it, else the parent; for a
/// grouped removal each node's preceding sibling, with all parents as the
/// last resort.
pub(crate) fn delete_selected(
    ctx: &mut EditContext<'_>,
    histories: &mut HashMap<CursorId, History>,
    cursor: &CursorId,
    count: usize,
) -> EditorResult<()> {
    copy_selected(ctx, cursor)?;
    for _ in 0..count {
        let keys = ctx.selection(cursor).to_vec();
        let protected = [ctx.doc.root(), ctx.doc.body(), ctx.doc.head()];
        let targets: Vec<NodeId> = keys
            .iter()
            .filter_map(|key| ctx.resolve(key))
            .filter(|id| !protected.contains(id))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        let mut pre: Vec<(NodeId, NodeId, usize)> = Vec::new();
        for &target in &targets {
            let (Some(parent), Some(index)) =
                (ctx.doc.parent(target), ctx.doc.element_index(target))
            else {
                continue;
            };
            pre.push((target, parent, index));
        }
        if pre.is_empty() {
            return Ok(());
        }

        let single = pre.len() == 1;
        let mut removed = Vec::with_capacity(pre.len());
        let mut parents = Vec::with_capacity(pre.len());
        let mut indices = Vec::with_capacity(pre.len());
        let mut replacement: Vec<NodeId> = Vec::new();
        for &(target, parent, original_index) in &pre {
            // the live index shifts as earlier group members come out
            let live_index = ctx.doc.element_index(target);
            ctx.doc.detach(target);
            removed.push(target);
            parents.push(parent);
            indices.push(original_index);
            let Some(live_index) = live_index else { continue };
            let fallback = if single {
                ctx.doc
                    .element_children(parent)
                    .get(live_index)
                    .copied()
                    .or_else(|| {
                        live_index
                            .checked_sub(1)
                            .and_then(|i| ctx.doc.element_children(parent).get(i).copied())
                    })
                    .or(Some(parent))
            } else {
                live_index
                    .checked_sub(1)
                    .and_then(|i| ctx.doc.element_children(parent).get(i).copied())
            };
            if let Some(node) = fallback {
                if !replacement.contains(&node) {
                    replacement.push(node);
                }
            }
        }
        replacement.retain(|node| !removed.contains(node));
        if replacement.is_empty() {
            replacement.extend(parents.iter().copied());
        }

        debug!(count = removed.len(), "delete");
        let command = DeleteNodes {
            cursor: cursor.clone(),
            removed,
            parents,
            indices,
            replacement,
        };
        histories
            .entry(cursor.clone())
            .or_default()
            .push(Box::new(command), ctx)?;
    }
    Ok(())
}

/// Serialize the selection's outer markup, newline-joined, into the
/// cursor's clipboard; the primary cursor also mirrors it process-wide
pub(crate) fn copy_selected(ctx: &mut EditContext<'_>, cursor: &CursorId) -> EditorResult<()> {
    let keys = ctx.selection(cursor).to_vec();
    let markup = keys
        .iter()
        .filter_map(|key| ctx.resolve(key))
        .map(|id| outer_html(ctx.doc, id))
        .collect::<Vec<_>>()
        .join("\n");
    debug!(bytes = markup.len(), "copy");
    ctx.clipboards.insert(cursor.clone(), markup.clone());
    if cursor.is_primary() {
        ctx.shared.set(markup);
    }
    Ok(())
}

struct PasteClones {
    position: Position,
    cursor: CursorId,
    clones: Vec<NodeId>,
    /// Anchor key per clone, aligned with `clones`
    anchors: Vec<StableKey>,
    prior: Vec<StableKey>,
}

impl Command for PasteClones {
    fn name(&self) -> &'static str {
        "paste"
    }

    fn apply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        for (n, &clone) in self.clones.iter().enumerate() {
            if ctx.doc.is_attached(clone) {
                continue;
            }
            match ctx.resolve(&self.anchors[n]) {
                Some(anchor) => {
                    if let Err(err) = ctx.doc.insert_adjacent(anchor, self.position, clone) {
                        warn!(%err, "paste anchor rejected clone");
                    }
                }
                None => warn!(key = %self.anchors[n], "paste anchor vanished"),
            }
        }
        ctx.sync();
        let nodes: Vec<NodeId> = self
            .clones
            .iter()
            .copied()
            .filter(|&id| ctx.doc.is_attached(id))
            .collect();
        ctx.change_selection(&self.cursor, nodes);
        Ok(())
    }

    fn unapply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()> {
        for &clone in &self.clones {
            ctx.doc.detach(clone);
        }
        ctx.sync();
        let nodes: Vec<NodeId> = self
            .prior
            .iter()
            .filter_map(|key| ctx.resolve(key))
            .collect();
        ctx.change_selection(&self.cursor, nodes);
        Ok(())
    }
}

/// Paste the cursor's clipboard (the primary cursor falls back to the
/// process-wide slot) at `position` relative to the selection.
///
/// With one selected node every fragment is cloned against it; with several,
/// fragments distribute cyclically, one per selected node. Iteration runs in
/// clipboard order for trailing positions and reverse order for leading
/// ones, so repeated insertion lands the fragments the way they were copied.
pub(crate) fn paste_relative(
    ctx: &mut EditContext<'_>,
    histories: &mut HashMap<CursorId, History>,
    position: Position,
    cursor: &CursorId,
) -> EditorResult<()> {
    let own = ctx
        .clipboards
        .get(cursor)
        .filter(|clip| !clip.is_empty())
        .cloned();
    let markup = match own {
        Some(markup) => markup,
        None => {
            if !cursor.is_primary() {
                return Ok(());
            }
            match ctx.shared.get().filter(|clip| !clip.is_empty()) {
                Some(markup) => markup,
                None => return Ok(()),
            }
        }
    };
    let fragments = parse_fragments(ctx.doc, &markup)?;
    if fragments.is_empty() {
        return Ok(());
    }
    let prior = ctx.selection(cursor).to_vec();
    if prior.is_empty() {
        return Ok(());
    }

    let mut clones = Vec::new();
    let mut anchors = Vec::new();
    if prior.len() == 1 {
        let key = &prior[0];
        if ctx.resolve(key).is_none() {
            return Ok(());
        }
        let items: Vec<NodeId> = if position.is_leading() {
            fragments.iter().rev().copied().collect()
        } else {
            fragments.clone()
        };
        for fragment in items {
            let clone = ctx.doc.clone_subtree(fragment)?;
            ctx.doc.remove_attribute(clone, TRACKING_ATTRIBUTE)?;
            clones.push(clone);
            anchors.push(key.clone());
        }
    } else {
        let items: Vec<StableKey> = if position.is_leading() {
            prior.iter().rev().cloned().collect()
        } else {
            prior.clone()
        };
        for (n, key) in items.iter().enumerate() {
            if ctx.resolve(key).is_none() {
                continue;
            }
            let clone = ctx.doc.clone_subtree(fragments[n % fragments.len()])?;
            ctx.doc.remove_attribute(clone, TRACKING_ATTRIBUTE)?;
            clones.push(clone);
            anchors.push(key.clone());
        }
    }
    if clones.is_empty() {
        return Ok(());
    }

    debug!(count = clones.len(), ?position, "paste");
    let command = PasteClones {
        position,
        cursor: cursor.clone(),
        clones,
        anchors,
        prior,
    };
    histories
        .entry(cursor.clone())
        .or_default()
        .push(Box::new(command), ctx)
}
