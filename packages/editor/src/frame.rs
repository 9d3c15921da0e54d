//! # Frame
//!
//! One open document under edit: the attached live tree, its identity
//! mapping, and per-cursor selections, histories, clipboards and overlay
//! bookkeeping. Cursors are fully independent of one another — two actors
//! editing the same frame never share an undo stack or a clipboard slot.
//!
//! ## Lifecycle
//!
//! ```text
//! select(path) ──→ Loading ──ready(path)──→ Ready ──close(path)──→ Closed
//!                     │
//!                     └──ready(path, err)──→ discarded, select rejected
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use webfoundry_dom::Document;

use crate::clipboard::SharedClipboard;
use crate::commands::EditContext;
use crate::errors::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::history::History;
use crate::mapper::{NodeMapper, Snapshot, StableKey};

/// A logical actor editing a frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CursorId {
    /// The local actor driving this session
    Primary,
    /// A remote collaborator
    Peer(String),
}

impl CursorId {
    pub fn peer(id: impl Into<String>) -> Self {
        CursorId::Peer(id.into())
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, CursorId::Primary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Loading,
    Ready,
    Closed,
}

/// Overlay slot created or disposed by [`Frame::sync_overlays`]; the host
/// renders one selection box per live slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OverlayChange {
    Created { cursor: CursorId, slot: usize },
    Disposed { cursor: CursorId, slot: usize },
}

pub struct Frame {
    path: String,
    status: FrameStatus,
    doc: Option<Document>,
    mapper: NodeMapper,
    snapshot: Option<Snapshot>,
    reconciled_revision: Option<u64>,
    saved_revision: Option<u64>,
    cursors: HashMap<CursorId, Vec<StableKey>>,
    last_cursors: HashMap<CursorId, Vec<StableKey>>,
    clipboards: HashMap<CursorId, String>,
    overlays: HashMap<CursorId, usize>,
    histories: HashMap<CursorId, History>,
    waiter: Option<oneshot::Sender<Result<(), String>>>,
}

impl Frame {
    pub(crate) fn new(path: &str, waiter: oneshot::Sender<Result<(), String>>) -> Self {
        Self {
            path: path.to_string(),
            status: FrameStatus::Loading,
            doc: None,
            mapper: NodeMapper::new(path),
            snapshot: None,
            reconciled_revision: None,
            saved_revision: None,
            cursors: HashMap::new(),
            last_cursors: HashMap::new(),
            clipboards: HashMap::new(),
            overlays: HashMap::new(),
            histories: HashMap::new(),
            waiter: Some(waiter),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> FrameStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == FrameStatus::Ready
    }

    pub fn document(&self) -> Option<&Document> {
        self.doc.as_ref()
    }

    pub fn mapper(&self) -> &NodeMapper {
        &self.mapper
    }

    /// Last reconciled snapshot, if any
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// A cursor's current selection, in selection order
    pub fn selection(&self, cursor: &CursorId) -> &[StableKey] {
        self.cursors
            .get(cursor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clipboard(&self, cursor: &CursorId) -> Option<&str> {
        self.clipboards.get(cursor).map(String::as_str)
    }

    pub fn history(&self, cursor: &CursorId) -> Option<&History> {
        self.histories.get(cursor)
    }

    pub fn overlay_count(&self, cursor: &CursorId) -> usize {
        self.overlays.get(cursor).copied().unwrap_or(0)
    }

    pub(crate) fn has_document(&self) -> bool {
        self.doc.is_some()
    }

    pub(crate) fn set_status(&mut self, status: FrameStatus) {
        self.status = status;
    }

    pub(crate) fn take_waiter(&mut self) -> Option<oneshot::Sender<Result<(), String>>> {
        self.waiter.take()
    }

    /// Attach (or replace) the live document. Any previous mapping is
    /// forgotten so the next reconciliation issues all-new keys.
    pub(crate) fn attach_document(&mut self, document: Document) {
        self.doc = Some(document);
        self.mapper.clear();
        self.snapshot = None;
        self.reconciled_revision = None;
        self.saved_revision = None;
    }

    /// Reconcile if the document moved past the last reconciled revision
    pub(crate) fn sync(&mut self) {
        let Some(doc) = &self.doc else { return };
        if self.reconciled_revision != Some(doc.revision()) || self.snapshot.is_none() {
            let snapshot = self.mapper.reconcile(doc);
            self.reconciled_revision = Some(snapshot.revision);
            self.snapshot = Some(snapshot);
        }
    }

    /// Treat the current snapshot as already persisted
    pub(crate) fn mark_clean(&mut self) {
        self.saved_revision = self.snapshot.as_ref().map(|s| s.revision);
    }

    /// Markup to persist, if the tree changed since the last hand-off
    pub(crate) fn dirty_markup(&mut self) -> Option<String> {
        let snapshot = self.snapshot.as_ref()?;
        if self.saved_revision == Some(snapshot.revision) {
            return None;
        }
        self.saved_revision = Some(snapshot.revision);
        Some(snapshot.markup.clone())
    }

    /// Grow/shrink per-cursor overlay slots to match selection cardinality
    pub(crate) fn sync_overlays(&mut self) -> Vec<OverlayChange> {
        let mut changes = Vec::new();
        for (cursor, keys) in &self.cursors {
            let want = keys.len();
            let have = self.overlays.entry(cursor.clone()).or_insert(0);
            while *have < want {
                changes.push(OverlayChange::Created {
                    cursor: cursor.clone(),
                    slot: *have,
                });
                *have += 1;
            }
            while *have > want {
                *have -= 1;
                changes.push(OverlayChange::Disposed {
                    cursor: cursor.clone(),
                    slot: *have,
                });
            }
        }
        changes
    }

    /// Split the frame into the parts a structural operation needs. Fails
    /// unless the frame is ready with a document attached — operating on a
    /// half-open frame is caller misordering.
    pub(crate) fn split(&mut self) -> EditorResult<FrameParts<'_>> {
        if self.status != FrameStatus::Ready {
            return Err(EditorError::NotAttached(self.path.clone()));
        }
        let Frame {
            path,
            doc,
            mapper,
            snapshot,
            reconciled_revision,
            cursors,
            last_cursors,
            clipboards,
            histories,
            ..
        } = self;
        let doc = doc
            .as_mut()
            .ok_or_else(|| EditorError::NotAttached(path.clone()))?;
        Ok(FrameParts {
            path: path.as_str(),
            doc,
            mapper,
            snapshot,
            reconciled_revision,
            cursors,
            last_cursors,
            clipboards,
            histories,
        })
    }
}

/// Disjoint borrows of a ready frame's fields
pub(crate) struct FrameParts<'a> {
    pub path: &'a str,
    pub doc: &'a mut Document,
    pub mapper: &'a mut NodeMapper,
    pub snapshot: &'a mut Option<Snapshot>,
    pub reconciled_revision: &'a mut Option<u64>,
    pub cursors: &'a mut HashMap<CursorId, Vec<StableKey>>,
    pub last_cursors: &'a mut HashMap<CursorId, Vec<StableKey>>,
    pub clipboards: &'a mut HashMap<CursorId, String>,
    pub histories: &'a mut HashMap<CursorId, History>,
}

impl<'a> FrameParts<'a> {
    /// Pair the frame-local parts with workspace services into an edit
    /// context, handing the history table back separately so commands can
    /// be pushed while the context is live
    pub(crate) fn into_context(
        self,
        events: &'a broadcast::Sender<EditorEvent>,
        shared: &'a SharedClipboard,
    ) -> (EditContext<'a>, &'a mut HashMap<CursorId, History>) {
        (
            EditContext {
                path: self.path,
                doc: self.doc,
                mapper: self.mapper,
                snapshot: self.snapshot,
                reconciled_revision: self.reconciled_revision,
                cursors: self.cursors,
                last_cursors: self.last_cursors,
                clipboards: self.clipboards,
                events,
                shared,
            },
            self.histories,
        )
    }
}
