//! # Workspace
//!
//! The open-frame set and the engine's public surface. At most one frame
//! exists per path; every entry point names its frame path and cursor
//! explicitly — there is no ambient "current frame", so concurrently open
//! documents and sessions cannot cross-talk. Referencing a path that is not
//! open is a hard error; operations on empty selections are silent no-ops.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webfoundry_dom::{parse_document, Document, NodeId, Position};

use crate::clipboard::SharedClipboard;
use crate::commands;
use crate::errors::{EditorError, EditorResult};
use crate::events::EditorEvent;
use crate::frame::{CursorId, Frame, FrameStatus};
use crate::keymap::{EditorAction, Keymap};
use crate::persist::{SavePipeline, SaveRequest};
use crate::selection::Relation;

/// Resolves once the frame selected for a path attaches and reconciles, or
/// fails with the attach error
pub struct SelectTicket {
    rx: oneshot::Receiver<Result<(), String>>,
}

impl SelectTicket {
    pub async fn ready(self) -> EditorResult<()> {
        match self.rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(EditorError::AttachFailed(message)),
            Err(_) => Err(EditorError::FrameDiscarded),
        }
    }
}

pub struct Workspace {
    project: String,
    frames: HashMap<String, Frame>,
    events: broadcast::Sender<EditorEvent>,
    shared_clipboard: SharedClipboard,
    pipeline: Option<SavePipeline>,
    keymap: Keymap,
}

impl Workspace {
    pub fn new(project: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            project: project.into(),
            frames: HashMap::new(),
            events,
            shared_clipboard: SharedClipboard::new(),
            pipeline: None,
            keymap: Keymap::default(),
        }
    }

    /// Route reconciled snapshots into a persistence pipeline
    pub fn with_pipeline(mut self, pipeline: SavePipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Share a clipboard slot with other workspaces in the process
    pub fn with_shared_clipboard(mut self, clipboard: SharedClipboard) -> Self {
        self.shared_clipboard = clipboard;
        self
    }

    pub fn with_keymap(mut self, keymap: Keymap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn shared_clipboard(&self) -> SharedClipboard {
        self.shared_clipboard.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: EditorEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.frames.contains_key(path)
    }

    pub fn frame(&self, path: &str) -> EditorResult<&Frame> {
        self.frames
            .get(path)
            .ok_or_else(|| EditorError::FrameNotOpen(path.to_string()))
    }

    fn frame_mut(&mut self, path: &str) -> EditorResult<&mut Frame> {
        self.frames
            .get_mut(path)
            .ok_or_else(|| EditorError::FrameNotOpen(path.to_string()))
    }

    /// Open a frame for `path` in the loading state. Selecting an
    /// already-open path is a no-op whose ticket resolves immediately.
    pub fn select(&mut self, path: &str) -> SelectTicket {
        let (tx, rx) = oneshot::channel();
        if self.frames.contains_key(path) {
            let _ = tx.send(Ok(()));
            return SelectTicket { rx };
        }
        info!(path, "opening frame");
        self.frames.insert(path.to_string(), Frame::new(path, tx));
        SelectTicket { rx }
    }

    /// Hand the loading frame its live document
    pub fn attach(&mut self, path: &str, document: Document) -> EditorResult<()> {
        self.frame_mut(path)?.attach_document(document);
        Ok(())
    }

    /// Signal that the host finished (or failed) loading the frame.
    ///
    /// On success the first reconciliation runs, the frame becomes ready
    /// and the pending select resolves. On failure the frame is discarded
    /// and the select rejects; the caller may retry by re-issuing select.
    pub fn ready(&mut self, path: &str, error: Option<String>) -> EditorResult<()> {
        if let Some(message) = error {
            let mut frame = self
                .frames
                .remove(path)
                .ok_or_else(|| EditorError::FrameNotOpen(path.to_string()))?;
            warn!(path, %message, "frame attach failed");
            if let Some(waiter) = frame.take_waiter() {
                let _ = waiter.send(Err(message));
            }
            return Ok(());
        }
        let frame = self.frame_mut(path)?;
        if !frame.has_document() {
            return Err(EditorError::NotAttached(path.to_string()));
        }
        frame.sync();
        frame.mark_clean();
        frame.set_status(FrameStatus::Ready);
        if let Some(waiter) = frame.take_waiter() {
            let _ = waiter.send(Ok(()));
        }
        info!(path, "frame ready");
        self.emit(EditorEvent::FrameReady {
            path: path.to_string(),
        });
        Ok(())
    }

    /// End the editing session for `path`, discarding all cursors, history,
    /// clipboards and overlays
    pub fn close(&mut self, path: &str) -> EditorResult<()> {
        let mut frame = self
            .frames
            .remove(path)
            .ok_or_else(|| EditorError::FrameNotOpen(path.to_string()))?;
        frame.set_status(FrameStatus::Closed);
        info!(path, "frame closed");
        self.emit(EditorEvent::FrameClosed {
            path: path.to_string(),
        });
        Ok(())
    }

    /// Close every open frame (project switch)
    pub fn reset(&mut self) {
        let paths: Vec<String> = self.frames.drain().map(|(path, _)| path).collect();
        for path in paths {
            info!(path = %path, "frame closed");
            self.emit(EditorEvent::FrameClosed { path });
        }
    }

    /// Replace a ready frame's entire document state, outside the undo
    /// history (remote snapshot application). Every previously-issued key
    /// dies; the next reconciliation issues fresh ones.
    pub fn replace_document(&mut self, path: &str, markup: &str) -> EditorResult<()> {
        let frame = self.frame_mut(path)?;
        if !frame.is_ready() {
            return Err(EditorError::NotAttached(path.to_string()));
        }
        let document = parse_document(markup)?;
        frame.attach_document(document);
        frame.sync();
        debug!(path, "document replaced");
        self.notify_save(path);
        Ok(())
    }

    fn notify_save(&mut self, path: &str) {
        let Some(pipeline) = &self.pipeline else { return };
        let Some(frame) = self.frames.get_mut(path) else {
            return;
        };
        if let Some(markup) = frame.dirty_markup() {
            pipeline.notify(SaveRequest {
                project: self.project.clone(),
                path: path.to_string(),
                markup,
            });
        }
    }

    /// Replace a cursor's selection with the given candidate nodes
    pub fn change_selection(
        &mut self,
        path: &str,
        cursor: &CursorId,
        candidates: Vec<NodeId>,
    ) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, _) = frame.split()?.into_context(&events, &shared);
        ctx.change_selection(cursor, candidates);
        Ok(())
    }

    pub fn toggle_selection(&mut self, path: &str, cursor: &CursorId) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, _) = frame.split()?.into_context(&events, &shared);
        ctx.toggle_selection(cursor);
        Ok(())
    }

    pub fn select_relative(
        &mut self,
        path: &str,
        relation: Relation,
        cursor: &CursorId,
        steps: usize,
    ) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, _) = frame.split()?.into_context(&events, &shared);
        ctx.select_relative(cursor, relation, steps);
        Ok(())
    }

    pub fn create_relative(
        &mut self,
        path: &str,
        position: Position,
        cursor: &CursorId,
        tag: &str,
        count: usize,
    ) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, histories) = frame.split()?.into_context(&events, &shared);
        commands::create_relative(&mut ctx, histories, position, cursor, tag, count)?;
        self.notify_save(path);
        Ok(())
    }

    pub fn delete_selected(
        &mut self,
        path: &str,
        cursor: &CursorId,
        count: usize,
    ) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, histories) = frame.split()?.into_context(&events, &shared);
        commands::delete_selected(&mut ctx, histories, cursor, count)?;
        self.notify_save(path);
        Ok(())
    }

    pub fn copy_selected(&mut self, path: &str, cursor: &CursorId) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, _) = frame.split()?.into_context(&events, &shared);
        commands::copy_selected(&mut ctx, cursor)
    }

    pub fn paste_relative(
        &mut self,
        path: &str,
        position: Position,
        cursor: &CursorId,
    ) -> EditorResult<()> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, histories) = frame.split()?.into_context(&events, &shared);
        commands::paste_relative(&mut ctx, histories, position, cursor)?;
        self.notify_save(path);
        Ok(())
    }

    /// Step the cursor's history back once; `false` when there is nothing
    /// to undo
    pub fn undo(&mut self, path: &str, cursor: &CursorId) -> EditorResult<bool> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, histories) = frame.split()?.into_context(&events, &shared);
        let Some(history) = histories.get_mut(cursor) else {
            return Ok(false);
        };
        let undone = history.undo(&mut ctx)?;
        if undone {
            self.notify_save(path);
        }
        Ok(undone)
    }

    /// Step the cursor's history forward once; `false` when there is
    /// nothing to redo
    pub fn redo(&mut self, path: &str, cursor: &CursorId) -> EditorResult<bool> {
        let events = self.events.clone();
        let shared = self.shared_clipboard.clone();
        let frame = self.frame_mut(path)?;
        let (mut ctx, histories) = frame.split()?.into_context(&events, &shared);
        let Some(history) = histories.get_mut(cursor) else {
            return Ok(false);
        };
        let redone = history.redo(&mut ctx)?;
        if redone {
            self.notify_save(path);
        }
        Ok(redone)
    }

    /// Pointer-down on a node selects it for the primary cursor
    pub fn pointer_down(&mut self, path: &str, target: NodeId) -> EditorResult<()> {
        self.change_selection(path, &CursorId::Primary, vec![target])
    }

    /// Dispatch a key chord through the keymap; `false` when unbound
    pub fn key_down(&mut self, path: &str, cursor: &CursorId, chord: &str) -> EditorResult<bool> {
        let Some(action) = self.keymap.lookup(chord).cloned() else {
            return Ok(false);
        };
        debug!(path, chord, "shortcut");
        match action {
            EditorAction::Undo => {
                self.undo(path, cursor)?;
            }
            EditorAction::Redo => {
                self.redo(path, cursor)?;
            }
            EditorAction::ToggleSelection => self.toggle_selection(path, cursor)?,
            EditorAction::SelectRelative(relation) => {
                self.select_relative(path, relation, cursor, 1)?
            }
            EditorAction::Create { position, tag } => {
                self.create_relative(path, position, cursor, &tag, 1)?
            }
            EditorAction::DeleteSelected => self.delete_selected(path, cursor, 1)?,
            EditorAction::CopySelected => self.copy_selected(path, cursor)?,
            EditorAction::Paste(position) => self.paste_relative(path, position, cursor)?,
        }
        Ok(true)
    }
}

/// Re-run a frame's overlay bookkeeping at display-frame cadence until the
/// frame closes, emitting the slot changes for the host to render
pub fn spawn_overlay_tracker(
    workspace: Arc<Mutex<Workspace>>,
    path: impl Into<String>,
    frame_interval: Duration,
) -> JoinHandle<()> {
    let path = path.into();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(frame_interval);
        loop {
            ticker.tick().await;
            let mut ws = workspace.lock().unwrap();
            let Some(frame) = ws.frames.get_mut(&path) else {
                break;
            };
            if !frame.is_ready() {
                continue;
            }
            let changes = frame.sync_overlays();
            if !changes.is_empty() {
                ws.emit(EditorEvent::OverlaysChanged {
                    path: path.clone(),
                    changes,
                });
            }
        }
    })
}
