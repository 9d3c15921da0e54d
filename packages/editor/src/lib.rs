//! # Webfoundry Editor
//!
//! Live structural editing engine for Webfoundry pages.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: HTML text ⇄ live document tree         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: frames + structural editing         │
//! │  - stable key ↔ node identity mapping       │
//! │  - per-cursor selections and clipboards     │
//! │  - per-cursor linear undo/redo              │
//! │  - create/delete/copy/paste commands        │
//! │  - debounced persistence pipeline           │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ common: storage + formatting contracts      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **Identity over references**: selections, clipboards and history
//!    address nodes by stable key; live handles are re-resolved at point of
//!    use and tolerate concurrent detachment.
//! 2. **Explicit context**: every call names its frame path and cursor —
//!    no ambient "current document" state.
//! 3. **Cursors are islands**: each actor gets its own selection, history
//!    stack and clipboard; concurrent edits to overlapping subtrees are
//!    last-writer-wins.
//! 4. **Coalesced reconciliation**: identity mapping catches up once per
//!    operation, however many mutations it performed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use webfoundry_editor::{CursorId, Position, Workspace};
//! use webfoundry_dom::parse_document;
//!
//! let mut ws = Workspace::new("site");
//! let ticket = ws.select("pages/index.html");
//! ws.attach("pages/index.html", parse_document(html)?)?;
//! ws.ready("pages/index.html", None)?;
//! ticket.ready().await?;
//!
//! ws.pointer_down("pages/index.html", target)?;
//! ws.create_relative("pages/index.html", Position::After, &CursorId::Primary, "div", 1)?;
//! ws.undo("pages/index.html", &CursorId::Primary)?;
//! ```

mod clipboard;
mod commands;
mod errors;
mod events;
mod frame;
mod history;
mod keymap;
mod mapper;
mod persist;
mod selection;
mod workspace;

pub use clipboard::SharedClipboard;
pub use errors::{EditorError, EditorResult};
pub use events::EditorEvent;
pub use frame::{CursorId, Frame, FrameStatus, OverlayChange};
pub use history::History;
pub use keymap::{EditorAction, Keymap};
pub use mapper::{NodeMapper, Snapshot, StableKey, TRACKING_ATTRIBUTE};
pub use persist::{SavePipeline, SaveRequest};
pub use selection::Relation;
pub use workspace::{spawn_overlay_tracker, SelectTicket, Workspace};

// Re-export the document types operations take and return
pub use webfoundry_dom::{Document, NodeId, Position};
