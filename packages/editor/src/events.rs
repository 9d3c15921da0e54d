//! Editor event bus payloads
//!
//! Events fan out over a broadcast channel. A collaboration layer can
//! subscribe and forward them to peers; payloads are serializable for that
//! reason. Selection changes are emitted unconditionally, even when the
//! resulting set is unchanged — consumers deduplicate if they care.

use serde::{Deserialize, Serialize};

use crate::frame::{CursorId, OverlayChange};
use crate::mapper::StableKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorEvent {
    SelectionChanged {
        path: String,
        cursor: CursorId,
        keys: Vec<StableKey>,
    },
    FrameReady {
        path: String,
    },
    FrameClosed {
        path: String,
    },
    OverlaysChanged {
        path: String,
        changes: Vec<OverlayChange>,
    },
}
