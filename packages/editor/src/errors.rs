//! Error types for the editor

use thiserror::Error;
use webfoundry_dom::DomError;

/// Hard failures signal caller misordering or structural inconsistency;
/// interactively-triggered operations on empty or already-resolved state are
/// silent no-ops instead, and never surface here.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("frame not open: {0}")]
    FrameNotOpen(String),

    #[error("frame has no attached document: {0}")]
    NotAttached(String),

    #[error("frame attach failed: {0}")]
    AttachFailed(String),

    #[error("frame was discarded before becoming ready")]
    FrameDiscarded,

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),
}

pub type EditorResult<T> = Result<T, EditorError>;
