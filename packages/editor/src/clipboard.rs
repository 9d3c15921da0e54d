//! Process-wide clipboard slot
//!
//! Each cursor owns a private clipboard inside its frame; the primary cursor
//! additionally mirrors copies here so paste keeps working across frames and
//! editing sessions within the process.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct SharedClipboard {
    inner: Arc<Mutex<Option<String>>>,
}

impl SharedClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, markup: impl Into<String>) {
        *self.inner.lock().unwrap() = Some(markup.into());
    }

    pub fn get(&self) -> Option<String> {
        self.inner.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap() = None;
    }
}
