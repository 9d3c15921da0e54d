//! # Persistence pipeline
//!
//! Debounced serialize-and-write. Every reconciled snapshot that moved the
//! document forward is handed here; a single task applies a trailing-edge
//! debounce per path (each new snapshot resets the timer and replaces the
//! pending content), writes the markup through the storage backend, then
//! asks the formatting service for a pretty-printed version and writes a
//! second time only when it differs.
//!
//! Failures are logged and dropped rather than retried: the next snapshot
//! re-derives its content from the live document, so the next scheduled
//! write is an implicit retry with fresh data. All writes go through one
//! task, so writes for a path never overlap; a snapshot arriving while a
//! write is in flight schedules exactly one further write reflecting the
//! freshest state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};
use webfoundry_common::{FormatOptions, Formatter, ProjectStore};

/// One snapshot queued for persistence
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub project: String,
    pub path: String,
    pub markup: String,
}

/// Handle to the pipeline task. Dropping it flushes whatever is pending and
/// stops the task.
pub struct SavePipeline {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl SavePipeline {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

    /// Spawn the pipeline task on the current runtime
    pub fn spawn(
        store: Arc<dyn ProjectStore>,
        formatter: Arc<dyn Formatter>,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, store, formatter, debounce));
        Self { tx }
    }

    /// Queue a snapshot; the latest one per path wins
    pub fn notify(&self, request: SaveRequest) {
        let _ = self.tx.send(request);
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
    store: Arc<dyn ProjectStore>,
    formatter: Arc<dyn Formatter>,
    debounce: Duration,
) {
    let mut pending: HashMap<(String, String), (SaveRequest, Instant)> = HashMap::new();
    loop {
        let deadline = pending
            .values()
            .map(|(_, due)| *due)
            .min()
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));
        tokio::select! {
            request = rx.recv() => match request {
                Some(request) => {
                    let key = (request.project.clone(), request.path.clone());
                    pending.insert(key, (request, Instant::now() + debounce));
                }
                None => {
                    for (_, (request, _)) in pending.drain() {
                        write_through(&*store, &*formatter, &request);
                    }
                    return;
                }
            },
            _ = tokio::time::sleep_until(deadline), if !pending.is_empty() => {
                let now = Instant::now();
                let due: Vec<(String, String)> = pending
                    .iter()
                    .filter(|(_, (_, due))| *due <= now)
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in due {
                    if let Some((request, _)) = pending.remove(&key) {
                        write_through(&*store, &*formatter, &request);
                    }
                }
            }
        }
    }
}

fn write_through(store: &dyn ProjectStore, formatter: &dyn Formatter, request: &SaveRequest) {
    debug!(project = %request.project, path = %request.path, "save");
    if let Err(err) = store.save(
        &request.project,
        &request.path,
        request.markup.as_bytes(),
        "text/html",
    ) {
        warn!(path = %request.path, %err, "save failed");
        return;
    }
    match formatter.format(&request.markup, &FormatOptions::parser("html")) {
        Ok(formatted) if formatted != request.markup => {
            if let Err(err) = store.save(
                &request.project,
                &request.path,
                formatted.as_bytes(),
                "text/html",
            ) {
                warn!(path = %request.path, %err, "formatted save failed");
            }
        }
        Ok(_) => {}
        Err(err) => warn!(path = %request.path, %err, "format failed"),
    }
}
