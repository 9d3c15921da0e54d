//! # Command history
//!
//! Per-cursor linear undo/redo over reversible commands.
//!
//! ## Design
//!
//! - A command is an explicit object exposing `apply`/`unapply`, not a
//!   closure over live tree references: everything it needs is re-resolved
//!   at (un)apply time, so it tolerates nodes detached by an interleaved
//!   operation.
//! - Pushing runs the command's first forward application itself.
//! - Pushing while the index sits behind the stack's end discards the
//!   unreachable redo branch — a linear history, not an undo tree.
//! - Undo at the bottom and redo at the top are silent no-ops.

use tracing::debug;

use crate::commands::EditContext;
use crate::errors::EditorResult;

/// One reversible structural edit. `apply` and `unapply` are idempotent
/// when called in alternation; nodes the command re-materializes receive
/// new identity each time.
pub(crate) trait Command: Send {
    fn name(&self) -> &'static str;

    fn apply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()>;

    fn unapply(&self, ctx: &mut EditContext<'_>) -> EditorResult<()>;
}

/// Undo/redo stack for one cursor
#[derive(Default)]
pub struct History {
    entries: Vec<Box<dyn Command>>,
    index: usize,
}

impl History {
    /// Entries currently on the stack
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the next redo; undo steps back from here
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index < self.entries.len()
    }

    /// Apply `command` and record it, discarding any redo branch
    pub(crate) fn push(
        &mut self,
        command: Box<dyn Command>,
        ctx: &mut EditContext<'_>,
    ) -> EditorResult<()> {
        self.entries.truncate(self.index);
        command.apply(ctx)?;
        debug!(command = command.name(), depth = self.entries.len() + 1, "push");
        self.entries.push(command);
        self.index += 1;
        Ok(())
    }

    /// Step back once; `false` if there is nothing to undo
    pub(crate) fn undo(&mut self, ctx: &mut EditContext<'_>) -> EditorResult<bool> {
        if self.index == 0 {
            return Ok(false);
        }
        self.index -= 1;
        let command = &self.entries[self.index];
        debug!(command = command.name(), index = self.index, "undo");
        command.unapply(ctx)?;
        Ok(true)
    }

    /// Step forward once; `false` if there is nothing to redo
    pub(crate) fn redo(&mut self, ctx: &mut EditContext<'_>) -> EditorResult<bool> {
        let Some(command) = self.entries.get(self.index) else {
            return Ok(false);
        };
        debug!(command = command.name(), index = self.index, "redo");
        command.apply(ctx)?;
        self.index += 1;
        Ok(true)
    }
}
