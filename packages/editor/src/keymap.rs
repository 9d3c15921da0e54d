//! Keyboard dispatch
//!
//! Chord strings arrive from the host's key-down listener (`"Ctrl-z"`,
//! `"Delete"`, ...) and map to editor actions. Bindings are plain data; the
//! host can replace the whole table or rebind individual chords.

use serde::{Deserialize, Serialize};
use webfoundry_dom::Position;

use crate::selection::Relation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorAction {
    Undo,
    Redo,
    ToggleSelection,
    SelectRelative(Relation),
    Create { position: Position, tag: String },
    DeleteSelected,
    CopySelected,
    Paste(Position),
}

#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: Vec<(String, EditorAction)>,
}

impl Keymap {
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Bind a chord, replacing any previous binding for it
    pub fn bind(&mut self, chord: &str, action: EditorAction) {
        self.bindings.retain(|(c, _)| c != chord);
        self.bindings.push((chord.to_string(), action));
    }

    pub fn lookup(&self, chord: &str) -> Option<&EditorAction> {
        self.bindings
            .iter()
            .find(|(c, _)| c == chord)
            .map(|(_, action)| action)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.bind("Ctrl-z", EditorAction::Undo);
        map.bind("Ctrl-y", EditorAction::Redo);
        map.bind("Escape", EditorAction::ToggleSelection);
        map.bind("Delete", EditorAction::DeleteSelected);
        map.bind("Backspace", EditorAction::DeleteSelected);
        map.bind("Ctrl-c", EditorAction::CopySelected);
        map.bind("Ctrl-v", EditorAction::Paste(Position::After));
        map.bind("Ctrl-V", EditorAction::Paste(Position::Append));
        map.bind("ArrowUp", EditorAction::SelectRelative(Relation::PrevSibling));
        map.bind("ArrowDown", EditorAction::SelectRelative(Relation::NextSibling));
        map.bind("ArrowLeft", EditorAction::SelectRelative(Relation::Parent));
        map.bind("ArrowRight", EditorAction::SelectRelative(Relation::FirstChild));
        map.bind(
            "Enter",
            EditorAction::Create {
                position: Position::After,
                tag: "div".to_string(),
            },
        );
        map.bind(
            "Ctrl-Enter",
            EditorAction::Create {
                position: Position::Append,
                tag: "div".to_string(),
            },
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_resolve() {
        let map = Keymap::default();
        assert_eq!(map.lookup("Ctrl-z"), Some(&EditorAction::Undo));
        assert_eq!(map.lookup("Delete"), Some(&EditorAction::DeleteSelected));
        assert_eq!(map.lookup("Ctrl-x"), None);
    }

    #[test]
    fn bind_replaces_existing_chord() {
        let mut map = Keymap::default();
        map.bind("Ctrl-z", EditorAction::Redo);
        assert_eq!(map.lookup("Ctrl-z"), Some(&EditorAction::Redo));
        assert_eq!(
            map.bindings.iter().filter(|(c, _)| c == "Ctrl-z").count(),
            1
        );
    }
}
