//! # Webfoundry DOM
//!
//! The live document tree the editing engine mutates.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: HTML text → Document                │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: arena tree + structural mutation  │
//! │  - NodeId handles, valid for the document's │
//! │    lifetime, attached or not                │
//! │  - revision counter for batch reconcilers   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer: Document → HTML text            │
//! └─────────────────────────────────────────────┘
//! ```

pub mod document;
pub mod error;
pub mod node;
pub mod parser;
pub mod serializer;

pub use document::{Document, Position};
pub use error::{DomError, DomResult};
pub use node::{ElementData, NodeId, NodeKind};
pub use parser::{parse_document, parse_fragments};
pub use serializer::{inner_html, outer_html, serialize_document};
