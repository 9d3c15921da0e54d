//! Markup serialization
//!
//! Inverse of the parser: emits the tree back as HTML text. Text and
//! attribute values are escaped, void elements close themselves, and raw
//! text elements (script, style) are emitted verbatim.

use crate::document::Document;
use crate::node::{is_raw_text, is_void, NodeId, NodeKind};

/// Serialize the whole document, doctype included
pub fn serialize_document(doc: &Document) -> String {
    format!("<!doctype html>{}", outer_html(doc, doc.root()))
}

/// Markup of a node including the node itself
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Markup of a node's children only
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        None => {}
        Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
        Some(NodeKind::Element(data)) => {
            let tag = data.tag();
            out.push('<');
            out.push_str(tag);
            for (name, value) in data.attributes() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void(tag) {
                return;
            }
            if is_raw_text(tag) {
                for &child in doc.children(id) {
                    if let Some(NodeKind::Text(text)) = doc.kind(child) {
                        out.push_str(text);
                    }
                }
            } else {
                for &child in doc.children(id) {
                    write_node(doc, child, out);
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
