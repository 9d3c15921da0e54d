//! # HTML parser
//!
//! Tokenizer + tree builder for the subset of HTML the editor works with.
//! The builder is tolerant in the tag-soup tradition: stray close tags are
//! dropped, unclosed elements are closed at end of input, and unknown
//! entities pass through literally. Hard errors are reserved for input that
//! cannot be a document at all (a tag left open at end of input).

use crate::document::Document;
use crate::error::{DomError, DomResult};
use crate::node::{is_raw_text, is_void, NodeId, NodeKind};

/// Parse a complete HTML document.
///
/// The result always has `html`, `head` and `body` elements: missing ones
/// are synthesized, and content found outside `body` is moved into it, the
/// way browsers normalize a partial page.
pub fn parse_document(source: &str) -> DomResult<Document> {
    let mut doc = Document::bare();
    let roots = parse_forest(&mut doc, source)?;
    normalize_document(&mut doc, roots)?;
    Ok(doc)
}

/// Parse markup into top-level element fragments, detached, inside `doc`'s
/// arena. Top-level text is dropped; text inside fragments is kept.
pub fn parse_fragments(doc: &mut Document, source: &str) -> DomResult<Vec<NodeId>> {
    let roots = parse_forest(doc, source)?;
    Ok(roots
        .into_iter()
        .filter(|&id| doc.is_element(id))
        .collect())
}

#[derive(Debug)]
enum Token {
    Open {
        tag: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        tag: String,
    },
    Text(String),
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    raw_until: Option<String>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            raw_until: None,
        }
    }

    /// Switch to raw-text mode until `</tag` is seen
    fn enter_raw_text(&mut self, tag: &str) {
        self.raw_until = Some(tag.to_string());
    }

    fn byte(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn next_token(&mut self) -> DomResult<Option<Token>> {
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        if let Some(tag) = self.raw_until.take() {
            let needle = format!("</{}", tag);
            let haystack = self.input[self.pos..].to_ascii_lowercase();
            match haystack.find(&needle) {
                Some(0) => {} // the close tag itself, handled below
                Some(rel) => {
                    let text = self.input[self.pos..self.pos + rel].to_string();
                    self.pos += rel;
                    self.raw_until = Some(tag);
                    return Ok(Some(Token::Text(text)));
                }
                None => {
                    let text = self.input[self.pos..].to_string();
                    self.pos = self.input.len();
                    return Ok(Some(Token::Text(text)));
                }
            }
        }
        if self.byte() == Some(b'<') {
            if self.starts_with("<!--") {
                match self.input[self.pos..].find("-->") {
                    Some(rel) => self.pos += rel + 3,
                    None => self.pos = self.input.len(),
                }
                return self.next_token();
            }
            if self.starts_with("<!") || self.starts_with("<?") {
                // doctype or processing instruction: skip
                match self.input[self.pos..].find('>') {
                    Some(rel) => self.pos += rel + 1,
                    None => self.pos = self.input.len(),
                }
                return self.next_token();
            }
            if self.starts_with("</") {
                self.pos += 2;
                let tag = self.read_name();
                match self.input[self.pos..].find('>') {
                    Some(rel) => self.pos += rel + 1,
                    None => self.pos = self.input.len(),
                }
                return Ok(Some(Token::Close {
                    tag: tag.to_ascii_lowercase(),
                }));
            }
            let name_start = self.pos + 1;
            if name_start < self.input.len()
                && self.input.as_bytes()[name_start].is_ascii_alphabetic()
            {
                return self.read_open_tag().map(Some);
            }
            // a lone '<' in text
            self.pos += 1;
            return Ok(Some(Token::Text("<".to_string())));
        }
        let end = self.input[self.pos..]
            .find('<')
            .map(|rel| self.pos + rel)
            .unwrap_or(self.input.len());
        let text = decode_entities(&self.input[self.pos..end]);
        self.pos = end;
        Ok(Some(Token::Text(text)))
    }

    fn read_open_tag(&mut self) -> DomResult<Token> {
        let start = self.pos;
        self.pos += 1;
        let tag = self.read_name().to_ascii_lowercase();
        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            self.skip_whitespace();
            match self.byte() {
                None => {
                    return Err(DomError::Parse {
                        message: format!("unterminated <{}> tag", tag),
                        offset: start,
                    })
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    if self.byte() == Some(b'>') {
                        self.pos += 1;
                        self_closing = true;
                        break;
                    }
                }
                Some(_) => {
                    let name = self.read_attr_name();
                    if name.is_empty() {
                        self.pos += 1;
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if self.byte() == Some(b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_attr_value(start)?
                    } else {
                        String::new()
                    };
                    attributes.push((name.to_ascii_lowercase(), value));
                }
            }
        }
        Ok(Token::Open {
            tag,
            attributes,
            self_closing,
        })
    }

    fn read_attr_value(&mut self, tag_start: usize) -> DomResult<String> {
        match self.byte() {
            Some(quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let rel = self.input[self.pos..]
                    .find(quote as char)
                    .ok_or(DomError::Parse {
                        message: "unterminated attribute value".to_string(),
                        offset: tag_start,
                    })?;
                let value = decode_entities(&self.input[self.pos..self.pos + rel]);
                self.pos += rel + 1;
                Ok(value)
            }
            _ => {
                let start = self.pos;
                while let Some(b) = self.byte() {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(decode_entities(&self.input[start..self.pos]))
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.byte() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn read_attr_name(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.byte() {
            if b.is_ascii_whitespace() || matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'') {
                break;
            }
            self.pos += 1;
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }
}

fn parse_forest(doc: &mut Document, source: &str) -> DomResult<Vec<NodeId>> {
    let mut tokenizer = Tokenizer::new(source);
    let mut roots: Vec<NodeId> = Vec::new();
    let mut stack: Vec<NodeId> = Vec::new();
    while let Some(token) = tokenizer.next_token()? {
        match token {
            Token::Text(text) => {
                if stack.is_empty() && text.trim().is_empty() {
                    continue;
                }
                let node = doc.create_text(&text);
                place(doc, &mut stack, &mut roots, node)?;
            }
            Token::Open {
                tag,
                attributes,
                self_closing,
            } => {
                let el = doc.create_element(&tag);
                for (name, value) in &attributes {
                    doc.set_attribute(el, name, value)?;
                }
                place(doc, &mut stack, &mut roots, el)?;
                if !self_closing && !is_void(&tag) {
                    stack.push(el);
                    if is_raw_text(&tag) {
                        tokenizer.enter_raw_text(&tag);
                    }
                }
            }
            Token::Close { tag } => {
                if let Some(at) = stack
                    .iter()
                    .rposition(|&id| doc.tag(id) == Some(tag.as_str()))
                {
                    stack.truncate(at);
                }
            }
        }
    }
    Ok(roots)
}

fn place(
    doc: &mut Document,
    stack: &mut [NodeId],
    roots: &mut Vec<NodeId>,
    node: NodeId,
) -> DomResult<()> {
    match stack.last() {
        Some(&parent) => doc.append(parent, node),
        None => {
            roots.push(node);
            Ok(())
        }
    }
}

fn normalize_document(doc: &mut Document, roots: Vec<NodeId>) -> DomResult<()> {
    let parsed_html = roots
        .iter()
        .copied()
        .find(|&id| doc.tag(id) == Some("html"));
    if let Some(html) = parsed_html {
        doc.set_root(html);
    }
    let root = doc.root();

    // adopt top-level <head>/<body> when the source had no <html> wrapper
    if parsed_html.is_none() {
        for &id in &roots {
            if matches!(doc.tag(id), Some("head" | "body")) {
                doc.append(root, id)?;
            }
        }
    }

    let head = match doc
        .element_children(root)
        .into_iter()
        .find(|&c| doc.tag(c) == Some("head"))
    {
        Some(head) => head,
        None => {
            let head = doc.create_element("head");
            doc.insert(root, 0, head)?;
            head
        }
    };
    let body = match doc
        .element_children(root)
        .into_iter()
        .find(|&c| doc.tag(c) == Some("body"))
    {
        Some(body) => body,
        None => {
            let body = doc.create_element("body");
            doc.append(root, body)?;
            body
        }
    };
    doc.set_head(head);
    doc.set_body(body);

    // content parsed outside the adopted <html> belongs in the body
    for id in roots {
        if Some(id) == parsed_html || doc.parent(id).is_some() {
            continue;
        }
        if is_blank_text(doc, id) {
            continue;
        }
        doc.append(body, id)?;
    }
    // likewise for direct children of <html> other than head and body
    let strays: Vec<NodeId> = doc
        .children(root)
        .iter()
        .copied()
        .filter(|&c| c != head && c != body)
        .collect();
    for id in strays {
        if is_blank_text(doc, id) {
            doc.detach(id);
        } else {
            doc.append(body, id)?;
        }
    }

    doc.reset_revision();
    Ok(())
}

fn is_blank_text(doc: &Document, id: NodeId) -> bool {
    matches!(doc.kind(id), Some(NodeKind::Text(text)) if text.trim().is_empty())
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] != b'&' {
            let rel = input[pos..].find('&').unwrap_or(input.len() - pos);
            out.push_str(&input[pos..pos + rel]);
            pos += rel;
            continue;
        }
        match input[pos..].find(';') {
            Some(end) if end > 1 && end <= 10 => {
                let name = &input[pos + 1..pos + end];
                let decoded = match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    _ => decode_numeric_entity(name),
                };
                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        pos += end + 1;
                    }
                    None => {
                        out.push('&');
                        pos += 1;
                    }
                }
            }
            _ => {
                out.push('&');
                pos += 1;
            }
        }
    }
    out
}

fn decode_numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
