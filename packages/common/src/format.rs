//! Formatting service contract
//!
//! Formatting is an external collaborator: the engine hands over serialized
//! content and writes the result back only when it actually changed. The
//! implementation is assumed pure and deterministic.

use serde::{Deserialize, Serialize};

use crate::error::FormatResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Parser the formatter should use, e.g. `"html"`
    pub parser: String,
}

impl FormatOptions {
    pub fn parser(parser: impl Into<String>) -> Self {
        Self {
            parser: parser.into(),
        }
    }
}

pub trait Formatter: Send + Sync {
    fn format(&self, content: &str, options: &FormatOptions) -> FormatResult<String>;
}

/// Formatter that returns its input unchanged
pub struct NoopFormatter;

impl Formatter for NoopFormatter {
    fn format(&self, content: &str, _options: &FormatOptions) -> FormatResult<String> {
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_formatter_is_identity() {
        let out = NoopFormatter
            .format("<div></div>", &FormatOptions::parser("html"))
            .unwrap();
        assert_eq!(out, "<div></div>");
    }
}
