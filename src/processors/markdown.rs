// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Markdown Processing Module
//!
//! Splits YAML frontmatter from a source file and converts markdown bodies
//! to HTML with `pulldown-cmark`.
//!
//! ## Example Usage
//!
//! ```rust
//! use chainpress::processors::markdown::MarkdownProcessor;
//! use chainpress::core::traits::Transform;
//!
//! let processor = MarkdownProcessor::new().with_tables(true);
//!
//! let document = processor
//!     .parse_document("---\ntitle: Fees\n---\n## Gas\n")
//!     .unwrap();
//! assert_eq!(document.data["title"], "Fees");
//!
//! let html = processor.transform(document.body).unwrap();
//! assert_eq!(html, "<h2>Gas</h2>\n");
//! ```

use crate::core::{
    error::{ChainPressError, Result},
    traits::Transform,
};
use pulldown_cmark::{html, Options as MarkdownOptions, Parser};
use serde_json::{Map, Value as JsonValue};

const FRONTMATTER_FENCE: &str = "---";

/// A source file split into frontmatter data and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// Frontmatter fields. Empty when the file has no frontmatter.
    pub data: Map<String, JsonValue>,
    /// Everything after the closing fence.
    pub body: String,
}

/// Processor for Markdown content with configurable extensions.
#[derive(Debug, Clone)]
pub struct MarkdownProcessor {
    options: MarkdownOptions,
}

impl MarkdownProcessor {
    /// Creates a new MarkdownProcessor with no extensions enabled.
    pub fn new() -> Self {
        Self {
            options: MarkdownOptions::empty(),
        }
    }

    /// Enables table support in Markdown processing.
    pub fn with_tables(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_TABLES, enable);
        self
    }

    /// Enables strikethrough support in Markdown processing.
    pub fn with_strikethrough(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_STRIKETHROUGH, enable);
        self
    }

    /// Enables footnote support in Markdown processing.
    pub fn with_footnotes(mut self, enable: bool) -> Self {
        self.options.set(MarkdownOptions::ENABLE_FOOTNOTES, enable);
        self
    }

    /// Splits `content` into frontmatter data and body.
    ///
    /// Frontmatter is a YAML mapping between a leading `---` line and the
    /// next `---` line. An unterminated block is treated as body text.
    pub fn parse_document(&self, content: &str) -> Result<ParsedDocument> {
        let Some((yaml, body)) = split_frontmatter(content) else {
            return Ok(ParsedDocument {
                data: Map::new(),
                body: content.to_string(),
            });
        };

        if yaml.trim().is_empty() {
            return Ok(ParsedDocument {
                data: Map::new(),
                body: body.to_string(),
            });
        }

        let data = match serde_yml::from_str::<JsonValue>(yaml) {
            Ok(JsonValue::Object(map)) => map,
            Ok(JsonValue::Null) => Map::new(),
            Ok(other) => {
                return Err(ChainPressError::content_processing_error(
                    format!(
                        "Frontmatter must be a mapping, found {}",
                        other
                    ),
                    None,
                ));
            }
            Err(e) => {
                return Err(ChainPressError::content_processing_error(
                    "Failed to parse frontmatter",
                    Some(Box::new(e)),
                ));
            }
        };

        Ok(ParsedDocument {
            data,
            body: body.to_string(),
        })
    }

    /// Converts markdown to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut html_output = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut html_output, parser);
        html_output
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
            .with_tables(true)
            .with_footnotes(true)
            .with_strikethrough(true)
    }
}

impl Transform for MarkdownProcessor {
    type Input = String;
    type Output = String;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        Ok(self.render(&input))
    }
}

/// Returns `(yaml, body)` when `content` opens with a complete fence pair.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let after_fence = content.strip_prefix(FRONTMATTER_FENCE)?;
    let rest = after_fence
        .strip_prefix('\r')
        .unwrap_or(after_fence)
        .strip_prefix('\n')?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == FRONTMATTER_FENCE {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
