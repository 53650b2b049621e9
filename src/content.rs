// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Content Discovery Module
//!
//! Finds the pages of a site, works out where each one is written, and
//! builds the `articles` collection.
//!
//! - Every `*.md` and `*.hbs` file under the input directory is a page,
//!   except inside directories whose name starts with `_` (templates, data).
//! - `foo/bar.md` is written to `foo/bar/index.html` and served at
//!   `/foo/bar/`; `foo/index.md` is written to `foo/index.html`. A
//!   `permalink` frontmatter field overrides both.
//! - Markdown pages under `articles/` form the articles collection. Each is
//!   tagged with the chain named by the directory right below `articles/`,
//!   or [`GENERAL_CHAIN`] when that directory is not a known chain.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use log::debug;
use serde_json::{json, Map, Value as JsonValue};
use walkdir::{DirEntry, WalkDir};

use crate::core::error::{ChainPressError, Result};
use crate::filters::dates::{modified_time, parse_date};
use crate::processors::MarkdownProcessor;

/// Chain tag given to articles outside any known chain directory.
pub const GENERAL_CHAIN: &str = "general";

/// Directory segment that marks an article.
pub const ARTICLES_SEGMENT: &str = "articles";

/// The fixed set of chain names, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSet {
    chains: HashSet<String>,
}

impl ChainSet {
    /// Creates a chain set from names.
    pub fn new<I, S>(chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chains: chains.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `name` is a known chain.
    pub fn contains(&self, name: &str) -> bool {
        self.chains.contains(name)
    }

    /// Tags `path` with the chain directory that follows its first
    /// `articles` segment, falling back to [`GENERAL_CHAIN`].
    ///
    /// ```
    /// use chainpress::content::ChainSet;
    /// use std::path::Path;
    ///
    /// let chains = ChainSet::new(["bitcoin", "ethereum", "solana"]);
    /// assert_eq!(chains.classify(Path::new("src/articles/solana/fees.md")), "solana");
    /// assert_eq!(chains.classify(Path::new("src/articles/misc/fees.md")), "general");
    /// ```
    pub fn classify(&self, path: &Path) -> &str {
        let segments: Vec<&str> = path
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => segment.to_str(),
                _ => None,
            })
            .collect();

        segments
            .iter()
            .position(|segment| *segment == ARTICLES_SEGMENT)
            .and_then(|index| segments.get(index + 1))
            .and_then(|candidate| self.chains.get(*candidate))
            .map_or(GENERAL_CHAIN, String::as_str)
    }
}

/// How a page body is turned into HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Templated, then converted from markdown, then wrapped in a layout.
    Markdown,
    /// Rendered directly as a Handlebars template.
    Template,
}

/// A source file and everything needed to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Source file.
    pub input_path: PathBuf,
    /// Destination, relative to the output directory.
    pub output_path: PathBuf,
    /// Public URL, always starting and usually ending with `/`.
    pub url: String,
    /// Frontmatter `date`, or the file's modification time.
    pub date: DateTime<Utc>,
    /// Frontmatter fields.
    pub data: Map<String, JsonValue>,
    /// Source after the frontmatter.
    pub body: String,
    /// Rendering path.
    pub kind: PageKind,
    /// Chain tag, set for articles only.
    pub chain: Option<String>,
}

impl Page {
    /// Returns `true` for members of the articles collection.
    pub fn is_article(&self) -> bool {
        self.chain.is_some()
    }

    /// Layout named in frontmatter, or the default for the page type.
    pub fn layout(&self) -> Option<&str> {
        match self.data.get("layout") {
            Some(JsonValue::String(layout)) => Some(layout.as_str()),
            Some(JsonValue::Bool(false)) => None,
            _ if self.kind == PageKind::Template => None,
            _ if self.is_article() => Some("article"),
            _ => Some("page"),
        }
    }

    /// Returns `false` when frontmatter asks for the body to skip
    /// templating (`templateEngineOverride: md`).
    pub fn uses_template_engine(&self) -> bool {
        !matches!(
            self.data.get("templateEngineOverride"),
            Some(JsonValue::String(engine)) if engine == "md"
        )
    }

    /// The `page` object exposed to templates.
    pub fn page_context(&self) -> JsonValue {
        json!({
            "url": self.url,
            "inputPath": self.input_path,
            "outputPath": self.output_path,
            "date": self.date.to_rfc3339(),
        })
    }

    /// The entry exposed in `collections.articles`: frontmatter plus
    /// `url`, `date` and `chain`.
    pub fn summary(&self) -> JsonValue {
        let mut summary = self.data.clone();
        _ = summary.insert("url".to_string(), json!(self.url));
        _ = summary.insert("date".to_string(), json!(self.date.to_rfc3339()));
        _ = summary.insert("page".to_string(), self.page_context());
        if let Some(chain) = &self.chain {
            _ = summary.insert("chain".to_string(), json!(chain));
        }
        JsonValue::Object(summary)
    }
}

/// Walks `input_dir` and loads every page.
///
/// Pages come back in path order; use [`articles_collection`] for the date
/// ordering of articles.
pub fn discover_pages(
    input_dir: &Path,
    processor: &MarkdownProcessor,
    chains: &ChainSet,
) -> Result<Vec<Page>> {
    let mut pages = Vec::new();

    let walker = WalkDir::new(input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_private(entry));

    for entry in walker {
        let entry = entry.map_err(|e| {
            ChainPressError::content_processing_error(
                format!("Failed to walk {}", input_dir.display()),
                Some(Box::new(e)),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let kind = match entry.path().extension().and_then(|e| e.to_str()) {
            Some("md") => PageKind::Markdown,
            Some("hbs") => PageKind::Template,
            _ => continue,
        };

        pages.push(load_page(entry.path(), input_dir, kind, processor, chains)?);
    }

    debug!("Discovered {} pages in {}", pages.len(), input_dir.display());
    Ok(pages)
}

/// Articles, newest first. Articles sharing a date keep discovery order.
pub fn articles_collection(pages: &[Page]) -> Vec<&Page> {
    let mut articles: Vec<&Page> =
        pages.iter().filter(|page| page.is_article()).collect();
    articles.sort_by(|a, b| newest_first(a, b));
    articles
}

fn newest_first(a: &Page, b: &Page) -> Ordering {
    b.date.cmp(&a.date)
}

fn load_page(
    path: &Path,
    input_dir: &Path,
    kind: PageKind,
    processor: &MarkdownProcessor,
    chains: &ChainSet,
) -> Result<Page> {
    let source = fs::read_to_string(path)
        .map_err(|e| ChainPressError::io_error(path.to_path_buf(), e))?;
    let document = processor.parse_document(&source).map_err(|e| {
        ChainPressError::content_processing_error(
            format!("{}: {}", path.display(), e),
            Some(Box::new(e)),
        )
    })?;

    let relative = path.strip_prefix(input_dir).map_err(|e| {
        ChainPressError::content_processing_error(
            format!("Failed to determine relative path: {}", e),
            None,
        )
    })?;

    let (output_path, url) = match document.data.get("permalink") {
        Some(JsonValue::String(permalink)) => permalink_target(permalink),
        _ => default_target(relative),
    };

    let date = document
        .data
        .get("date")
        .and_then(parse_date)
        .or_else(|| modified_time(path))
        .unwrap_or_else(Utc::now);

    let is_article = kind == PageKind::Markdown
        && relative
            .components()
            .next()
            .is_some_and(|first| first.as_os_str() == ARTICLES_SEGMENT);
    let chain = is_article.then(|| chains.classify(relative).to_string());

    Ok(Page {
        input_path: path.to_path_buf(),
        output_path,
        url,
        date,
        data: document.data,
        body: document.body,
        kind,
        chain,
    })
}

fn default_target(relative: &Path) -> (PathBuf, String) {
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let dir = if stem == "index" {
        parent.to_path_buf()
    } else {
        parent.join(stem)
    };

    let mut url = String::from("/");
    for component in dir.components() {
        url.push_str(&component.as_os_str().to_string_lossy());
        url.push('/');
    }

    (dir.join("index.html"), url)
}

fn permalink_target(permalink: &str) -> (PathBuf, String) {
    let trimmed = permalink.trim_start_matches('/');
    let output_path = if trimmed.is_empty() || trimmed.ends_with('/') {
        PathBuf::from(trimmed).join("index.html")
    } else {
        PathBuf::from(trimmed)
    };
    (output_path, format!("/{}", trimmed))
}

fn is_private(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('_'))
}
