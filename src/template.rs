// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Template Rendering Module
//!
//! Handlebars rendering for layouts, `.hbs` pages and markdown bodies.
//!
//! ## Features
//!
//! - Every `*.hbs` file in the includes directory is registered under its
//!   file stem, so it works both as a layout and as a partial.
//! - The site filters are registered as helpers that return values, so they
//!   can be used directly (`{{formatDateOnly date}}`) or as subexpressions
//!   (`{{#each (resolveAuthors authors)}}`).
//!
//! | Helper | Result |
//! |--------|--------|
//! | `resolveAuthor id` | author object, or nothing |
//! | `resolveAuthors ids` | array of known authors |
//! | `formatDateOnly date` | `Jan 05, 2024` |
//! | `fileLastModified path` | RFC 3339 timestamp, or `""` |
//! | `addHeadingIds html` | html with unique heading ids |
//! | `extractTocHeadings html` | array of `{id, text, level}` |

use crate::core::error::{ChainPressError, Result};
use crate::filters::{file_last_modified, format_date_only, AuthorRegistry};
use crate::headings::{add_heading_ids, extract_toc_headings};
use crate::TemplateRenderer;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError,
    ScopedJson,
};
use log::{debug, warn};
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A template helper computing a value from its positional parameters.
///
/// Helpers never fail: missing or unusable parameters give an empty value.
pub trait TemplateHelper: Send + Sync + std::fmt::Debug {
    /// Computes the helper's value.
    fn execute(&self, params: &[&JsonValue]) -> JsonValue;

    /// Returns the name of the helper for registration.
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct HelperAdapter<H>(H);

impl<H: TemplateHelper> HelperDef for HelperAdapter<H> {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> std::result::Result<ScopedJson<'rc>, RenderError> {
        let params: Vec<&JsonValue> =
            h.params().iter().map(|p| p.value()).collect();
        Ok(ScopedJson::Derived(self.0.execute(&params)))
    }
}

/// Renderer for Handlebars templates with the site helpers installed.
#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<RwLock<Handlebars<'static>>>, // Handlebars engine
    template_dir: PathBuf,                    // Directory for templates
    templates: Arc<RwLock<HashSet<String>>>,  // Names of loaded templates
}

impl std::fmt::Debug for HandlebarsRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlebarsRenderer")
            .field("template_dir", &self.template_dir)
            .field("templates", &self.templates.read().len())
            .finish()
    }
}

impl HandlebarsRenderer {
    /// Creates a renderer, installs the site helpers and loads every
    /// template found in `template_dir`.
    ///
    /// A missing template directory is not an error: the site simply has
    /// no layouts.
    pub fn new(
        template_dir: &Path,
        authors: Arc<AuthorRegistry>,
    ) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_dev_mode(cfg!(debug_assertions));
        handlebars.register_escape_fn(handlebars::html_escape);

        let renderer = Self {
            engine: Arc::new(RwLock::new(handlebars)),
            template_dir: template_dir.to_path_buf(),
            templates: Arc::new(RwLock::new(HashSet::new())),
        };

        let renderer = renderer
            .with_helper(helpers::ResolveAuthor(Arc::clone(&authors)))
            .with_helper(helpers::ResolveAuthors(authors))
            .with_helper(helpers::FormatDateOnly)
            .with_helper(helpers::FileLastModified)
            .with_helper(helpers::AddHeadingIds)
            .with_helper(helpers::ExtractTocHeadings);

        renderer.load_templates()?;
        Ok(renderer)
    }

    /// Registers a helper under its own name.
    pub fn with_helper<H>(self, helper: H) -> Self
    where
        H: TemplateHelper + 'static,
    {
        let name = helper.name().to_string();
        self.engine
            .write()
            .register_helper(&name, Box::new(HelperAdapter(helper)));
        self
    }

    /// Registers a template from a string, replacing any template of the
    /// same name.
    pub fn register_template(&self, name: &str, source: &str) -> Result<()> {
        self.engine
            .write()
            .register_template_string(name, source)
            .map_err(|e| {
                ChainPressError::template_rendering_error(
                    format!("Failed to register template: {}", e),
                    name.to_string(),
                    Some(Box::new(e)),
                )
            })?;
        _ = self.templates.write().insert(name.to_string());
        Ok(())
    }

    /// Returns `true` if a template called `name` is loaded.
    pub fn has_template(&self, name: &str) -> bool {
        self.templates.read().contains(name)
    }

    /// Renders a one-off template source, such as a page body. `name` only
    /// appears in error messages.
    pub fn render_source(
        &self,
        name: &str,
        source: &str,
        context: &JsonValue,
    ) -> Result<String> {
        self.engine.read().render_template(source, context).map_err(|e| {
            ChainPressError::template_rendering_error(
                format!("Template rendering failed: {}", e),
                name.to_string(),
                Some(Box::new(e)),
            )
        })
    }

    /// Loads templates from the directory.
    fn load_templates(&self) -> Result<()> {
        if !self.template_dir.is_dir() {
            warn!(
                "Template directory {} not found, no layouts loaded",
                self.template_dir.display()
            );
            return Ok(());
        }

        let entries = fs::read_dir(&self.template_dir).map_err(|e| {
            ChainPressError::io_error(self.template_dir.clone(), e)
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| {
                    ChainPressError::io_error(self.template_dir.clone(), e)
                })?
                .path();

            if !path.is_file()
                || path.extension().and_then(|s| s.to_str()) != Some("hbs")
            {
                continue;
            }

            let template_name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    ChainPressError::template_rendering_error(
                        "Invalid template filename",
                        path.display().to_string(),
                        None,
                    )
                })?;

            let template_content = fs::read_to_string(&path)
                .map_err(|e| ChainPressError::io_error(path.clone(), e))?;

            self.register_template(template_name, &template_content)?;
            debug!("Registered template '{}'", template_name);
        }
        Ok(())
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, template: &str, context: &JsonValue) -> Result<String> {
        self.engine.read().render(template, context).map_err(|e| {
            ChainPressError::template_rendering_error(
                format!("Template rendering failed: {}", e),
                template.to_string(),
                Some(Box::new(e)),
            )
        })
    }

    fn validate(&self, template: &str, _context: &JsonValue) -> Result<()> {
        if !self.has_template(template) {
            return Err(ChainPressError::template_rendering_error(
                format!("Template '{}' not found", template),
                template.to_string(),
                None,
            ));
        }
        Ok(())
    }
}

/// Helpers installed on every [`HandlebarsRenderer`].
pub mod helpers {
    use super::*;

    fn first_str<'a>(params: &[&'a JsonValue]) -> Option<&'a str> {
        params.first().and_then(|p| p.as_str())
    }

    /// `resolveAuthor id`: the author record, or `null`.
    #[derive(Debug, Clone)]
    pub struct ResolveAuthor(pub Arc<AuthorRegistry>);

    impl TemplateHelper for ResolveAuthor {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            first_str(params)
                .and_then(|id| self.0.resolve_author(id))
                .map_or(JsonValue::Null, |author| json!(author))
        }

        fn name(&self) -> &str {
            "resolveAuthor"
        }
    }

    /// `resolveAuthors ids`: known authors in the order given. A single id
    /// is treated as a one-element list.
    #[derive(Debug, Clone)]
    pub struct ResolveAuthors(pub Arc<AuthorRegistry>);

    impl TemplateHelper for ResolveAuthors {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            let ids: Vec<&str> = match params.first() {
                Some(JsonValue::Array(ids)) => {
                    ids.iter().filter_map(JsonValue::as_str).collect()
                }
                Some(JsonValue::String(id)) => vec![id.as_str()],
                _ => Vec::new(),
            };
            json!(self.0.resolve_authors(&ids))
        }

        fn name(&self) -> &str {
            "resolveAuthors"
        }
    }

    /// `formatDateOnly date`.
    #[derive(Debug, Clone, Copy)]
    pub struct FormatDateOnly;

    impl TemplateHelper for FormatDateOnly {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            let value = params.first().copied().unwrap_or(&JsonValue::Null);
            JsonValue::String(format_date_only(value))
        }

        fn name(&self) -> &str {
            "formatDateOnly"
        }
    }

    /// `fileLastModified path`.
    #[derive(Debug, Clone, Copy)]
    pub struct FileLastModified;

    impl TemplateHelper for FileLastModified {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            JsonValue::String(
                first_str(params)
                    .map(file_last_modified)
                    .unwrap_or_default(),
            )
        }

        fn name(&self) -> &str {
            "fileLastModified"
        }
    }

    /// `addHeadingIds html`.
    #[derive(Debug, Clone, Copy)]
    pub struct AddHeadingIds;

    impl TemplateHelper for AddHeadingIds {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            JsonValue::String(
                first_str(params).map(add_heading_ids).unwrap_or_default(),
            )
        }

        fn name(&self) -> &str {
            "addHeadingIds"
        }
    }

    /// `extractTocHeadings html`.
    #[derive(Debug, Clone, Copy)]
    pub struct ExtractTocHeadings;

    impl TemplateHelper for ExtractTocHeadings {
        fn execute(&self, params: &[&JsonValue]) -> JsonValue {
            json!(first_str(params)
                .map(extract_toc_headings)
                .unwrap_or_default())
        }

        fn name(&self) -> &str {
            "extractTocHeadings"
        }
    }
}
