// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # HTML Output Generation
//!
//! Writes rendered pages to disk. In the production profile `.html` and
//! `.htm` pages are minified with `minify-html`; other outputs such as
//! feeds are written as rendered.
//!
//! # Examples
//!
//! ```rust,no_run
//! use chainpress::core::traits::Generator;
//! use chainpress::generators::html::HtmlGenerator;
//! use std::path::PathBuf;
//!
//! let generator = HtmlGenerator::new().with_minification(true);
//!
//! generator
//!     .generate(
//!         "<html><body>Hello World</body></html>",
//!         &PathBuf::from("_site/index.html"),
//!     )
//!     .unwrap();
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use minify_html::{minify, Cfg};
use serde::{Deserialize, Serialize};

use crate::core::error::{ChainPressError, Result};
use crate::core::traits::Generator;

/// Options for HTML output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Controls HTML minification, including inline CSS and JS.
    pub minify: bool,
}

/// Writes HTML pages.
#[derive(Debug, Default, Clone)]
pub struct HtmlGenerator {
    config: OutputConfig,
}

impl HtmlGenerator {
    /// Creates a generator that writes pages unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables HTML minification.
    pub fn with_minification(mut self, enable: bool) -> Self {
        self.config.minify = enable;
        self
    }

    /// Returns the active options.
    pub fn config(&self) -> OutputConfig {
        self.config
    }

    /// Applies the configured optimisation to `content`.
    pub fn process_html(&self, content: &str) -> Result<String> {
        if !self.config.minify {
            return Ok(content.to_string());
        }
        minify_html(content)
    }
}

/// Minifies HTML content using the `minify-html` crate.
fn minify_html(content: &str) -> Result<String> {
    let cfg = Cfg {
        minify_css: true,
        minify_js: true,
        ..Cfg::default()
    };
    String::from_utf8(minify(content.as_bytes(), &cfg)).map_err(|e| {
        ChainPressError::content_processing_error(
            "HTML minification failed",
            Some(Box::new(e)),
        )
    })
}

/// Only `.html` and `.htm` outputs go through the minifier.
fn is_html(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm")
        })
}

impl Generator for HtmlGenerator {
    fn generate(&self, content: &str, path: &Path) -> Result<()> {
        self.validate(path)?;
        let processed = if is_html(path) {
            self.process_html(content)?
        } else {
            content.to_string()
        };

        let file = File::create(path)
            .map_err(|e| ChainPressError::io_error(path.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(processed.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|e| ChainPressError::io_error(path.to_path_buf(), e))?;

        debug!("Wrote {} ({} bytes)", path.display(), processed.len());
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ChainPressError::io_error(parent.to_path_buf(), e)
                })?;
            }
        }
        Ok(())
    }
}
