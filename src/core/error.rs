// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Error Handling for ChainPress
//!
//! This module defines the error type shared by every stage of a ChainPress
//! build. The `thiserror` crate is used to derive the `Display` and `Error`
//! implementations.
//!
//! Template filters never surface these errors: they degrade to empty or
//! pass-through values instead. Everything else (configuration, CSS build,
//! page rendering, file output) propagates a `ChainPressError` and aborts
//! the build.

use std::path::PathBuf;
use thiserror::Error;

/// A unified result type for the ChainPress library.
pub type Result<T> = std::result::Result<T, ChainPressError>;

/// The main error type for ChainPress, encompassing all potential error cases.
#[derive(Error, Debug)]
pub enum ChainPressError {
    /// Error related to configuration loading or validation.
    #[error("Configuration error: {message}.")]
    ConfigError {
        /// Detailed description of the configuration error.
        message: String,
        /// Optional path of the file or directory that caused the error.
        path: Option<PathBuf>,
    },

    /// Error encountered while reading frontmatter, markdown or author data.
    #[error("Content processing error: {message}.")]
    ContentProcessingError {
        /// Detailed description of the content processing error.
        message: String,
        /// Optional source error providing additional context, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error in HTML output generation.
    #[error("Output generation error: {message} at {path:?}.")]
    OutputGenerationError {
        /// Description of the output generation error.
        message: String,
        /// Path associated with the error.
        path: PathBuf,
        /// Optional source error providing additional context, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error related to template registration or rendering.
    #[error(
        "Template rendering error: {message} in template `{template}`."
    )]
    TemplateRenderingError {
        /// Description of the template rendering error.
        message: String,
        /// The specific template file or identifier associated with the error.
        template: String,
        /// Optional source error providing additional context, if available.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error raised by the CSS build step.
    #[error("Stylesheet build error: {message} for `{path:?}`.")]
    StylesheetError {
        /// Description of the stylesheet error.
        message: String,
        /// The stylesheet path being processed.
        path: PathBuf,
    },

    /// IO error encountered during file operations.
    #[error("File IO error at `{path:?}`: {source}")]
    IOError {
        /// Path associated with the IO error.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// General internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for ChainPressError {
    /// Converts a standard IO error into a `ChainPressError::IOError`
    /// with an empty path.
    fn from(source: std::io::Error) -> Self {
        ChainPressError::IOError {
            path: PathBuf::new(),
            source,
        }
    }
}

impl ChainPressError {
    /// Creates a `ConfigError` with a specific message.
    ///
    /// # Parameters
    /// - `message`: A description of the configuration error.
    /// - `path`: Optional path of the file causing the error.
    pub fn config_error<S: Into<String>>(
        message: S,
        path: Option<PathBuf>,
    ) -> Self {
        ChainPressError::ConfigError {
            message: message.into(),
            path,
        }
    }

    /// Creates a `ContentProcessingError` with a specific message and optional source.
    pub fn content_processing_error<S: Into<String>>(
        message: S,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ChainPressError::ContentProcessingError {
            message: message.into(),
            source,
        }
    }

    /// Creates an `OutputGenerationError` with a specific message, path, and optional source.
    pub fn output_generation_error<S: Into<String>>(
        message: S,
        path: PathBuf,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ChainPressError::OutputGenerationError {
            message: message.into(),
            path,
            source,
        }
    }

    /// Creates a `TemplateRenderingError` with a message, template name, and optional source.
    pub fn template_rendering_error<S: Into<String>>(
        message: S,
        template: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ChainPressError::TemplateRenderingError {
            message: message.into(),
            template,
            source,
        }
    }

    /// Creates a `StylesheetError` for the given stylesheet path.
    pub fn stylesheet_error<S: Into<String>>(
        message: S,
        path: PathBuf,
    ) -> Self {
        ChainPressError::StylesheetError {
            message: message.into(),
            path,
        }
    }

    /// Wraps an IO error as an `IOError` variant with the specified path.
    ///
    /// # Parameters
    /// - `path`: The file path associated with the IO error.
    /// - `source`: The original IO error.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        ChainPressError::IOError { path, source }
    }

    /// Creates a general internal error with a custom message.
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        ChainPressError::InternalError(message.into())
    }
}
