// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Core Traits Module
//!
//! The seams of a ChainPress build:
//!
//! - [`Transform`]: a single content transformation (markdown to HTML, a
//!   stylesheet processor, a minifier)
//! - [`Generator`]: writes rendered output to disk
//! - [`BuildHook`]: work that must finish before any page is rendered

use std::path::Path;

use crate::core::config::Config;
use crate::core::error::Result;

/// Trait for implementing content transformation operations.
///
/// # Type Parameters
///
/// * `Input`: The input type for the transformation
/// * `Output`: The output type produced by the transformation
pub trait Transform: Send + Sync + std::fmt::Debug {
    /// The type of input content for the transformation
    type Input;
    /// The type of output content produced by the transformation
    type Output;

    /// Transforms the input content into the output format.
    fn transform(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Trait for implementing output generation.
pub trait Generator: Send + Sync + std::fmt::Debug {
    /// Writes `content` to `path`, creating parent directories as needed.
    fn generate(&self, content: &str, path: &Path) -> Result<()>;

    /// Validates the target path without writing anything.
    fn validate(&self, path: &Path) -> Result<()>;
}

/// A step run once at the start of every build, before templating.
///
/// Hooks run in registration order and an error aborts the build.
pub trait BuildHook: Send + Sync + std::fmt::Debug {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Runs the hook against the active configuration.
    fn before_build(&self, config: &Config) -> Result<()>;
}
