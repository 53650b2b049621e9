// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Author lookup.
//!
//! The author data file is a JSON array of records, each with an `id` and
//! any number of extra fields (name, avatar, bio, links). The registry is
//! built once at startup and shared with the template helpers.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{ChainPressError, Result};

/// One author record. Fields other than `id` are kept as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    /// Identifier referenced from article frontmatter.
    pub id: String,
    /// Every other field of the record.
    #[serde(flatten)]
    pub fields: Map<String, JsonValue>,
}

impl Author {
    /// Returns a string field such as `name`, if present.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(JsonValue::as_str)
    }
}

/// Id to author map.
#[derive(Debug, Clone, Default)]
pub struct AuthorRegistry {
    by_id: HashMap<String, Author>,
}

impl AuthorRegistry {
    /// Builds a registry from records. A later record replaces an earlier
    /// one with the same id.
    pub fn from_authors<I: IntoIterator<Item = Author>>(authors: I) -> Self {
        let by_id = authors
            .into_iter()
            .map(|author| (author.id.clone(), author))
            .collect();
        Self { by_id }
    }

    /// Parses a JSON array of author records.
    pub fn from_json(json: &str) -> Result<Self> {
        let authors: Vec<Author> =
            serde_json::from_str(json).map_err(|e| {
                ChainPressError::content_processing_error(
                    "Failed to parse author data",
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self::from_authors(authors))
    }

    /// Reads and parses the author data file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ChainPressError::io_error(path.to_path_buf(), e))?;
        let registry = Self::from_json(&json)?;
        debug!(
            "Loaded {} authors from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Looks up one author. Empty and unknown ids give `None`.
    pub fn resolve_author(&self, id: &str) -> Option<&Author> {
        if id.is_empty() {
            return None;
        }
        self.by_id.get(id)
    }

    /// Looks up several authors, keeping input order and silently dropping
    /// unknown ids.
    pub fn resolve_authors<S: AsRef<str>>(&self, ids: &[S]) -> Vec<&Author> {
        ids.iter()
            .filter_map(|id| self.resolve_author(id.as_ref()))
            .collect()
    }

    /// Number of distinct author ids.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Returns `true` when no authors are loaded.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
