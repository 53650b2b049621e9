// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Verbatim copies of static files (author avatars, favicons) into the
//! output directory.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::core::config::PassthroughCopy;
use crate::core::error::{ChainPressError, Result};

/// Copies every entry under `output_dir` and returns the number of files
/// written. Missing sources are skipped with a warning.
pub fn copy_passthrough(
    entries: &[PassthroughCopy],
    output_dir: &Path,
) -> Result<usize> {
    let mut copied = 0;

    for entry in entries {
        let target = output_dir.join(&entry.to);

        if entry.from.is_file() {
            copy_file(&entry.from, &target)?;
            copied += 1;
        } else if entry.from.is_dir() {
            for file in WalkDir::new(&entry.from) {
                let file = file.map_err(|e| {
                    ChainPressError::content_processing_error(
                        format!("Failed to walk {}", entry.from.display()),
                        Some(Box::new(e)),
                    )
                })?;
                if !file.file_type().is_file() {
                    continue;
                }
                let relative =
                    file.path().strip_prefix(&entry.from).map_err(|e| {
                        ChainPressError::internal_error(e.to_string())
                    })?;
                copy_file(file.path(), &target.join(relative))?;
                copied += 1;
            }
        } else {
            warn!(
                "Passthrough source {} not found, skipping",
                entry.from.display()
            );
        }
    }

    debug!("Copied {} passthrough files", copied);
    Ok(copied)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ChainPressError::io_error(parent.to_path_buf(), e))?;
    }
    let _ = fs::copy(from, to)
        .map_err(|e| ChainPressError::io_error(from.to_path_buf(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copies_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src/assets/authors/team")).unwrap();
        fs::write(root.join("src/assets/authors/satoshi.png"), "png").unwrap();
        fs::write(root.join("src/assets/authors/team/vitalik.png"), "png")
            .unwrap();
        fs::write(root.join("src/assets/favicon.svg"), "<svg/>").unwrap();

        let entries = [
            PassthroughCopy::new(
                root.join("src/assets/authors"),
                "assets/authors",
            ),
            PassthroughCopy::new(
                root.join("src/assets/favicon.svg"),
                "assets/favicon.svg",
            ),
            PassthroughCopy::new(
                root.join("src/assets/favicon-dark.svg"),
                "assets/favicon-dark.svg",
            ),
        ];

        let out = root.join("_site");
        assert_eq!(copy_passthrough(&entries, &out).unwrap(), 3);
        assert!(out.join("assets/authors/satoshi.png").is_file());
        assert!(out.join("assets/authors/team/vitalik.png").is_file());
        assert_eq!(
            fs::read_to_string(out.join("assets/favicon.svg")).unwrap(),
            "<svg/>"
        );
        assert!(!out.join("assets/favicon-dark.svg").exists());
    }
}
