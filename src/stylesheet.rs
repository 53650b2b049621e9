// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Stylesheet Build
//!
//! Builds the site stylesheet before any page is rendered:
//!
//! 1. read the source stylesheet,
//! 2. pipe it through the utility-class processor, if one is configured,
//! 3. minify it in production,
//! 4. write it, plus a version 3 source map when enabled.
//!
//! The processor is an external command: the stylesheet goes to its stdin
//! and its stdout is taken as the result. Minification uses the CSS
//! minifier bundled with `minify-html`.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use log::{debug, info};
use minify_html::{minify, Cfg};
use serde::Serialize;

use crate::core::config::{Config, StylesheetConfig};
use crate::core::error::{ChainPressError, Result};
use crate::core::traits::{BuildHook, Transform};

const STYLE_OPEN: &str = "<style>";
const STYLE_CLOSE: &str = "</style>";

/// What a stylesheet build wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssBuildReport {
    /// The compiled stylesheet.
    pub output: PathBuf,
    /// The source map, when one was written.
    pub source_map: Option<PathBuf>,
    /// Size of the compiled stylesheet in bytes.
    pub bytes: usize,
    /// Whether the stylesheet was minified.
    pub minified: bool,
}

/// Runs an external utility-class processor over a stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProcessor {
    program: String,
    args: Vec<String>,
}

impl CommandProcessor {
    /// Builds a processor from an argv list. Returns `None` when `argv` is
    /// empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl Transform for CommandProcessor {
    type Input = String;
    type Output = String;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let failed = |message: String| {
            ChainPressError::stylesheet_error(
                message,
                PathBuf::from(&self.program),
            )
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(format!("Failed to start processor: {}", e)))?;

        // Stdin is fed from its own thread so a child that writes before it
        // has read everything cannot fill the stdout pipe and stall us.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let output = child.wait_with_output().map_err(|e| {
            failed(format!("Failed to read processor output: {}", e))
        })?;
        let written = match writer {
            Some(handle) => handle.join().map_err(|_| {
                failed("Processor input thread panicked".to_string())
            })?,
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(failed(format!(
                "Processor exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written.map_err(|e| {
            failed(format!("Failed to write to processor: {}", e))
        })?;

        String::from_utf8(output.stdout).map_err(|e| {
            failed(format!("Processor output is not UTF-8: {}", e))
        })
    }
}

/// Minifies CSS with `minify-html`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssMinifier;

impl Transform for CssMinifier {
    type Input = String;
    type Output = String;

    fn transform(&self, input: Self::Input) -> Result<Self::Output> {
        let cfg = Cfg {
            minify_css: true,
            ..Cfg::default()
        };

        let wrapped = format!("{}{}{}", STYLE_OPEN, input, STYLE_CLOSE);
        let minified = String::from_utf8(minify(wrapped.as_bytes(), &cfg))
            .map_err(|e| {
                ChainPressError::content_processing_error(
                    "CSS minification produced invalid UTF-8",
                    Some(Box::new(e)),
                )
            })?;

        if minified.is_empty() {
            return Ok(minified);
        }

        minified
            .strip_prefix(STYLE_OPEN)
            .and_then(|css| css.strip_suffix(STYLE_CLOSE))
            .map(str::to_string)
            .ok_or_else(|| {
                ChainPressError::internal_error(
                    "CSS minifier did not return a style element",
                )
            })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'a> {
    version: u8,
    file: String,
    sources: [String; 1],
    sources_content: [&'a str; 1],
    names: [&'a str; 0],
    mappings: &'a str,
}

/// Builds the stylesheet described by `config`.
///
/// Fails if the source cannot be read, the processor fails, or the output
/// cannot be written.
pub fn build_css(
    config: &StylesheetConfig,
    production: bool,
) -> Result<CssBuildReport> {
    let source = fs::read_to_string(&config.input)
        .map_err(|e| ChainPressError::io_error(config.input.clone(), e))?;

    let mut css = match CommandProcessor::from_argv(&config.processor_command)
    {
        Some(processor) => {
            debug!("Running CSS processor {:?}", processor.program);
            processor.transform(source.clone()).map_err(|e| match e {
                ChainPressError::StylesheetError { message, .. } => {
                    ChainPressError::stylesheet_error(
                        message,
                        config.input.clone(),
                    )
                }
                other => other,
            })?
        }
        None => source.clone(),
    };

    if production {
        css = CssMinifier.transform(css)?;
    }

    if let Some(parent) = config.output.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| ChainPressError::io_error(parent.to_path_buf(), e))?;
    }

    let source_map = if config.source_map {
        let map_path = source_map_path(&config.output);
        write_source_map(&map_path, &config.output, &config.input, &source)?;
        if let Some(name) = map_path.file_name().and_then(|n| n.to_str()) {
            css.push_str(&format!("\n/*# sourceMappingURL={} */\n", name));
        }
        Some(map_path)
    } else {
        None
    };

    fs::write(&config.output, &css)
        .map_err(|e| ChainPressError::io_error(config.output.clone(), e))?;

    info!("Built CSS -> {}", display_relative(&config.output));

    Ok(CssBuildReport {
        output: config.output.clone(),
        source_map,
        bytes: css.len(),
        minified: production,
    })
}

/// Runs [`build_css`] as the first step of every site build.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesheetHook;

impl BuildHook for StylesheetHook {
    fn name(&self) -> &str {
        "build-css"
    }

    fn before_build(&self, config: &Config) -> Result<()> {
        let _ = build_css(&config.css, config.profile.is_production())?;
        Ok(())
    }
}

fn source_map_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

fn write_source_map(
    map_path: &Path,
    output: &Path,
    input: &Path,
    source: &str,
) -> Result<()> {
    let map = SourceMap {
        version: 3,
        file: output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        sources: [input.to_string_lossy().into_owned()],
        sources_content: [source],
        names: [],
        mappings: "",
    };

    let json = serde_json::to_string(&map).map_err(|e| {
        ChainPressError::internal_error(format!(
            "Failed to serialise source map: {}",
            e
        ))
    })?;
    fs::write(map_path, json)
        .map_err(|e| ChainPressError::io_error(map_path.to_path_buf(), e))
}

fn display_relative(path: &Path) -> String {
    env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;
    use tempfile::TempDir;

    const SOURCE: &str = "body {\n    color: red;\n}\n\n.card {\n    margin: 0px;\n}\n";

    fn config_in(dir: &Path) -> StylesheetConfig {
        let input = dir.join("src/assets/css/main.css");
        fs::create_dir_all(input.parent().unwrap()).unwrap();
        fs::write(&input, SOURCE).unwrap();
        StylesheetConfig {
            input,
            output: dir.join("_site/assets/css/main.css"),
            source_map: false,
            processor_command: Vec::new(),
        }
    }

    #[test]
    fn test_development_build_passes_through() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let report = build_css(&config, false).unwrap();
        assert_eq!(fs::read_to_string(&report.output).unwrap(), SOURCE);
        assert_eq!(report.bytes, SOURCE.len());
        assert!(!report.minified);
        assert!(report.source_map.is_none());
    }

    #[test]
    fn test_production_build_minifies() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let report = build_css(&config, true).unwrap();
        let css = fs::read_to_string(&report.output).unwrap();
        assert!(report.minified);
        assert!(css.len() < SOURCE.len());
        assert!(!css.contains('\n'));
        assert!(css.contains("color:red"));
    }

    #[test]
    fn test_source_map_written() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.source_map = true;

        let report = build_css(&config, false).unwrap();
        let map_path = report.source_map.unwrap();
        assert!(map_path.ends_with("main.css.map"));

        let map: JsonValue =
            serde_json::from_str(&fs::read_to_string(map_path).unwrap())
                .unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["file"], "main.css");
        assert_eq!(map["sourcesContent"][0], SOURCE);

        let css = fs::read_to_string(&report.output).unwrap();
        assert!(css.ends_with("/*# sourceMappingURL=main.css.map */\n"));
    }

    #[test]
    fn test_missing_source_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.input = temp_dir.path().join("missing.css");

        let err = build_css(&config, false).unwrap_err();
        assert!(matches!(err, ChainPressError::IOError { .. }));
        assert!(!config.output.exists());
    }

    #[test]
    fn test_command_processor_from_argv() {
        assert!(CommandProcessor::from_argv(&[]).is_none());
        let processor = CommandProcessor::from_argv(&[
            "tailwindcss".to_string(),
            "--input".to_string(),
            "-".to_string(),
        ])
        .unwrap();
        assert_eq!(processor.program, "tailwindcss");
        assert_eq!(processor.args, ["--input", "-"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_processor_pipes_stdin() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.processor_command =
            vec!["tr".to_string(), "a-z".to_string(), "A-Z".to_string()];

        let report = build_css(&config, false).unwrap();
        let css = fs::read_to_string(report.output).unwrap();
        assert_eq!(css, SOURCE.to_uppercase());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_processor_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.processor_command = vec!["false".to_string()];

        let err = build_css(&config, false).unwrap_err();
        assert!(matches!(err, ChainPressError::StylesheetError { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stylesheet_through_processor() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        let rule = ".card-0123456789 {\n    margin: 0px;\n}\n";
        let large = rule.repeat(1_200_000 / rule.len() + 1);
        fs::write(&config.input, &large).unwrap();
        config.processor_command = vec!["cat".to_string()];

        let report = build_css(&config, false).unwrap();
        assert!(report.bytes > 1_000_000);
        assert_eq!(fs::read_to_string(report.output).unwrap(), large);
    }

    #[cfg(unix)]
    #[test]
    fn test_processor_error_names_stylesheet_once() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(temp_dir.path());
        config.processor_command = vec!["false".to_string()];

        let message = build_css(&config, false).unwrap_err().to_string();
        assert_eq!(message.matches("Stylesheet build error").count(), 1);
        assert!(message.contains("main.css"));
    }

    #[test]
    fn test_hook_uses_profile() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.css = config_in(temp_dir.path());
        config.profile = crate::core::config::Profile::Production;

        StylesheetHook.before_build(&config).unwrap();
        let css = fs::read_to_string(&config.css.output).unwrap();
        assert!(!css.contains('\n'));
        assert_eq!(StylesheetHook.name(), "build-css");
    }
}
