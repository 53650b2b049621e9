// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Configuration Module
//!
//! Provides configuration management for a ChainPress build. Settings come
//! from three layers, applied in order:
//!
//! 1. an optional TOML file (`chainpress.toml` by convention),
//! 2. environment variables carrying a prefix (`CHAINPRESS_` by convention),
//!    where a double underscore separates a section from its key
//!    (`CHAINPRESS_CSS__SOURCE_MAP=true` sets `css.source_map`),
//! 3. explicit overrides given to the [`ConfigBuilder`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use chainpress::core::config::{ConfigBuilder, Profile};
//! use std::path::Path;
//!
//! let config = ConfigBuilder::new()
//!     .with_file(Path::new("chainpress.toml"))
//!     .with_env_prefix("CHAINPRESS_")
//!     .with_profile(Profile::Production)
//!     .build()
//!     .unwrap();
//!
//! assert!(config.profile.is_production());
//! ```

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::Value as TomlValue;

use crate::core::error::{ChainPressError, Result};

/// Default name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "chainpress.toml";

/// Default prefix for environment variable overrides.
pub const DEFAULT_ENV_PREFIX: &str = "CHAINPRESS_";

/// Specifies operational profiles for configuration.
///
/// The production profile turns on CSS and HTML minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development profile, output is left unminified.
    Development,
    /// Staging profile for intermediate testing between development and production.
    Staging,
    /// Production profile with minified output.
    Production,
    /// Custom profile enabling specific user configurations.
    Custom,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Development
    }
}

impl Profile {
    /// Returns `true` when output should be minified.
    pub fn is_production(self) -> bool {
        self == Profile::Production
    }
}

/// The main configuration structure for a ChainPress site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_input_dir")]
    /// Directory holding pages, articles, includes and data.
    pub input_dir: PathBuf,

    #[serde(default = "default_includes_dir")]
    /// Template directory, relative to `input_dir`.
    pub includes_dir: PathBuf,

    #[serde(default = "default_data_dir")]
    /// Data directory, relative to `input_dir`.
    pub data_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    /// Directory receiving the generated site.
    pub output_dir: PathBuf,

    #[serde(default)]
    /// Indicates the current operational profile.
    pub profile: Profile,

    #[serde(default)]
    /// Settings for the CSS build step.
    pub css: StylesheetConfig,

    #[serde(default)]
    /// Settings for content classification, authors and passthrough copies.
    pub site: SiteConfig,

    #[serde(default)]
    /// Holds custom configuration values specified by the user.
    pub custom: HashMap<String, TomlValue>,
}

/// Settings for the CSS build step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesheetConfig {
    #[serde(default = "default_css_input")]
    /// Source stylesheet.
    pub input: PathBuf,

    #[serde(default = "default_css_output")]
    /// Compiled stylesheet location.
    pub output: PathBuf,

    #[serde(default)]
    /// Writes `<output>.map` next to the compiled stylesheet.
    pub source_map: bool,

    #[serde(default)]
    /// External utility-class processor, as an argv list. The stylesheet is
    /// piped through its stdin/stdout. Empty means pass-through.
    pub processor_command: Vec<String>,
}

impl Default for StylesheetConfig {
    fn default() -> Self {
        Self {
            input: default_css_input(),
            output: default_css_output(),
            source_map: false,
            processor_command: Vec::new(),
        }
    }
}

/// A file or directory copied verbatim into the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughCopy {
    /// Source path, relative to the working directory.
    pub from: PathBuf,
    /// Destination, relative to the output directory.
    pub to: PathBuf,
}

impl PassthroughCopy {
    /// Creates a new passthrough mapping.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(from: P, to: Q) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Site-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_chains")]
    /// Chain names recognised as article directory segments.
    pub chains: Vec<String>,

    #[serde(default = "default_authors_file")]
    /// Author data file, relative to the data directory.
    pub authors_file: PathBuf,

    #[serde(default = "default_passthrough")]
    /// Files and directories copied untouched into the output.
    pub passthrough: Vec<PassthroughCopy>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            authors_file: default_authors_file(),
            passthrough: default_passthrough(),
        }
    }
}

/// Builds a `Config` from a file, environment variables and explicit overrides.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<PathBuf>,
    env_prefix: Option<String>,
    profile: Option<Profile>,
    overrides: HashMap<String, TomlValue>,
}

impl ConfigBuilder {
    /// Initialises a new `ConfigBuilder` instance with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a TOML configuration file to the builder.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a prefix for environment variables to override configuration values.
    pub fn with_env_prefix<S: Into<String>>(
        mut self,
        prefix: S,
    ) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Sets the profile, taking precedence over the file value.
    pub fn with_profile<P: Into<Profile>>(
        mut self,
        profile: P,
    ) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Adds a key-value pair to override configuration values.
    ///
    /// Keys are either top-level (`output_dir`) or `section.key`
    /// (`css.source_map`, `site.chains`).
    pub fn with_override<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<TomlValue>,
    {
        _ = self.overrides.insert(key.into(), value.into());
        self
    }

    /// Loads the file, applies environment and explicit overrides, and
    /// validates the result.
    pub fn build(self) -> Result<Config> {
        let mut config = if let Some(path) = self.config_file {
            load_from_file(&path)?
        } else {
            Config::default()
        };

        if let Some(prefix) = self.env_prefix {
            apply_env_overrides(&mut config, &prefix)?;
        }

        apply_overrides(&mut config, &self.overrides)?;

        if let Some(profile) = self.profile {
            config.profile = profile;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }

    /// Absolute-or-relative path of the template directory.
    pub fn includes_path(&self) -> PathBuf {
        self.input_dir.join(&self.includes_dir)
    }

    /// Path of the author data file.
    pub fn authors_path(&self) -> PathBuf {
        self.input_dir
            .join(&self.data_dir)
            .join(&self.site.authors_file)
    }

    /// Retrieves a custom configuration value by key, if it exists.
    pub fn get_custom<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>> {
        self.custom
            .get(key)
            .map(|v| {
                TomlValue::try_into(v.clone()).map_err(|e| {
                    ChainPressError::config_error(
                        format!("Invalid custom config value: {}", e),
                        None,
                    )
                })
            })
            .transpose()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            includes_dir: default_includes_dir(),
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            profile: Profile::default(),
            css: StylesheetConfig::default(),
            site: SiteConfig::default(),
            custom: HashMap::new(),
        }
    }
}

// Internal helper functions

fn load_from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        ChainPressError::config_error(
            format!("Failed to read config file: {}", e),
            Some(path.to_path_buf()),
        )
    })?;

    toml::from_str(&content).map_err(|e| {
        ChainPressError::config_error(
            format!("Failed to parse config file: {}", e),
            Some(path.to_path_buf()),
        )
    })
}

fn apply_env_overrides(
    config: &mut Config,
    prefix: &str,
) -> Result<()> {
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let config_key = stripped
                .trim_start_matches('_')
                .replace("__", ".")
                .to_lowercase();
            apply_config_value(config, &config_key, &value)?;
        }
    }
    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    overrides: &HashMap<String, TomlValue>,
) -> Result<()> {
    for (key, value) in overrides {
        let value = match value {
            TomlValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        apply_config_value(config, key, &value)?;
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.input_dir.exists() && !config.input_dir.is_dir() {
        return Err(ChainPressError::config_error(
            format!(
                "input path is not a directory: {}",
                config.input_dir.display()
            ),
            Some(config.input_dir.clone()),
        ));
    }

    if config.site.chains.iter().any(|c| c.trim().is_empty()) {
        return Err(ChainPressError::config_error(
            "Chain names cannot be empty",
            None,
        ));
    }

    if config.css.input == config.css.output {
        return Err(ChainPressError::config_error(
            "CSS input and output must differ",
            Some(config.css.input.clone()),
        ));
    }

    Ok(())
}

fn apply_config_value(
    config: &mut Config,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "input_dir" => config.input_dir = PathBuf::from(value),
        "includes_dir" => config.includes_dir = PathBuf::from(value),
        "data_dir" => config.data_dir = PathBuf::from(value),
        "output_dir" => config.output_dir = PathBuf::from(value),
        "profile" => {
            config.profile = match value.to_lowercase().as_str() {
                "development" => Profile::Development,
                "staging" => Profile::Staging,
                "production" => Profile::Production,
                _ => Profile::Custom,
            };
        }
        _ => {
            if let Some((section, key)) = key.split_once('.') {
                match section {
                    "css" => {
                        apply_css_value(&mut config.css, key, value)?
                    }
                    "site" => {
                        apply_site_value(&mut config.site, key, value)?
                    }
                    "custom" => {
                        _ = config.custom.insert(
                            key.to_string(),
                            TomlValue::String(value.to_string()),
                        );
                    }
                    _ => {
                        return Err(ChainPressError::config_error(
                            format!(
                                "Unknown configuration section: {}",
                                section
                            ),
                            None,
                        ));
                    }
                }
            } else {
                return Err(ChainPressError::config_error(
                    format!("Unknown configuration key: {}", key),
                    None,
                ));
            }
        }
    }
    Ok(())
}

fn apply_css_value(
    config: &mut StylesheetConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "input" => config.input = PathBuf::from(value),
        "output" => config.output = PathBuf::from(value),
        "source_map" => {
            config.source_map = value.parse().map_err(|e| {
                ChainPressError::config_error(
                    format!("Invalid source_map value '{}': {}", value, e),
                    None,
                )
            })?;
        }
        "processor_command" => {
            config.processor_command =
                value.split_whitespace().map(String::from).collect();
        }
        _ => {
            return Err(ChainPressError::config_error(
                format!("Unknown css key: {}", key),
                None,
            ));
        }
    }
    Ok(())
}

fn apply_site_value(
    config: &mut SiteConfig,
    key: &str,
    value: &str,
) -> Result<()> {
    match key {
        "chains" => {
            config.chains = value
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        "authors_file" => config.authors_file = PathBuf::from(value),
        _ => {
            return Err(ChainPressError::config_error(
                format!("Unknown site key: {}", key),
                None,
            ));
        }
    }
    Ok(())
}

// Default value functions
fn default_input_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_includes_dir() -> PathBuf {
    PathBuf::from("_includes")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("_data")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_css_input() -> PathBuf {
    PathBuf::from("src/assets/css/main.css")
}

fn default_css_output() -> PathBuf {
    PathBuf::from("_site/assets/css/main.css")
}

fn default_chains() -> Vec<String> {
    vec![
        "bitcoin".to_string(),
        "ethereum".to_string(),
        "solana".to_string(),
    ]
}

fn default_authors_file() -> PathBuf {
    PathBuf::from("authors.json")
}

fn default_passthrough() -> Vec<PassthroughCopy> {
    vec![
        PassthroughCopy::new("src/assets/authors", "assets/authors"),
        PassthroughCopy::new(
            "src/assets/favicon.svg",
            "assets/favicon.svg",
        ),
        PassthroughCopy::new(
            "src/assets/favicon-light.svg",
            "assets/favicon-light.svg",
        ),
        PassthroughCopy::new(
            "src/assets/favicon-dark.svg",
            "assets/favicon-dark.svg",
        ),
    ]
}
