// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-line interface for ChainPress
//!
//! This module provides the command-line interface for the ChainPress static
//! site generator. It handles argument parsing, configuration loading and
//! command execution.
//!
//! # Examples
//!
//! ```
//! use chainpress::cli;
//!
//! let matches = cli::build().get_matches_from(vec![
//!     "chainpress",
//!     "build-css",
//!     "--production",
//! ]);
//!
//! let css_cmd = matches.subcommand_matches("build-css").unwrap();
//! assert!(css_cmd.get_flag("production"));
//! ```

use crate::core::config::{
    Config, ConfigBuilder, Profile, DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX,
};
use crate::core::error::{ChainPressError, Result};
use crate::stylesheet::build_css;
use crate::ChainPress;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// The current version of ChainPress, as defined in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn config_arg() -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help("Configuration file (defaults to ./chainpress.toml when present)")
        .value_parser(value_parser!(PathBuf))
}

fn production_arg() -> Arg {
    Arg::new("production")
        .short('p')
        .long("production")
        .help("Use the production profile (minified CSS and HTML)")
        .action(ArgAction::SetTrue)
}

/// Builds and configures the ChainPress command-line interface.
pub fn build() -> Command {
    Command::new("chainpress")
        .author("ChainPress Contributors")
        .about("A static site generator for chain-ecosystem articles.")
        .version(VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase logging verbosity (-v, -vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("build")
                .about("Build the CSS bundle, then every page of the site")
                .arg(config_arg())
                .arg(production_arg()),
        )
        .subcommand(
            Command::new("build-css")
                .about("Build the CSS bundle only")
                .arg(config_arg())
                .arg(production_arg()),
        )
        .after_help(
            "\x1b[1;4mEnvironment:\x1b[0m\n\n  Settings can be overridden with \
             CHAINPRESS_<KEY> variables, e.g. CHAINPRESS_OUTPUT_DIR=public \
             or CHAINPRESS_CSS__SOURCE_MAP=true.\n\n\
             \x1b[1;4mLicense:\x1b[0m\n  The project is licensed under the terms of \
             both the MIT license and the Apache License (Version 2.0).",
        )
}

/// Maps the `-v` count to a default log filter.
pub fn log_level(matches: &ArgMatches) -> &'static str {
    match matches.get_count("verbose") {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Loads the configuration for a subcommand.
///
/// An explicit `--config` file must exist. Without it, `chainpress.toml` in
/// the working directory is used when present. `CHAINPRESS_` variables are
/// always applied, and `--production` wins over any profile they set.
pub fn load_config(sub_matches: &ArgMatches) -> Result<Config> {
    let mut builder = ConfigBuilder::new().with_env_prefix(DEFAULT_ENV_PREFIX);

    match sub_matches.get_one::<PathBuf>("config") {
        Some(path) => builder = builder.with_file(path),
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            builder = builder.with_file(DEFAULT_CONFIG_FILE);
        }
        None => debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE),
    }

    if sub_matches.get_flag("production") {
        builder = builder.with_profile(Profile::Production);
    }

    builder.build()
}

/// Executes the command-line interface by matching the subcommand and arguments.
///
/// # Returns
/// * `Result<()>` - Indicates success, or an error if execution fails.
pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("build", sub_matches)) => {
            let config = load_config(sub_matches)?;
            info!(
                "Building {} -> {} ({:?})",
                config.input_dir.display(),
                config.output_dir.display(),
                config.profile
            );
            let _ = ChainPress::new(config).build()?;
            Ok(())
        }
        Some(("build-css", sub_matches)) => {
            let config = load_config(sub_matches)?;
            let _ = build_css(&config.css, config.profile.is_production())?;
            Ok(())
        }
        _ => Err(ChainPressError::internal_error("Unknown command")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_matches(args: Vec<&str>) -> ArgMatches {
        build().get_matches_from(args)
    }

    #[test]
    fn test_build_command() {
        let matches = get_matches(vec![
            "chainpress",
            "build",
            "--config",
            "site.toml",
            "--production",
        ]);
        let build_cmd = matches.subcommand_matches("build").unwrap();

        assert_eq!(
            build_cmd.get_one::<PathBuf>("config").unwrap().as_path(),
            Path::new("site.toml")
        );
        assert!(build_cmd.get_flag("production"));
    }

    #[test]
    fn test_build_css_defaults() {
        let matches = get_matches(vec!["chainpress", "build-css"]);
        let css_cmd = matches.subcommand_matches("build-css").unwrap();

        assert!(css_cmd.get_one::<PathBuf>("config").is_none());
        assert!(!css_cmd.get_flag("production"));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(log_level(&get_matches(vec!["chainpress", "build"])), "info");
        assert_eq!(
            log_level(&get_matches(vec!["chainpress", "-v", "build"])),
            "debug"
        );
        assert_eq!(
            log_level(&get_matches(vec!["chainpress", "build", "-vv"])),
            "trace"
        );
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let matches = get_matches(vec![
            "chainpress",
            "build",
            "--config",
            "/definitely/not/here.toml",
        ]);
        let err = load_config(matches.subcommand_matches("build").unwrap())
            .unwrap_err();
        assert!(matches!(err, ChainPressError::ConfigError { .. }));
    }

    #[test]
    fn test_production_flag_sets_profile() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_file = temp_dir.path().join("chainpress.toml");
        std::fs::write(&config_file, "profile = \"staging\"\n").unwrap();

        let path = config_file.to_str().unwrap();
        let matches = get_matches(vec![
            "chainpress",
            "build-css",
            "-c",
            path,
            "-p",
        ]);
        let config =
            load_config(matches.subcommand_matches("build-css").unwrap())
                .unwrap();
        assert_eq!(config.profile, Profile::Production);
    }
}
