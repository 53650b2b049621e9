// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # ChainPress CLI
//!
//! This is the main entry point for the ChainPress command-line interface.
//! It initializes the logger and runs the requested subcommand.

use anyhow::Context;
use chainpress::cli;
use log::info;

/// Parses arguments, sets up logging and runs the subcommand.
///
/// # Errors
///
/// Returns an error if configuration loading, the CSS build or any page
/// render fails.
fn run() -> Result<(), anyhow::Error> {
    let matches = cli::build().get_matches();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli::log_level(&matches)),
    )
    .init();

    let command = matches.subcommand_name().unwrap_or_default().to_string();
    info!("Starting ChainPress {} {}", cli::VERSION, command);

    cli::execute(&matches)
        .with_context(|| format!("chainpress {} failed", command))?;

    info!("ChainPress {} completed successfully", command);
    Ok(())
}

/// The main entry point for the ChainPress CLI.
fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
