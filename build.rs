// Copyright © 2024 ChainPress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build script: refuses to compile on toolchains without `std::sync::LazyLock`.

fn main() {
    if version_check::is_min_version("1.80.0") != Some(true) {
        eprintln!("ChainPress requires Rust 1.80.0 or newer.");
        std::process::exit(1);
    }
}
