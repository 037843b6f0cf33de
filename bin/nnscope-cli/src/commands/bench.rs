// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `nnscope bench` command: the performance loop.
//!
//! Prints the model report followed by the benchmark report. With
//! `--json` the benchmark report is written as one JSON document instead.

use super::Settings;
use resource_monitor::HeapMonitor;
use std::path::PathBuf;

/// Flags of the `bench` subcommand.
pub struct BenchArgs {
    pub model: Option<PathBuf>,
    pub iterations: Option<u32>,
    pub profiling: bool,
    pub no_observer: bool,
    pub json: bool,
}

pub fn execute(
    mut settings: Settings,
    args: BenchArgs,
    heap: &'static dyn HeapMonitor,
) -> anyhow::Result<()> {
    let manifest = super::load_model(&mut settings, args.model)?;
    let config = &mut settings.config;
    if let Some(n) = args.iterations {
        config.iterations = n;
    }
    config.profiling |= args.profiling;
    if args.no_observer {
        config.observer = false;
    }

    let (_platform, mut session) = super::open_session(settings.config, &manifest, Some(heap))?;
    let report = session.bench()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(model) = session.report() {
            print!("{}", model.summary());
            println!();
        }
        print!("{}", report.summary());
    }

    session.destroy();
    Ok(())
}
