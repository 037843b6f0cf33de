// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # nnscope
//!
//! Command-line interface for the inference profiling harness.
//!
//! ## Usage
//! ```bash
//! # Benchmark a model with per-node profiling
//! nnscope bench --model ./models/kws.json --iterations 32 --profiling
//!
//! # Print the model report
//! nnscope inspect --model ./models/kws.json
//!
//! # One inspector run, node records as JSON lines on stdout
//! nnscope validate --model ./models/kws.json --input ./input.bin
//! ```

mod commands;

use clap::{Parser, Subcommand};
use resource_monitor::CountingAllocator;
use std::path::PathBuf;

#[global_allocator]
static HEAP: CountingAllocator = CountingAllocator::system();

#[derive(Parser)]
#[command(
    name = "nnscope",
    about = "Cycle-accurate profiling of neural network inference",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file. Command-line flags override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark loop and print the performance report.
    Bench {
        /// Path to the model image (JSON manifest).
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Timed iterations.
        #[arg(short = 'n', long)]
        iterations: Option<u32>,

        /// Multiply the iteration count and report per-node detail.
        #[arg(short, long)]
        profiling: bool,

        /// Disable the observer entirely.
        #[arg(long)]
        no_observer: bool,

        /// Print the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the model report and node list.
    Inspect {
        /// Path to the model image (JSON manifest).
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Run one inference and stream per-node records as JSON lines.
    Validate {
        /// Path to the model image (JSON manifest).
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Raw input tensor file, one per model input, in order.
        /// Random inputs are generated when omitted.
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Stream timings and layouts only.
        #[arg(long)]
        without_data: bool,

        /// Skip the inspector: timings only.
        #[arg(long)]
        timing_only: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    let settings = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Bench {
            model,
            iterations,
            profiling,
            no_observer,
            json,
        } => commands::bench::execute(
            settings,
            commands::bench::BenchArgs {
                model,
                iterations,
                profiling,
                no_observer,
                json,
            },
            &HEAP,
        ),
        Commands::Inspect { model } => commands::inspect::execute(settings, model),
        Commands::Validate {
            model,
            input,
            without_data,
            timing_only,
        } => commands::validate::execute(settings, model, input, without_data, timing_only),
    }
}
