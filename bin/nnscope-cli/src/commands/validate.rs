// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `nnscope validate` command: one observed inference.
//!
//! Node records go to stdout as JSON lines while the model runs; a final
//! line carries the outcome (outputs, pure elapsed time).

use super::Settings;
use anyhow::Context;
use observer::{InspectorMode, JsonLines};
use runtime::{InputFiller, RunMode};
use std::path::PathBuf;

pub fn execute(
    mut settings: Settings,
    model: Option<PathBuf>,
    input_files: Vec<PathBuf>,
    without_data: bool,
    timing_only: bool,
) -> anyhow::Result<()> {
    let manifest = super::load_model(&mut settings, model)?;
    let seed = settings.config.seed;
    let (_platform, mut session) = super::open_session(settings.config, &manifest, None)?;

    let layouts: Vec<_> = session
        .report()
        .map(|r| r.inputs.iter().map(|t| t.layout).collect())
        .unwrap_or_default();
    let inputs: Vec<Vec<u8>> = if input_files.is_empty() {
        let mut filler = InputFiller::new(seed);
        layouts
            .iter()
            .map(|layout| {
                let mut buf = vec![0u8; layout.size_bytes];
                filler.fill(layout, &mut buf);
                buf
            })
            .collect()
    } else {
        anyhow::ensure!(
            input_files.len() == layouts.len(),
            "model has {} inputs, {} input files given",
            layouts.len(),
            input_files.len()
        );
        input_files
            .iter()
            .map(|p| {
                std::fs::read(p).with_context(|| format!("failed to read input '{}'", p.display()))
            })
            .collect::<anyhow::Result<_>>()?
    };
    let refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();

    let mode = if timing_only {
        RunMode::Timing
    } else if without_data {
        RunMode::Inspect(InspectorMode::WithoutData)
    } else {
        RunMode::Inspect(InspectorMode::WithData)
    };
    let outcome = session.run_once_streaming(&refs, mode, JsonLines::new(std::io::stdout()))?;

    let summary = serde_json::json!({
        "elapsed_cycles": outcome.elapsed_cycles,
        "elapsed_ms": outcome.elapsed_ms,
        "num_inferences": outcome.num_inferences,
        "n_nodes": outcome.n_nodes,
        "outputs": outcome.outputs,
    });
    println!("{summary}");

    session.destroy();
    Ok(())
}
