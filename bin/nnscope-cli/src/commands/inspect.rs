// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `nnscope inspect` command: model report and node list.

use super::Settings;
use std::path::PathBuf;

pub fn execute(mut settings: Settings, model: Option<PathBuf>) -> anyhow::Result<()> {
    let manifest = super::load_model(&mut settings, model)?;
    let (_platform, session) = super::open_session(settings.config, &manifest, None)?;

    let report = session
        .report()
        .ok_or_else(|| anyhow::anyhow!("session has no model report"))?;
    print!("{}", report.summary());
    println!();

    println!(
        " {:<5} {:<24} {:<16} {:>6} {:>8}",
        "c_id", "name", "type", "id", "outputs"
    );
    println!(" {}", "-".repeat(63));
    for node in session.nodes() {
        println!(
            " {:<5} {:<24} {:<16} {:>6} {:>8}",
            node.index,
            truncate(&node.name, 24),
            node.display_kind(),
            node.id,
            node.outputs.len(),
        );
    }
    println!();

    session.destroy();
    Ok(())
}

/// Truncates a string to `max_len` characters with an ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    }
}
