// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-node duration accumulators.
//!
//! [`NodeTimingTable`] is indexed by node index and updated from the
//! callback path, so [`NodeTimingTable::accumulate`] is a bounds-checked
//! slot update and nothing else. Averages and shares are computed once,
//! after the window, by [`NodeTimingTable::report`].

use crate::ObserverError;
use cycle_clock::{Centi, ClockConfig, CycleDuration};
use model_ir::NodeDescriptor;
use std::fmt::Write;

/// Accumulator for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeStat {
    pub total_cycles: u64,
    pub runs: u32,
}

impl NodeStat {
    /// Average cycles per run, `None` before the first completed run.
    pub fn average(&self) -> Option<u64> {
        (self.runs != 0).then(|| self.total_cycles / u64::from(self.runs))
    }
}

/// Node index to accumulated duration and run count.
#[derive(Debug, Clone, Default)]
pub struct NodeTimingTable {
    slots: Vec<NodeStat>,
    limit: Option<usize>,
}

impl NodeTimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose slot storage may not exceed `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Allocates and zeroes `n_nodes` slots, discarding prior totals.
    pub fn reset(&mut self, n_nodes: usize) -> Result<(), ObserverError> {
        let err = || ObserverError::Allocation {
            nodes: n_nodes,
            bytes: n_nodes.saturating_mul(std::mem::size_of::<NodeStat>()),
            limit: self.limit,
        };
        let bytes = n_nodes
            .checked_mul(std::mem::size_of::<NodeStat>())
            .ok_or_else(err)?;
        if self.limit.is_some_and(|limit| bytes > limit) {
            return Err(err());
        }

        self.slots.clear();
        self.slots.try_reserve_exact(n_nodes).map_err(|_| err())?;
        self.slots.resize(n_nodes, NodeStat::default());
        Ok(())
    }

    /// Adds one run of `cycles` to node `index`.
    ///
    /// Returns `false` when the index has no slot.
    #[inline]
    pub fn accumulate(&mut self, index: usize, cycles: u64) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.total_cycles += cycles;
                slot.runs += 1;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NodeStat> {
        self.slots.get(index).copied()
    }

    pub fn stats(&self) -> &[NodeStat] {
        &self.slots
    }

    /// Sum of all node totals.
    pub fn total_cycles(&self) -> u64 {
        self.slots.iter().map(|s| s.total_cycles).sum()
    }

    /// Bytes held by the slot storage.
    pub fn footprint_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<NodeStat>()
    }

    /// Per-node averages and shares in ascending index order.
    ///
    /// `nodes[i]` describes slot `i`. Nodes with zero runs are listed as
    /// anomalies and left out of the rows.
    pub fn report(&self, nodes: &[NodeDescriptor]) -> NodeReport {
        let total = self.total_cycles();
        let mut rows = Vec::with_capacity(self.slots.len());
        let mut anomalies = Vec::new();

        for (index, stat) in self.slots.iter().enumerate() {
            let node = nodes.get(index);
            let name = node.map_or_else(|| format!("node_{index}"), |n| n.name.clone());
            let Some(avg_cycles) = stat.average() else {
                tracing::warn!(node = index, name = %name, "node has no completed run; skipped");
                anomalies.push(NodeAnomaly { index, name });
                continue;
            };
            rows.push(NodeRow {
                index,
                id: node.map_or(index as i32, |n| n.id),
                kind: node.map_or_else(|| "unknown".to_string(), NodeDescriptor::display_kind),
                name,
                runs: stat.runs,
                total_cycles: stat.total_cycles,
                avg_cycles,
                share: Centi::percent(stat.total_cycles, total).unwrap_or_default(),
            });
        }

        NodeReport {
            rows,
            anomalies,
            total_cycles: total,
        }
    }
}

/// One reported node.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NodeRow {
    pub index: usize,
    pub id: i32,
    pub name: String,
    pub kind: String,
    pub runs: u32,
    pub total_cycles: u64,
    pub avg_cycles: u64,
    /// Share of the summed node time.
    pub share: Centi,
}

/// A node that could not be averaged.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NodeAnomaly {
    pub index: usize,
    pub name: String,
}

/// Output of [`NodeTimingTable::report`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NodeReport {
    pub rows: Vec<NodeRow>,
    pub anomalies: Vec<NodeAnomaly>,
    pub total_cycles: u64,
}

impl NodeReport {
    /// Sum of the per-node averages: node time of one inference.
    pub fn per_inference_cycles(&self) -> u64 {
        self.rows.iter().map(|r| r.avg_cycles).sum()
    }

    /// Text table with per-node average time in milliseconds.
    pub fn summary(&self, clock: &ClockConfig) -> String {
        let fcpu = clock.cpu_hz();
        let rule = format!(" {}", "-".repeat(66));
        let mut out = String::new();
        let _ = writeln!(
            out,
            " {:<5} {:<24} {:<6} {:>14} {:>10}",
            "c_id", "type", "id", "time (ms)", "share"
        );
        let _ = writeln!(out, "{rule}");
        for row in &self.rows {
            let _ = writeln!(
                out,
                " {:<5} {:<24} {:<6} {:>14} {:>8} %",
                row.index,
                row.kind,
                row.id,
                CycleDuration::from_cycles(row.avg_cycles, fcpu).to_string(),
                row.share.to_string(),
            );
        }
        for anomaly in &self.anomalies {
            let _ = writeln!(out, " {:<5} {:<24} (no completed run)", anomaly.index, anomaly.name);
        }
        let _ = writeln!(out, "{rule}");
        let _ = write!(
            out,
            " {:>37} {:>14}",
            "",
            CycleDuration::from_cycles(self.per_inference_cycles(), fcpu).to_string()
        );
        out
    }
}
