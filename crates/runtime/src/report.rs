// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmark and validation results.

use crate::Diagnostic;
use cycle_clock::{Centi, ClockConfig, CycleDuration};
use model_ir::ModelFormat;
use observer::{InvocationTiming, NodeRecord, NodeReport, ProfileInfo};
use resource_monitor::MonitorReport;
use std::fmt::Write as _;

/// Min / max / average cycles per iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CycleStats {
    pub min: u64,
    pub max: u64,
    pub avg: u64,
}

impl CycleStats {
    /// Removes `per_iteration` observer cycles from min and max, and
    /// `total` from the sum behind the average.
    ///
    /// `per_iteration` is `total / iterations` in integer arithmetic, so
    /// min and max are corrected by the mean overhead, not by the
    /// overhead of their own iteration.
    pub fn corrected(sum: u64, min: u64, max: u64, total: u64, iterations: u32) -> Self {
        let n = u64::from(iterations.max(1));
        let per_iteration = total / n;
        Self {
            min: min.saturating_sub(per_iteration),
            max: max.saturating_sub(per_iteration),
            avg: sum.saturating_sub(total) / n,
        }
    }
}

/// Outcome of [`Session::bench`](crate::Session::bench).
#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchReport {
    pub model: String,
    pub backend: ModelFormat,
    pub clock: ClockConfig,
    /// Multiply-accumulates per inference.
    pub macc: u64,
    pub n_nodes: usize,
    /// Iterations the loop was asked to run.
    pub requested: u32,
    /// Iterations that completed.
    pub iterations: u32,
    pub profiling: bool,
    /// Per-iteration windows as measured.
    pub raw: CycleStats,
    /// Per-iteration windows with observer overhead removed.
    pub cycles: CycleStats,
    pub profile: Option<ProfileInfo>,
    pub nodes: Option<NodeReport>,
    /// Storage held by the observer, when one was registered.
    pub observer_bytes: Option<usize>,
    pub monitors: MonitorReport,
    /// Set when the loop was cut short by a failure.
    pub aborted: Option<Diagnostic>,
}

impl BenchReport {
    /// Average corrected duration of one inference.
    pub fn duration(&self) -> CycleDuration {
        CycleDuration::from_cycles(self.cycles.avg, self.clock.cpu_hz())
    }

    /// `cycles / MACC`, `None` for a model reporting no MACC.
    pub fn cycles_per_macc(&self) -> Option<Centi> {
        Centi::ratio(self.cycles.avg, self.macc)
    }

    /// Share of a one-second duty cycle spent in one inference.
    pub fn workload(&self) -> Option<Centi> {
        Centi::percent(self.cycles.avg, u64::from(self.clock.cpu_hz()))
    }

    /// Average cycles per inference inside node kernels, inside the
    /// callback and in engine scheduling.
    pub fn breakdown(&self) -> Option<InvocationTiming> {
        let p = self.profile?;
        let n = u64::from(p.n_invoks);
        (n > 0).then(|| InvocationTiming {
            node_dur: p.node_dur / n,
            cb_dur: p.cb_dur / n,
            engine_dur: p.engine_dur / n,
        })
    }

    /// The report block printed after a benchmark.
    ///
    /// # Example output
    /// ```text
    /// Results for "kws", 16 inferences @80MHz/80MHz (complexity: 336000 MACC)
    ///  duration     : 0.019 ms (average)
    ///  CPU cycles   : 1512 -0/+0 (average,-/+)
    ///  CPU Workload : 0.00% (duty cycle = 1s)
    ///  cycles/MACC  : 0.00 (average for all layers)
    /// ```
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Results for \"{}\", {} inferences @{} (complexity: {} MACC)",
            self.model,
            self.iterations,
            self.clock.summary(),
            self.macc
        );
        if self.iterations < self.requested {
            let _ = writeln!(out, " (loop shortened from {} iterations)", self.requested);
        }
        let _ = writeln!(out, " duration     : {} (average)", self.duration());
        let _ = writeln!(
            out,
            " CPU cycles   : {} -{}/+{} (average,-/+)",
            self.cycles.avg,
            self.cycles.avg.saturating_sub(self.cycles.min),
            self.cycles.max.saturating_sub(self.cycles.avg)
        );
        let _ = writeln!(
            out,
            " CPU Workload : {}% (duty cycle = 1s)",
            self.workload().unwrap_or_default()
        );
        match self.cycles_per_macc() {
            Some(c) => {
                let _ = writeln!(out, " cycles/MACC  : {c} (average for all layers)");
            }
            None => {
                let _ = writeln!(out, " cycles/MACC  : n.a.");
            }
        }
        out.push_str(&self.monitors.summary());
        if let Some(bytes) = self.observer_bytes {
            let _ = writeln!(
                out,
                " observer res : {bytes} bytes used from the heap ({} c-nodes)",
                self.n_nodes
            );
        }
        if let Some(t) = self.breakdown() {
            let _ = writeln!(
                out,
                " node/engine  : {}/{} cycles, observer {} cycles (average per inference)",
                t.node_dur, t.engine_dur, t.cb_dur
            );
        }
        if let Some(nodes) = &self.nodes {
            out.push('\n');
            out.push_str(&nodes.summary(&self.clock));
            out.push('\n');
        }
        if let Some(d) = &self.aborted {
            let _ = writeln!(out, "{d}");
        }
        out
    }
}

/// Outcome of [`Session::run_once`](crate::Session::run_once).
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunOutcome {
    pub outputs: Vec<Vec<u8>>,
    /// Invocation window minus the callback cycles.
    pub elapsed_cycles: u64,
    pub elapsed_ms: f32,
    pub num_inferences: u32,
    pub n_nodes: usize,
    pub timing: InvocationTiming,
    /// Inspector records, when collected in memory.
    pub records: Vec<NodeRecord>,
    pub nodes: Option<NodeReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BenchReport {
        BenchReport {
            model: "kws".into(),
            backend: ModelFormat::Portable,
            clock: ClockConfig::from_mhz(80),
            macc: 1_000,
            n_nodes: 2,
            requested: 4,
            iterations: 4,
            profiling: false,
            raw: CycleStats {
                min: 230,
                max: 250,
                avg: 240,
            },
            cycles: CycleStats::corrected(960, 230, 250, 160, 4),
            profile: Some(ProfileInfo {
                cb_dur: 160,
                node_dur: 800,
                engine_dur: 0,
                n_events: 16,
                n_invoks: 4,
            }),
            nodes: None,
            observer_bytes: Some(32),
            monitors: MonitorReport::default(),
            aborted: None,
        }
    }

    #[test]
    fn test_correction() {
        let c = CycleStats::corrected(960, 230, 250, 160, 4);
        assert_eq!(c, CycleStats { min: 190, max: 210, avg: 200 });
    }

    #[test]
    fn test_correction_is_integer_mean() {
        // 10 overhead cycles over 3 iterations: 3 per iteration
        let c = CycleStats::corrected(300, 90, 110, 10, 3);
        assert_eq!((c.min, c.max, c.avg), (87, 107, 96));
    }

    #[test]
    fn test_correction_saturates() {
        let c = CycleStats::corrected(5, 1, 5, 100, 1);
        assert_eq!(c, CycleStats::default());
    }

    #[test]
    fn test_ratios() {
        let r = report();
        assert_eq!(r.cycles_per_macc().unwrap().to_string(), "0.20");
        assert_eq!(r.workload().unwrap().to_string(), "0.00");
        let b = r.breakdown().unwrap();
        assert_eq!((b.node_dur, b.cb_dur), (200, 40));
    }

    #[test]
    fn test_summary_lines() {
        let s = report().summary();
        assert!(s.starts_with("Results for \"kws\", 4 inferences @80MHz/80MHz (complexity: 1000 MACC)"));
        assert!(s.contains(" CPU cycles   : 200 -10/+10 (average,-/+)"));
        assert!(s.contains(" observer res : 32 bytes used from the heap (2 c-nodes)"));
        assert!(s.contains(" duration     : 0.002 ms (average)"));
    }

    #[test]
    fn test_no_macc() {
        let mut r = report();
        r.macc = 0;
        assert_eq!(r.cycles_per_macc(), None);
        assert!(r.summary().contains("cycles/MACC  : n.a."));
    }

    #[test]
    fn test_serializes() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["cycles"]["avg"], 200);
        assert_eq!(json["backend"], "portable");
    }
}
