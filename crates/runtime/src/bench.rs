// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The benchmark loop.
//!
//! 1. Untimed warm-up runs, observer unbound.
//! 2. Observer registration, with the heap monitor counting what it takes.
//! 3. `iterations` timed runs on fresh random inputs, each bracketed by
//!    `clock.start()` / `clock.elapsed()` and the heap monitor. The stack
//!    is painted before the loop and scanned after it; interrupts are
//!    masked around the whole loop when configured.
//! 4. Observer overhead removal and report assembly.
//!
//! An iteration slower than `max_iteration_secs` ends the loop after that
//! iteration (not in profiling mode). A failed run or a batch count other
//! than one breaks the loop; the completed iterations are still reported.

use crate::backend::Backend;
use crate::irq::IrqGuard;
use crate::report::{BenchReport, CycleStats};
use crate::session::{fail, Ready, Session};
use crate::{InputFiller, SessionError};
use model_ir::TensorDescriptor;
use observer::{NodeSink, Observer, ObserverFlags, ObserverOptions};
use resource_monitor::MonitorReport;

/// Running min / max / sum over completed iterations.
#[derive(Debug, Clone, Copy)]
struct LoopStats {
    count: u32,
    min: u64,
    max: u64,
    sum: u64,
    /// Callback cycles inside the completed iterations.
    cb: u64,
}

impl Default for LoopStats {
    fn default() -> Self {
        Self {
            count: 0,
            min: u64::MAX,
            max: 0,
            sum: 0,
            cb: 0,
        }
    }
}

impl LoopStats {
    fn push(&mut self, cycles: u64, cb: u64) {
        self.count += 1;
        self.min = self.min.min(cycles);
        self.max = self.max.max(cycles);
        self.sum += cycles;
        self.cb += cb;
    }

    fn raw(&self) -> CycleStats {
        CycleStats {
            min: self.min,
            max: self.max,
            avg: self.sum / u64::from(self.count.max(1)),
        }
    }
}

/// Draws fresh inputs. Engine-owned inputs are written in place and keep
/// an empty user buffer.
fn fill_inputs(
    filler: &mut InputFiller,
    descriptors: &[TensorDescriptor],
    buffers: &mut [Vec<u8>],
    backend: &mut dyn Backend,
) {
    for (index, (desc, buf)) in descriptors.iter().zip(buffers.iter_mut()).enumerate() {
        match backend.input_buffer(index) {
            Some(dst) => filler.fill(&desc.layout, dst),
            None => filler.fill(&desc.layout, buf),
        }
    }
}

/// Stamps an invoke failure with the loop iteration it happened in.
fn at_iteration(e: SessionError, iteration: u32) -> SessionError {
    match e {
        SessionError::Invoke { detail, .. } => SessionError::Invoke { iteration, detail },
        other => other,
    }
}

impl Session<Ready> {
    /// Runs the benchmark loop with a time-only observer.
    pub fn bench(&mut self) -> Result<BenchReport, SessionError> {
        self.bench_with_sink(None)
    }

    /// Runs the benchmark loop, forwarding node events to `sink`.
    ///
    /// Cycles the sink spends are charged to the callback and removed
    /// from the reported figures.
    ///
    /// # Errors
    /// Fails when a warm-up run fails or when no timed iteration
    /// completes. A failure after at least one completed iteration is
    /// reported in [`BenchReport::aborted`] instead.
    pub fn bench_with_sink(
        &mut self,
        sink: Option<Box<dyn NodeSink>>,
    ) -> Result<BenchReport, SessionError> {
        let model = self
            .report
            .clone()
            .ok_or_else(|| fail(SessionError::NotReady("no model report")))?;
        let Self {
            config,
            clock,
            backend,
            inputs,
            outputs,
            filler,
            heap,
            stack,
            irq,
            ..
        } = self;
        let backend = backend
            .as_deref_mut()
            .ok_or_else(|| fail(SessionError::NotReady("no backend")))?;
        let requested = config.effective_iterations();

        for w in 0..config.warmup {
            fill_inputs(filler, &model.inputs, inputs, &mut *backend);
            let refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();
            backend
                .run(&refs, outputs)
                .map_err(|e| fail(at_iteration(e, w)))?;
        }
        tracing::debug!(runs = config.warmup, "warm-up done");

        // ── Observer ───────────────────────────────────────────────
        if let Some(h) = heap {
            h.reset();
            h.enable();
        }
        let observer_id = if config.observer {
            let mut options = ObserverOptions::new().time_source(clock.clone());
            options = match sink {
                Some(sink) => options.boxed_sink(sink),
                None => options.flags(ObserverFlags::TIME_ONLY),
            };
            if let Some(limit) = config.observer_table_limit {
                options = options.table_limit(limit.as_bytes());
            }
            match backend.register_observer(options) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "benchmarking without observer");
                    None
                }
            }
        } else {
            None
        };
        if let Some(h) = heap {
            h.disable();
            tracing::debug!(bytes = h.usage().used, "observer heap");
            h.reset();
        }
        let observer_bytes = observer_id
            .and(backend.observer())
            .map(Observer::footprint_bytes);

        if let Some(s) = stack.as_mut() {
            s.mark().map_err(|e| fail(e.into()))?;
        }

        // ── Timed loop ─────────────────────────────────────────────
        tracing::info!(
            iterations = requested,
            profiling = config.profiling,
            observer = observer_id.is_some(),
            "benchmark started"
        );
        let max_cycles = config.max_iteration_cycles();
        let mut stats = LoopStats::default();
        let mut aborted = None;
        {
            let _irq = if config.mask_interrupts {
                Some(IrqGuard::new(&mut **irq))
            } else {
                None
            };
            let mut planned = requested;
            let mut iteration = 0;
            while iteration < planned {
                fill_inputs(filler, &model.inputs, inputs, &mut *backend);
                let refs: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();

                if let Some(h) = heap {
                    h.enable();
                }
                clock.start();
                let result = backend.run(&refs, outputs);
                let cycles = clock.elapsed();
                if let Some(h) = heap {
                    h.disable();
                }

                let status = match result {
                    Ok(status) if status.batches != 1 => {
                        aborted = Some(SessionError::Invoke {
                            iteration,
                            detail: format!("{} batches processed, expected 1", status.batches),
                        });
                        break;
                    }
                    Ok(status) => status,
                    Err(e) => {
                        aborted = Some(at_iteration(e, iteration));
                        break;
                    }
                };
                stats.push(cycles, status.timing.map_or(0, |t| t.cb_dur));
                tracing::debug!(iteration, cycles, "iteration done");
                iteration += 1;

                if let Some(limit) = max_cycles {
                    if cycles > limit && iteration < planned {
                        tracing::warn!(
                            iteration,
                            cycles,
                            "iteration exceeded {}s, shortening the loop",
                            config.max_iteration_secs
                        );
                        planned = iteration;
                    }
                }
            }
        }

        // ── Monitors and observer ──────────────────────────────────
        let monitors = MonitorReport {
            heap: heap.map(|h| h.usage()),
            stack: stack.as_mut().and_then(|s| {
                s.evaluate()
                    .map_err(|e| tracing::warn!(error = %e, "stack evaluation failed"))
                    .ok()
            }),
        };
        let observer = observer_id.and_then(|id| match backend.unregister_observer(id) {
            Ok(observer) => Some(observer),
            Err(e) => {
                tracing::warn!(error = %e, "observer could not be unregistered");
                None
            }
        });

        if stats.count == 0 {
            return Err(fail(aborted.unwrap_or(SessionError::Invoke {
                iteration: 0,
                detail: "no iteration completed".into(),
            })));
        }
        let aborted = aborted.map(|e| e.diagnostic().emit());

        let report = BenchReport {
            model: model.name.clone(),
            backend: model.format,
            clock: *clock.config(),
            macc: model.macc,
            n_nodes: model.n_nodes,
            requested,
            iterations: stats.count,
            profiling: config.profiling,
            raw: stats.raw(),
            cycles: CycleStats::corrected(stats.sum, stats.min, stats.max, stats.cb, stats.count),
            profile: observer.as_ref().map(Observer::info),
            nodes: observer
                .as_ref()
                .and_then(Observer::table)
                .map(|t| t.report(backend.nodes())),
            observer_bytes,
            monitors,
            aborted,
        };
        tracing::info!(
            iterations = report.iterations,
            avg_cycles = report.cycles.avg,
            "benchmark done"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HarnessConfig, SimPlatform};
    use model_ir::{ModelFormat, ModelManifest};

    fn manifest(format: ModelFormat, costs: [u64; 2]) -> ModelManifest {
        let json = format!(
            r#"{{
                "name": "pair",
                "format": "{}",
                "schema_version": 1,
                "macc": 400,
                "activations_bytes": 64,
                "tensors": [
                    {{ "name": "in", "dtype": "i8", "shape": [1, 8] }},
                    {{ "name": "hidden", "dtype": "i8", "shape": [1, 8] }},
                    {{ "name": "out", "dtype": "i8", "shape": [1, 8] }}
                ],
                "inputs": [0],
                "outputs": [2],
                "nodes": [
                    {{ "name": "a", "code": 1, "outputs": [1], "cost_cycles": {} }},
                    {{ "name": "b", "code": 1, "outputs": [2], "cost_cycles": {} }}
                ]
            }}"#,
            format.as_str(),
            costs[0],
            costs[1]
        );
        ModelManifest::from_json(&json).unwrap()
    }

    fn ready(platform: &SimPlatform, config: HarnessConfig, costs: [u64; 2]) -> Session<Ready> {
        let format = config.backend;
        Session::new(config, platform.counter().clone(), platform.factory())
            .unwrap()
            .create(&manifest(format, costs))
            .unwrap()
            .init()
            .unwrap()
            .prepare()
            .unwrap()
    }

    #[test]
    fn test_loop_counts_and_averages() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            iterations: 8,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [300, 100]);
        let r = s.bench().unwrap();
        assert_eq!(r.iterations, 8);
        assert_eq!(r.cycles, CycleStats { min: 400, max: 400, avg: 400 });
        assert_eq!(r.cycles_per_macc().unwrap().to_string(), "1.00");
        let nodes = r.nodes.unwrap();
        assert_eq!(nodes.rows[0].runs, 8);
        assert_eq!(nodes.rows[0].share.to_string(), "75.00");
        // warm-up plus the timed runs
        assert_eq!(platform.control().runs(), 9);
    }

    #[test]
    fn test_profiling_multiplies_iterations() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            iterations: 2,
            profiling: true,
            profiling_factor: 3,
            warmup: 0,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [10, 10]);
        let r = s.bench().unwrap();
        assert_eq!(r.iterations, 6);
        assert!(r.profiling);
    }

    #[test]
    fn test_long_iteration_shortens_loop() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            iterations: 16,
            max_iteration_secs: 1,
            clock: cycle_clock::ClockConfig::from_mhz(1),
            ..Default::default()
        };
        let mut s = ready(&platform, config, [1_500_000, 0]);
        let r = s.bench().unwrap();
        assert_eq!(r.requested, 16);
        assert_eq!(r.iterations, 1);
        assert!(r.summary().contains("loop shortened"));
    }

    #[test]
    fn test_invoke_failure_breaks_loop() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            iterations: 10,
            warmup: 0,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [50, 50]);
        platform.fail_run_at(Some(4));
        let r = s.bench().unwrap();
        assert_eq!(r.iterations, 3);
        let d = r.aborted.unwrap();
        assert_eq!(d.kind, "invoke");
        assert_eq!(d.code, -10);
        assert!(d.message.contains("iteration 3"));
        // the session stays usable
        platform.fail_run_at(None);
        assert_eq!(s.bench().unwrap().iterations, 10);
    }

    #[test]
    fn test_first_iteration_failure_is_error() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            warmup: 0,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [50, 50]);
        platform.fail_run_at(Some(1));
        let err = s.bench().unwrap_err();
        assert!(matches!(err, SessionError::Invoke { iteration: 0, .. }));
    }

    #[test]
    fn test_unexpected_batch_count() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            warmup: 0,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [50, 50]);
        platform.set_batches(2);
        assert!(matches!(s.bench(), Err(SessionError::Invoke { .. })));
    }

    #[test]
    fn test_without_observer() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            observer: false,
            ..Default::default()
        };
        let mut s = ready(&platform, config, [20, 30]);
        let r = s.bench().unwrap();
        assert!(r.nodes.is_none());
        assert!(r.profile.is_none());
        assert_eq!(r.observer_bytes, None);
        assert_eq!(r.cycles.avg, 50);
    }

    #[test]
    fn test_interrupts_masked_around_loop() {
        use crate::irq::{IrqControl, IrqState};
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Recorder(Arc<Mutex<Vec<&'static str>>>);
        impl IrqControl for Recorder {
            fn disable(&mut self) -> IrqState {
                self.0.lock().unwrap().push("disable");
                IrqState(1)
            }
            fn restore(&mut self, _state: IrqState) {
                self.0.lock().unwrap().push("restore");
            }
        }

        let platform = SimPlatform::new();
        let log = Recorder::default();
        let config = HarnessConfig {
            mask_interrupts: true,
            ..Default::default()
        };
        let mut s = Session::new(config, platform.counter().clone(), platform.factory())
            .unwrap()
            .with_irq(log.clone())
            .create(&manifest(ModelFormat::Vendor, [1, 1]))
            .unwrap()
            .init()
            .unwrap()
            .prepare()
            .unwrap();
        s.bench().unwrap();
        assert_eq!(*log.0.lock().unwrap(), vec!["disable", "restore"]);
    }
}
