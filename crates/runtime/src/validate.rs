// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single validation runs on caller-supplied inputs.
//!
//! The observer is registered for exactly one invocation. In inspector
//! mode every node's outputs are turned into [`NodeRecord`]s while the
//! node callback runs; the cycles this takes land in `cb_dur` and are
//! removed from the reported elapsed time.
//!
//! [`NodeRecord`]: observer::NodeRecord

use crate::report::RunOutcome;
use crate::session::{fail, Ready, Session};
use crate::SessionError;
use observer::{
    InspectorMode, InspectorSink, ObserverFlags, ObserverOptions, RecordBuffer, RecordSink,
};

/// What a validation run collects per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Node timings only.
    #[default]
    Timing,
    /// Node timings plus one record per output tensor.
    Inspect(InspectorMode),
}

impl Session<Ready> {
    /// Runs one inference on `inputs`, collecting records in memory.
    pub fn run_once(&mut self, inputs: &[&[u8]], mode: RunMode) -> Result<RunOutcome, SessionError> {
        let buffer = RecordBuffer::new();
        let mut outcome = self.run_observed(inputs, mode, Box::new(buffer.clone()))?;
        outcome.records = buffer.take();
        Ok(outcome)
    }

    /// Runs one inference on `inputs`, streaming records to `records` as
    /// the nodes execute.
    pub fn run_once_streaming(
        &mut self,
        inputs: &[&[u8]],
        mode: RunMode,
        records: impl RecordSink + 'static,
    ) -> Result<RunOutcome, SessionError> {
        self.run_observed(inputs, mode, Box::new(records))
    }

    fn run_observed(
        &mut self,
        inputs: &[&[u8]],
        mode: RunMode,
        records: Box<dyn RecordSink>,
    ) -> Result<RunOutcome, SessionError> {
        let Self {
            config,
            clock,
            backend,
            outputs,
            ..
        } = self;
        let backend = backend
            .as_deref_mut()
            .ok_or_else(|| fail(SessionError::NotReady("no backend")))?;
        let n_nodes = backend.nodes().len();

        let mut refs = Vec::with_capacity(inputs.len());
        for (index, &data) in inputs.iter().enumerate() {
            match backend.input_buffer(index) {
                Some(dst) if dst.len() == data.len() => {
                    dst.copy_from_slice(data);
                    refs.push(&[][..]);
                }
                Some(dst) => {
                    return Err(fail(SessionError::Input {
                        index,
                        detail: format!("{} bytes given, engine buffer holds {}", data.len(), dst.len()),
                    }))
                }
                None => refs.push(data),
            }
        }

        let mut options = ObserverOptions::new().time_source(clock.clone());
        if let Some(limit) = config.observer_table_limit {
            options = options.table_limit(limit.as_bytes());
        }
        options = match mode {
            RunMode::Timing => options.flags(ObserverFlags::TIME_ONLY),
            RunMode::Inspect(m) => {
                options.sink(InspectorSink::boxed(m, config.clock, records))
            }
        };
        let id = backend
            .register_observer(options)
            .map_err(|e| fail(e.into()))?;

        clock.start();
        let result = backend.run(&refs, outputs);
        let window = clock.elapsed();

        let observer = backend
            .unregister_observer(id)
            .map_err(|e| fail(e.into()))?;
        let status = result.map_err(fail)?;
        if status.batches != 1 {
            return Err(fail(SessionError::Invoke {
                iteration: 0,
                detail: format!("{} batches processed, expected 1", status.batches),
            }));
        }

        let timing = status.timing.unwrap_or_default();
        let elapsed_cycles = window.saturating_sub(timing.cb_dur);
        let elapsed_ms = clock.to_duration(elapsed_cycles).as_millis_f32();
        tracing::info!(
            elapsed_cycles,
            cb_cycles = timing.cb_dur,
            "validation run done"
        );

        let outputs = outputs
            .iter()
            .enumerate()
            .map(|(index, out)| backend.output_buffer(index).map_or_else(|| out.clone(), <[u8]>::to_vec))
            .collect();

        Ok(RunOutcome {
            outputs,
            elapsed_cycles,
            elapsed_ms,
            num_inferences: 1,
            n_nodes,
            timing,
            records: Vec::new(),
            nodes: observer.table().map(|t| t.report(backend.nodes())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HarnessConfig, SimPlatform};
    use model_ir::{ModelFormat, ModelManifest};
    use observer::JsonLines;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn ready(platform: &SimPlatform, format: ModelFormat) -> Session<Ready> {
        let json = format!(
            r#"{{
                "name": "val",
                "format": "{}",
                "schema_version": 1,
                "macc": 10,
                "activations_bytes": 32,
                "tensors": [
                    {{ "name": "in", "dtype": "u8", "shape": [1, 4] }},
                    {{ "name": "mid", "dtype": "i8", "shape": [1, 2, 2],
                       "quant": {{ "scale": 0.25, "zero_point": 3 }} }},
                    {{ "name": "out", "dtype": "u8", "shape": [1, 4] }}
                ],
                "inputs": [0],
                "outputs": [2],
                "nodes": [
                    {{ "name": "a", "code": 9, "outputs": [1], "cost_cycles": 800 }},
                    {{ "name": "b", "code": 9, "outputs": [2], "cost_cycles": 800 }}
                ]
            }}"#,
            format.as_str()
        );
        let config = HarnessConfig {
            backend: format,
            ..Default::default()
        };
        Session::new(config, platform.counter().clone(), platform.factory())
            .unwrap()
            .create(&ModelManifest::from_json(&json).unwrap())
            .unwrap()
            .init()
            .unwrap()
            .prepare()
            .unwrap()
    }

    #[test]
    fn test_timing_run() {
        let platform = SimPlatform::new();
        let mut s = ready(&platform, ModelFormat::Portable);
        let out = s.run_once(&[&[1, 1, 1, 1]], RunMode::Timing).unwrap();
        assert_eq!(out.elapsed_cycles, 1600);
        assert_eq!(out.num_inferences, 1);
        assert!(out.records.is_empty());
        assert_eq!(out.outputs[0], vec![5, 6, 7, 8]);
        // 1600 cycles at 80 MHz
        assert!((out.elapsed_ms - 0.02).abs() < 1e-6);
        assert_eq!(out.nodes.unwrap().rows.len(), 2);
        assert!(s.backend().unwrap().observer().is_none());
    }

    #[test]
    fn test_inspect_records_both_backends() {
        for format in [ModelFormat::Vendor, ModelFormat::Portable] {
            let platform = SimPlatform::new();
            let mut s = ready(&platform, format);
            let out = s
                .run_once(&[&[0, 0, 0, 0]], RunMode::Inspect(InspectorMode::WithData))
                .unwrap();
            assert_eq!(out.records.len(), 2, "{format:?}");
            let first = &out.records[0];
            assert_eq!(first.node_id, 0);
            assert!(!first.last);
            assert_eq!(first.scale, 0.25);
            assert_eq!(first.zero_point, 3);
            assert_eq!(first.layout.shape.to_string(), "(1,2,1,2)");
            assert_eq!(first.data.as_deref(), Some(&[0u8, 1, 2, 3][..]));
            assert!(out.records[1].last);
        }
    }

    #[test]
    fn test_inspect_without_data() {
        let platform = SimPlatform::new();
        let mut s = ready(&platform, ModelFormat::Vendor);
        let out = s
            .run_once(&[&[0; 4]], RunMode::Inspect(InspectorMode::WithoutData))
            .unwrap();
        assert!(out.records.iter().all(|r| r.data.is_none()));
    }

    #[test]
    fn test_streaming_json_lines() {
        #[derive(Clone, Default)]
        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let platform = SimPlatform::new();
        let mut s = ready(&platform, ModelFormat::Portable);
        let sink = Shared::default();
        let out = s
            .run_once_streaming(
                &[&[0; 4]],
                RunMode::Inspect(InspectorMode::WithData),
                JsonLines::new(sink.clone()),
            )
            .unwrap();
        assert!(out.records.is_empty());
        let text = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let v: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(v["last"], true);
    }

    #[test]
    fn test_wrong_input_size() {
        let platform = SimPlatform::new();
        let mut s = ready(&platform, ModelFormat::Portable);
        let err = s.run_once(&[&[0; 3]], RunMode::Timing).unwrap_err();
        assert_eq!(err.kind(), "input");
        // the observer slot is free again
        s.run_once(&[&[0; 4]], RunMode::Timing).unwrap();
    }
}
