// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inspector mode: per-node records for remote validation.
//!
//! [`InspectorSink`] turns every POST event into one [`NodeRecord`] per
//! output tensor and pushes it to a [`RecordSink`]. Building and pushing
//! records happens inside the callback, so its cost lands in `cb_dur`
//! and never in the reported inference time.

use crate::event::{NodeEvent, NodeSink};
use cycle_clock::{ClockConfig, CycleDuration};
use model_ir::TIME_DISTRIBUTED_BIT;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tensor_core::TensorLayout;

/// What the inspector streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectorMode {
    /// Timings, layouts and tensor contents.
    #[default]
    WithData,
    /// Timings and layouts only.
    WithoutData,
}

/// One output tensor of one executed node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeRecord {
    pub node_id: usize,
    /// Operator code without the time-distributed bit.
    pub layer_kind: u32,
    pub layer_name: String,
    /// Set on the records of the final node.
    pub last: bool,
    /// More outputs of the same node follow.
    pub more_outputs: bool,
    pub output_index: usize,
    pub duration_ms: f32,
    pub layout: TensorLayout,
    pub scale: f32,
    pub zero_point: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

/// Destination of inspector records.
pub trait RecordSink: Send {
    fn push(&mut self, record: NodeRecord) -> std::io::Result<()>;
}

/// In-memory record buffer; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct RecordBuffer {
    records: Arc<Mutex<Vec<NodeRecord>>>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every buffered record.
    pub fn take(&self) -> Vec<NodeRecord> {
        match self.records.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map_or(0, |g| g.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordSink for RecordBuffer {
    fn push(&mut self, record: NodeRecord) -> std::io::Result<()> {
        self.records
            .lock()
            .map_err(|_| std::io::Error::other("record buffer poisoned"))?
            .push(record);
        Ok(())
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLines<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> RecordSink for JsonLines<W> {
    fn push(&mut self, record: NodeRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")
    }
}

/// The inspector as a [`NodeSink`].
pub struct InspectorSink {
    mode: InspectorMode,
    clock: ClockConfig,
    records: Box<dyn RecordSink>,
    sent: u64,
    failed: u64,
}

impl InspectorSink {
    pub fn new(
        mode: InspectorMode,
        clock: ClockConfig,
        records: impl RecordSink + 'static,
    ) -> Self {
        Self::boxed(mode, clock, Box::new(records))
    }

    pub fn boxed(mode: InspectorMode, clock: ClockConfig, records: Box<dyn RecordSink>) -> Self {
        Self {
            mode,
            clock,
            records,
            sent: 0,
            failed: 0,
        }
    }

    pub fn mode(&self) -> InspectorMode {
        self.mode
    }

    /// Records delivered to the record sink.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Records the record sink refused.
    pub fn failed(&self) -> u64 {
        self.failed
    }
}

impl NodeSink for InspectorSink {
    fn on_event(&mut self, event: &NodeEvent<'_>) {
        if !event.flags.is_post() {
            return;
        }
        let node = event.node;
        let last = event.flags.is_last();
        let duration_ms = CycleDuration::from_cycles(event.duration.unwrap_or(0), self.clock.cpu_hz())
            .as_millis_f32();
        let n_outputs = event.outputs.len();

        for (i, view) in event.outputs.iter().enumerate() {
            let (scale, zero_point) = view.layout.scale_zero_point();
            let data = match self.mode {
                InspectorMode::WithData => view.data().map(<[u8]>::to_vec),
                InspectorMode::WithoutData => None,
            };
            let record = NodeRecord {
                node_id: node.index,
                layer_kind: node.code & !TIME_DISTRIBUTED_BIT,
                layer_name: node.display_kind(),
                last,
                more_outputs: i + 1 < n_outputs,
                output_index: view.index,
                duration_ms,
                layout: view.layout,
                scale,
                zero_point,
                data,
            };
            match self.records.push(record) {
                Ok(()) => self.sent += 1,
                Err(e) => {
                    self.failed += 1;
                    tracing::trace!(node = node.index, error = %e, "inspector record dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventFlags;
    use model_ir::{ModelFormat, NodeDescriptor};
    use tensor_core::{DType, Quantization, Shape4, TensorView};

    fn node(index: usize) -> NodeDescriptor {
        NodeDescriptor {
            index,
            name: format!("n{index}"),
            format: ModelFormat::Vendor,
            code: 2 | TIME_DISTRIBUTED_BIT,
            version: 1,
            id: 7,
            outputs: vec![1, 2],
        }
    }

    fn layout() -> TensorLayout {
        TensorLayout::new(
            DType::I8,
            Shape4::new(1, 1, 1, 2),
            Some(Quantization::new(0.25, -3)),
        )
    }

    fn post_event<'a>(node: &'a NodeDescriptor, views: &'a [TensorView<'a>]) -> NodeEvent<'a> {
        NodeEvent {
            flags: EventFlags::POST | EventFlags::LAST,
            node,
            duration: Some(80_000),
            outputs: views,
        }
    }

    #[test]
    fn test_records_per_output() {
        let buffer = RecordBuffer::new();
        let mut sink = InspectorSink::new(
            InspectorMode::WithData,
            ClockConfig::from_mhz(80),
            buffer.clone(),
        );
        let nd = node(1);
        let a = [1u8, 2];
        let b = [3u8, 4];
        let views = [
            TensorView::new(1, layout(), &a).unwrap(),
            TensorView::new(2, layout(), &b).unwrap(),
        ];
        sink.on_event(&post_event(&nd, &views));

        let records = buffer.take();
        assert_eq!(records.len(), 2);
        assert!(records[0].more_outputs);
        assert!(!records[1].more_outputs);
        assert!(records.iter().all(|r| r.last));
        assert_eq!(records[0].layer_kind, 2);
        assert_eq!(records[0].layer_name, "TD-Conv2D");
        assert_eq!(records[0].scale, 0.25);
        assert_eq!(records[0].zero_point, -3);
        assert_eq!(records[1].data.as_deref(), Some(&b[..]));
        assert!((records[0].duration_ms - 1.0).abs() < 1e-6);
        assert_eq!(sink.sent(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_without_data() {
        let buffer = RecordBuffer::new();
        let mut sink = InspectorSink::new(
            InspectorMode::WithoutData,
            ClockConfig::default(),
            buffer.clone(),
        );
        let nd = node(0);
        let a = [1u8, 2];
        let views = [TensorView::new(1, layout(), &a).unwrap()];
        sink.on_event(&post_event(&nd, &views));
        assert_eq!(buffer.take()[0].data, None);
    }

    #[test]
    fn test_pre_events_ignored() {
        let buffer = RecordBuffer::new();
        let mut sink = InspectorSink::new(InspectorMode::WithData, ClockConfig::default(), buffer.clone());
        let nd = node(0);
        sink.on_event(&NodeEvent {
            flags: EventFlags::PRE,
            node: &nd,
            duration: None,
            outputs: &[],
        });
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_json_lines() {
        let mut out = JsonLines::new(Vec::new());
        let record = NodeRecord {
            node_id: 0,
            layer_kind: 1,
            layer_name: "Dense".into(),
            last: true,
            more_outputs: false,
            output_index: 3,
            duration_ms: 0.5,
            layout: layout(),
            scale: 0.25,
            zero_point: -3,
            data: None,
        };
        out.push(record.clone()).unwrap();
        out.push(record.clone()).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let back: NodeRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(back, record);
        assert!(!lines[0].contains("\"data\""));
    }
}
