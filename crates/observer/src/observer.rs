// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The observer callback.
//!
//! Timing model for one invocation, with `mark` the exit timestamp of the
//! previous callback (or the invocation start):
//!
//! ```text
//!  begin    PRE(0)        POST(0)       PRE(1)        POST(1)       end
//!    |--eng--[cb]---node---[cb]---eng---[cb]---node---[cb]---eng---|
//! ```
//!
//! Every segment lands in exactly one of `engine_dur`, `cb_dur` or
//! `node_dur`, so their sum equals the invocation window. The hardware
//! counter is never restarted from inside the callback: the session's
//! window keeps running while `mark` plays the role of the restart.

use crate::event::{NodeEvent, NodeSink, OutputSource};
use crate::{EventFlags, NodeTimingTable, ObserverFlags};
use cycle_clock::TimeSource;
use model_ir::NodeDescriptor;

/// Aggregates since the last [`Observer::start`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProfileInfo {
    /// Cycles spent inside the callback.
    pub cb_dur: u64,
    /// Cycles spent inside node kernels.
    pub node_dur: u64,
    /// Engine scheduling cycles outside any node.
    pub engine_dur: u64,
    /// PRE and POST events observed.
    pub n_events: u64,
    /// Completed invocations.
    pub n_invoks: u32,
}

/// Breakdown of a single invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct InvocationTiming {
    pub node_dur: u64,
    pub cb_dur: u64,
    pub engine_dur: u64,
}

impl InvocationTiming {
    /// The full invocation window.
    pub fn total(&self) -> u64 {
        self.node_dur + self.cb_dur + self.engine_dur
    }

    /// The window without observer overhead.
    pub fn pure(&self) -> u64 {
        self.node_dur + self.engine_dur
    }
}

/// A registered observer. Obtained from
/// [`ObserverSlot::register`](crate::ObserverSlot::register).
pub struct Observer {
    time: Box<dyn TimeSource>,
    flags: ObserverFlags,
    table: Option<NodeTimingTable>,
    sink: Option<Box<dyn NodeSink>>,
    n_nodes: usize,
    info: ProfileInfo,
    current: InvocationTiming,
    mark: u64,
}

impl Observer {
    pub(crate) fn new(
        time: Box<dyn TimeSource>,
        flags: ObserverFlags,
        table: Option<NodeTimingTable>,
        sink: Option<Box<dyn NodeSink>>,
        n_nodes: usize,
    ) -> Self {
        Self {
            time,
            flags,
            table,
            sink,
            n_nodes,
            info: ProfileInfo::default(),
            current: InvocationTiming::default(),
            mark: 0,
        }
    }

    /// Opens a new observation window: zeroes the aggregates and every
    /// node slot.
    pub fn start(&mut self) {
        self.info = ProfileInfo::default();
        self.current = InvocationTiming::default();
        if let Some(table) = self.table.as_mut() {
            if let Err(e) = table.reset(self.n_nodes) {
                tracing::warn!(error = %e, "node timing table dropped; continuing without per-node detail");
                self.table = None;
            }
        }
    }

    /// Marks the start of an engine run call.
    pub fn begin_invocation(&mut self) {
        self.current = InvocationTiming::default();
        self.mark = self.time.now();
    }

    /// Handles one PRE or POST event.
    ///
    /// `outputs` is only visited on POST events, when a sink wants
    /// tensors and the observer is not time-only.
    pub fn on_event(
        &mut self,
        flags: EventFlags,
        node: &NodeDescriptor,
        outputs: &mut dyn OutputSource,
    ) {
        let ts = self.time.now();
        let elapsed = ts.saturating_sub(self.mark);
        let mut duration = None;

        if flags.is_post() {
            self.current.node_dur += elapsed;
            self.info.node_dur += elapsed;
            if let Some(table) = self.table.as_mut() {
                table.accumulate(node.index, elapsed);
            }
            duration = Some(elapsed);
        } else {
            self.current.engine_dur += elapsed;
            self.info.engine_dur += elapsed;
        }
        self.info.n_events += 1;

        if let Some(sink) = self.sink.as_mut() {
            let want = flags.is_post() && !self.flags.is_time_only() && sink.wants_outputs();
            if want {
                outputs.visit(&mut |views| {
                    sink.on_event(&NodeEvent {
                        flags,
                        node,
                        duration,
                        outputs: views,
                    })
                });
            } else {
                sink.on_event(&NodeEvent {
                    flags,
                    node,
                    duration,
                    outputs: &[],
                });
            }
        }

        let exit = self.time.now();
        let cb = exit.saturating_sub(ts);
        self.current.cb_dur += cb;
        self.info.cb_dur += cb;
        self.mark = exit;
    }

    /// Marks the return of the engine run call and closes the invocation.
    pub fn end_invocation(&mut self) -> InvocationTiming {
        let now = self.time.now();
        let tail = now.saturating_sub(self.mark);
        self.current.engine_dur += tail;
        self.info.engine_dur += tail;
        self.info.n_invoks += 1;
        self.mark = now;
        tracing::trace!(
            node = self.current.node_dur,
            cb = self.current.cb_dur,
            engine = self.current.engine_dur,
            "invocation closed"
        );
        self.current
    }

    pub fn info(&self) -> ProfileInfo {
        self.info
    }

    pub fn flags(&self) -> ObserverFlags {
        self.flags
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// The node table, absent when it could not be allocated.
    pub fn table(&self) -> Option<&NodeTimingTable> {
        self.table.as_ref()
    }

    /// Bytes held by observer bookkeeping.
    pub fn footprint_bytes(&self) -> usize {
        self.table.as_ref().map_or(0, NodeTimingTable::footprint_bytes)
    }

    /// Releases the sink, e.g. to recover buffered records.
    pub fn into_sink(self) -> Option<Box<dyn NodeSink>> {
        self.sink
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("flags", &self.flags)
            .field("n_nodes", &self.n_nodes)
            .field("info", &self.info)
            .field("table", &self.table.as_ref().map(NodeTimingTable::len))
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoOutputs, ObserverOptions, PushedOutputs};
    use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};
    use model_ir::ModelFormat;
    use std::sync::{Arc, Mutex};
    use tensor_core::{DType, Shape4, TensorLayout, TensorView};

    fn node(index: usize) -> NodeDescriptor {
        NodeDescriptor {
            index,
            name: format!("n{index}"),
            format: ModelFormat::Portable,
            code: 3,
            version: 1,
            id: index as i32,
            outputs: vec![index + 1],
        }
    }

    fn clock() -> (SimulatedCounter, CycleClock) {
        let counter = SimulatedCounter::new();
        let clock = CycleClock::new(counter.clone(), ClockConfig::default()).unwrap();
        clock.start();
        (counter, clock)
    }

    /// Drives one invocation: `gap` engine cycles before each node and
    /// after the last, `costs[i]` cycles inside node `i`.
    fn invoke(obs: &mut Observer, counter: &SimulatedCounter, costs: &[u64], gap: u64) -> InvocationTiming {
        let n = costs.len();
        obs.begin_invocation();
        for (i, &cost) in costs.iter().enumerate() {
            let nd = node(i);
            let pos = EventFlags::position(i, n);
            counter.advance(gap);
            obs.on_event(EventFlags::PRE | pos, &nd, &mut NoOutputs);
            counter.advance(cost);
            obs.on_event(EventFlags::POST | pos, &nd, &mut NoOutputs);
        }
        counter.advance(gap);
        obs.end_invocation()
    }

    #[test]
    fn test_decomposition_is_exact() {
        let (counter, clock) = clock();
        let sim = counter.clone();
        let mut obs = ObserverOptions::new()
            .time_source(clock.clone())
            .sink(move |_: &NodeEvent<'_>| sim.advance(7))
            .build(3)
            .unwrap();
        obs.start();

        let before = clock.elapsed();
        let t = invoke(&mut obs, &counter, &[120, 40, 900], 5);
        let window = clock.elapsed() - before;

        assert_eq!(t.node_dur, 1060);
        assert_eq!(t.cb_dur, 6 * 7);
        assert_eq!(t.engine_dur, 4 * 5);
        assert_eq!(t.total(), window);
        assert_eq!(obs.info().n_events, 6);
        assert_eq!(obs.info().n_invoks, 1);
    }

    #[test]
    fn test_no_gaps_total_is_node_plus_cb() {
        let (counter, clock) = clock();
        let sim = counter.clone();
        let mut obs = ObserverOptions::new()
            .time_source(clock)
            .sink(move |_: &NodeEvent<'_>| sim.advance(10))
            .build(2)
            .unwrap();
        obs.start();
        for _ in 0..4 {
            let t = invoke(&mut obs, &counter, &[100, 100], 0);
            assert_eq!(t.total(), t.node_dur + t.cb_dur);
        }
        let info = obs.info();
        assert_eq!(info.node_dur, 800);
        assert_eq!(info.cb_dur, 160);
        assert_eq!(info.engine_dur, 0);
        let table = obs.table().unwrap();
        assert!(table.stats().iter().all(|s| s.runs == 4));
    }

    #[test]
    fn test_start_clears_window() {
        let (counter, clock) = clock();
        let mut obs = ObserverOptions::new().time_source(clock).build(2).unwrap();
        obs.start();
        invoke(&mut obs, &counter, &[10, 20], 1);
        obs.start();
        assert_eq!(obs.info(), ProfileInfo::default());
        assert_eq!(obs.table().unwrap().total_cycles(), 0);
    }

    #[test]
    fn test_outputs_reach_sink_on_post_only() {
        let (counter, clock) = clock();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut obs = ObserverOptions::new()
            .time_source(clock)
            .sink(move |e: &NodeEvent<'_>| {
                log.lock().unwrap().push((e.flags.is_post(), e.outputs.len(), e.duration));
            })
            .build(1)
            .unwrap();
        obs.start();

        let layout = TensorLayout::new(DType::I8, Shape4::new(1, 1, 1, 4), None);
        let data = [1u8, 2, 3, 4];
        let views = [TensorView::new(1, layout, &data).unwrap()];
        let nd = node(0);
        obs.begin_invocation();
        obs.on_event(EventFlags::PRE | EventFlags::FIRST, &nd, &mut PushedOutputs(&views));
        counter.advance(33);
        obs.on_event(EventFlags::POST | EventFlags::LAST, &nd, &mut PushedOutputs(&views));
        obs.end_invocation();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(false, 0, None), (true, 1, Some(33))]);
    }

    #[test]
    fn test_time_only_skips_outputs() {
        let (counter, clock) = clock();
        let seen = Arc::new(Mutex::new(0usize));
        let log = Arc::clone(&seen);
        let mut obs = ObserverOptions::new()
            .time_source(clock)
            .flags(ObserverFlags::TIME_ONLY)
            .sink(move |e: &NodeEvent<'_>| *log.lock().unwrap() += e.outputs.len())
            .build(1)
            .unwrap();
        obs.start();
        let layout = TensorLayout::new(DType::U8, Shape4::new(1, 1, 1, 1), None);
        let views = [TensorView::layout_only(0, layout)];
        let nd = node(0);
        obs.begin_invocation();
        obs.on_event(EventFlags::PRE, &nd, &mut NoOutputs);
        counter.advance(1);
        obs.on_event(EventFlags::POST, &nd, &mut PushedOutputs(&views));
        obs.end_invocation();
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn test_table_failure_degrades() {
        let (counter, clock) = clock();
        let mut obs = ObserverOptions::new()
            .time_source(clock)
            .table_limit(8)
            .build(64)
            .unwrap();
        assert!(obs.table().is_none());
        obs.start();
        let t = invoke(&mut obs, &counter, &[10; 64], 0);
        assert_eq!(t.node_dur, 640);
        assert_eq!(obs.footprint_bytes(), 0);
    }
}
