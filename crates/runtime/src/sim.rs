// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Synthetic engines for host-side runs.
//!
//! Both engines execute a validated [`ModelGraph`] by advancing a
//! [`SimulatedCounter`] by the node costs from the model image, so every
//! timing figure a session reports is deterministic. They also touch a
//! shared [`StackRegion`] per node and fill outputs with a pattern derived
//! from the inputs.

use crate::backend::{Backend, BackendFactory};
use crate::portable::{
    ArenaTensor, InterpreterEngine, InterpreterNode, PortableAdapter, PortableTensorInfo,
    Profiler, TensorContext,
};
use crate::vendor::{VendorAdapter, VendorEngine, VendorHook, VendorNode, VendorNodeInfo};
use crate::{EngineFault, SessionError};
use cycle_clock::SimulatedCounter;
use memory_manager::{ActivationSource, MemoryError, TensorArena};
use model_ir::graph::Validated;
use model_ir::{GraphHeader, ModelFormat, ModelGraph, ModelReport, TensorDescriptor, Version};
use observer::EventFlags;
use resource_monitor::StackRegion;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tensor_core::TensorView;

/// Version the synthetic vendor runtime reports.
pub const VENDOR_RUNTIME_VERSION: Version = Version::new(7, 0, 0);

/// Version the synthetic interpreter reports.
pub const PORTABLE_RUNTIME_VERSION: Version = Version::new(2, 16, 1);

/// Fault code of an injected failure.
pub const SIM_FAULT_CODE: i32 = 0x11;

// ── Shared control ─────────────────────────────────────────────────

/// Run counter and fault injection shared by a platform and its engines.
#[derive(Debug)]
pub struct SimControl {
    runs: AtomicU32,
    /// 1-based run call that fails, 0 for none.
    fail_at: AtomicU32,
    batches: AtomicU32,
}

impl Default for SimControl {
    fn default() -> Self {
        Self {
            runs: AtomicU32::new(0),
            fail_at: AtomicU32::new(0),
            batches: AtomicU32::new(1),
        }
    }
}

impl SimControl {
    /// Run calls made so far, failed ones included.
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::Acquire)
    }

    /// Make the `run`-th run call (1-based, counted from engine creation)
    /// fail. `None` disarms.
    pub fn fail_run_at(&self, run: Option<u32>) {
        self.fail_at.store(run.unwrap_or(0), Ordering::Release);
    }

    /// Batches the vendor engine reports per run.
    pub fn set_batches(&self, batches: u32) {
        self.batches.store(batches, Ordering::Release);
    }

    fn begin_run(&self) -> Result<u32, EngineFault> {
        let run = self.runs.fetch_add(1, Ordering::AcqRel) + 1;
        if run == self.fail_at.load(Ordering::Acquire) {
            tracing::debug!(run, "injected engine fault");
            return Err(EngineFault::new(SIM_FAULT_CODE, format!("injected fault at run {run}")));
        }
        Ok(self.batches.load(Ordering::Acquire))
    }
}

// ── Platform and factory ───────────────────────────────────────────

/// A simulated board: one cycle counter, an optional stack region and
/// the engines' control block.
#[derive(Debug, Clone, Default)]
pub struct SimPlatform {
    counter: SimulatedCounter,
    stack: Option<StackRegion>,
    control: Arc<SimControl>,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engines touch `region` as they execute nodes.
    pub fn with_stack(mut self, region: StackRegion) -> Self {
        self.stack = Some(region);
        self
    }

    pub fn counter(&self) -> &SimulatedCounter {
        &self.counter
    }

    pub fn stack_region(&self) -> Option<&StackRegion> {
        self.stack.as_ref()
    }

    pub fn control(&self) -> &SimControl {
        &self.control
    }

    pub fn fail_run_at(&self, run: Option<u32>) {
        self.control.fail_run_at(run);
    }

    pub fn set_batches(&self, batches: u32) {
        self.control.set_batches(batches);
    }

    pub fn factory(&self) -> SimFactory {
        SimFactory {
            counter: self.counter.clone(),
            stack: self.stack.clone(),
            control: Arc::clone(&self.control),
        }
    }
}

/// [`BackendFactory`] producing synthetic engines.
#[derive(Debug, Clone)]
pub struct SimFactory {
    counter: SimulatedCounter,
    stack: Option<StackRegion>,
    control: Arc<SimControl>,
}

impl BackendFactory for SimFactory {
    fn create(
        &self,
        kind: ModelFormat,
        graph: ModelGraph<Validated>,
    ) -> Result<Box<dyn Backend>, SessionError> {
        let (counter, stack, control) = (
            self.counter.clone(),
            self.stack.clone(),
            Arc::clone(&self.control),
        );
        Ok(match kind {
            ModelFormat::Vendor => Box::new(VendorAdapter::create(SimVendorEngine::new(
                graph, counter, stack, control,
            ))?),
            ModelFormat::Portable => Box::new(PortableAdapter::create(SimInterpreter::new(
                graph, counter, stack, control,
            ))?),
        })
    }
}

// ── Common execution helpers ───────────────────────────────────────

/// Stack bytes a node's call chain reaches.
fn node_stack_depth(index: usize) -> usize {
    256 + 64 * (index % 8)
}

fn touch_stack(stack: Option<&StackRegion>, index: usize) {
    if let Some(region) = stack {
        let depth = node_stack_depth(index).min(region.size());
        if let Err(e) = region.touch(depth) {
            tracing::trace!(error = %e, "stack touch failed");
        }
    }
}

/// Byte `j` of a node's output. Depends only on the inputs and position.
fn pattern(seed: u8, node: usize, j: usize) -> u8 {
    seed.wrapping_add(node as u8).wrapping_add(j as u8)
}

fn input_seed<'a>(inputs: impl IntoIterator<Item = &'a [u8]>) -> u8 {
    inputs
        .into_iter()
        .flatten()
        .fold(0u8, |acc, &b| acc.wrapping_add(b))
}

// ── Vendor engine ──────────────────────────────────────────────────

/// Synthetic vendor runtime. Intermediate tensors live in engine-owned
/// buffers and are pushed to the hook after each node.
pub struct SimVendorEngine {
    graph: ModelGraph<Validated>,
    counter: SimulatedCounter,
    stack: Option<StackRegion>,
    control: Arc<SimControl>,
    buffers: Vec<Vec<u8>>,
    activations: Option<ActivationSource>,
}

impl SimVendorEngine {
    pub fn new(
        graph: ModelGraph<Validated>,
        counter: SimulatedCounter,
        stack: Option<StackRegion>,
        control: Arc<SimControl>,
    ) -> Self {
        let buffers = graph
            .tensors()
            .iter()
            .map(|t| vec![0; t.layout.size_bytes])
            .collect();
        Self {
            graph,
            counter,
            stack,
            control,
            buffers,
            activations: None,
        }
    }

    pub fn activations(&self) -> Option<ActivationSource> {
        self.activations
    }
}

impl VendorEngine for SimVendorEngine {
    fn info(&self) -> Result<ModelReport, EngineFault> {
        Ok(self.graph.report(VENDOR_RUNTIME_VERSION, None))
    }

    fn ext_activations_addr(&self) -> Option<u32> {
        self.graph.header.ext_activations_addr
    }

    fn init(&mut self, activations: ActivationSource) -> Result<(), EngineFault> {
        self.activations = Some(activations);
        Ok(())
    }

    fn node_info(&self, c_idx: u16) -> Option<VendorNodeInfo> {
        let node = self.graph.node(usize::from(c_idx))?;
        Some(VendorNodeInfo {
            node: VendorNode {
                c_idx,
                type_code: u16::try_from(node.code).ok()?,
                id: i16::try_from(node.id).ok()?,
            },
            name: node.name.clone(),
            outputs: node.outputs.clone(),
        })
    }

    fn run(
        &mut self,
        inputs: &[&[u8]],
        outputs: &mut [Vec<u8>],
        mut hook: Option<&mut dyn VendorHook>,
    ) -> Result<u32, EngineFault> {
        let batches = self.control.begin_run()?;
        for (desc, data) in self.graph.inputs().zip(inputs.iter().copied()) {
            if desc.in_activations && data.is_empty() {
                continue;
            }
            match self.buffers.get_mut(desc.index) {
                Some(buf) if buf.len() == data.len() => buf.copy_from_slice(data),
                _ => {
                    return Err(EngineFault::new(
                        SIM_FAULT_CODE,
                        format!("input '{}' has the wrong size", desc.name),
                    ))
                }
            }
        }
        let seed = input_seed(
            self.graph
                .inputs()
                .filter_map(|desc| self.buffers.get(desc.index))
                .map(Vec::as_slice),
        );
        let sched = self.graph.header.sched_cycles;

        let n_executed = self.graph.executed_nodes().count();
        for (ordinal, (node, cost)) in self.graph.executed_nodes().enumerate() {
            let native = VendorNode {
                c_idx: u16::try_from(node.index).unwrap_or(u16::MAX),
                type_code: u16::try_from(node.code).unwrap_or(0),
                id: i16::try_from(node.id).unwrap_or(-1),
            };
            let position = EventFlags::position(ordinal, n_executed);

            self.counter.advance(sched);
            if let Some(h) = hook.as_deref_mut() {
                h.on_node(EventFlags::PRE | position, &native, &[]);
            }

            self.counter.advance(cost.cycles);
            touch_stack(self.stack.as_ref(), node.index);
            for &t in &node.outputs {
                if let Some(buf) = self.buffers.get_mut(t) {
                    for (j, b) in buf.iter_mut().enumerate() {
                        *b = pattern(seed, node.index, j);
                    }
                }
            }

            if let Some(h) = hook.as_deref_mut() {
                let views: Vec<TensorView<'_>> = node
                    .outputs
                    .iter()
                    .filter_map(|&t| {
                        let desc = self.graph.tensor(t)?;
                        TensorView::new(t, desc.layout, self.buffers.get(t)?).ok()
                    })
                    .collect();
                h.on_node(EventFlags::POST | position, &native, &views);
            }
        }
        self.counter.advance(sched);

        for (out, desc) in outputs.iter_mut().zip(self.graph.outputs()) {
            out.clear();
            if desc.in_activations {
                continue;
            }
            if let Some(buf) = self.buffers.get(desc.index) {
                out.extend_from_slice(buf);
            }
        }
        Ok(batches)
    }

    fn input_buffer(&mut self, index: usize) -> Option<&mut [u8]> {
        self.activations?;
        let desc = self.graph.inputs().nth(index)?;
        if !desc.in_activations {
            return None;
        }
        self.buffers.get_mut(desc.index).map(Vec::as_mut_slice)
    }

    fn output_buffer(&self, index: usize) -> Option<&[u8]> {
        self.activations?;
        let desc = self.graph.outputs().nth(index)?;
        if !desc.in_activations {
            return None;
        }
        self.buffers.get(desc.index).map(Vec::as_slice)
    }

    fn destroy(&mut self) {
        self.activations = None;
        self.buffers.clear();
    }
}

// ── Portable interpreter ───────────────────────────────────────────

/// Synthetic micro-interpreter. Every tensor is placed in the arena.
pub struct SimInterpreter {
    graph: ModelGraph<Validated>,
    counter: SimulatedCounter,
    stack: Option<StackRegion>,
    control: Arc<SimControl>,
    arena: Option<TensorArena>,
    tensors: Vec<ArenaTensor>,
    input_ids: Vec<usize>,
    output_ids: Vec<usize>,
}

impl SimInterpreter {
    pub fn new(
        graph: ModelGraph<Validated>,
        counter: SimulatedCounter,
        stack: Option<StackRegion>,
        control: Arc<SimControl>,
    ) -> Self {
        let tensors = graph
            .tensors()
            .iter()
            .map(|t| ArenaTensor {
                layout: t.layout,
                region: None,
            })
            .collect();
        let input_ids = graph.inputs().map(|t| t.index).collect();
        let output_ids = graph.outputs().map(|t| t.index).collect();
        Self {
            graph,
            counter,
            stack,
            control,
            arena: None,
            tensors,
            input_ids,
            output_ids,
        }
    }

    fn info(&self, tensor: usize) -> Option<PortableTensorInfo> {
        let desc: &TensorDescriptor = self.graph.tensor(tensor)?;
        Some(PortableTensorInfo {
            index: desc.index,
            name: desc.name.clone(),
            type_code: desc.layout.dtype.portable_code()?,
            dims: self.graph.native_shape(tensor)?.dims().to_vec(),
            quant: desc.layout.quant,
        })
    }
}

impl InterpreterEngine for SimInterpreter {
    fn header(&self) -> &GraphHeader {
        &self.graph.header
    }

    fn runtime_version(&self) -> Version {
        PORTABLE_RUNTIME_VERSION
    }

    fn allocate(&mut self, mut arena: TensorArena) -> Result<(), MemoryError> {
        for tensor in &mut self.tensors {
            tensor.region = Some(arena.alloc_persistent(tensor.layout.size_bytes)?);
        }
        self.arena = Some(arena);
        Ok(())
    }

    fn arena_used_bytes(&self) -> Option<usize> {
        self.arena.as_ref().map(TensorArena::used_bytes)
    }

    fn operators_size(&self) -> usize {
        self.graph.n_nodes()
    }

    fn node_and_registration(&self, index: usize) -> Option<InterpreterNode> {
        let node = self.graph.node(index)?;
        Some(InterpreterNode {
            name: node.name.clone(),
            builtin_code: node.code,
            version: node.version,
            outputs: node.outputs.clone(),
        })
    }

    fn tensors_size(&self) -> usize {
        self.tensors.len()
    }

    fn inputs_size(&self) -> usize {
        self.input_ids.len()
    }

    fn outputs_size(&self) -> usize {
        self.output_ids.len()
    }

    fn input_info(&self, index: usize) -> Option<PortableTensorInfo> {
        self.info(*self.input_ids.get(index)?)
    }

    fn output_info(&self, index: usize) -> Option<PortableTensorInfo> {
        self.info(*self.output_ids.get(index)?)
    }

    fn input_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        let region = self.tensors.get(*self.input_ids.get(index)?)?.region?;
        self.arena.as_mut()?.slice_mut(region)
    }

    fn output_data(&self, index: usize) -> Option<&[u8]> {
        let region = self.tensors.get(*self.output_ids.get(index)?)?.region?;
        self.arena.as_ref()?.slice(region)
    }

    fn invoke(&mut self, mut profiler: Option<&mut dyn Profiler>) -> Result<(), EngineFault> {
        self.control.begin_run()?;
        let Self {
            graph,
            counter,
            stack,
            arena,
            tensors,
            input_ids,
            ..
        } = self;
        let arena = arena
            .as_mut()
            .ok_or_else(|| EngineFault::new(SIM_FAULT_CODE, "tensors not allocated"))?;

        let seed = input_seed(
            input_ids
                .iter()
                .filter_map(|&i| tensors.get(i)?.region)
                .filter_map(|r| arena.slice(r))
                .collect::<Vec<_>>(),
        );
        let sched = graph.header.sched_cycles;

        let n_executed = graph.executed_nodes().count();
        for (ordinal, (node, cost)) in graph.executed_nodes().enumerate() {
            let position = EventFlags::position(ordinal, n_executed);

            counter.advance(sched);
            if let Some(p) = profiler.as_deref_mut() {
                p.begin_event(node.index, position);
            }

            counter.advance(cost.cycles);
            touch_stack(stack.as_ref(), node.index);
            for &t in &node.outputs {
                let Some(region) = tensors.get(t).and_then(|at| at.region) else {
                    continue;
                };
                if let Some(buf) = arena.slice_mut(region) {
                    for (j, b) in buf.iter_mut().enumerate() {
                        *b = pattern(seed, node.index, j);
                    }
                }
            }

            if let Some(p) = profiler.as_deref_mut() {
                let mut ctx = TensorContext {
                    arena: &mut *arena,
                    tensors: tensors.as_slice(),
                };
                p.end_event(node.index, position, &mut ctx);
            }
        }
        counter.advance(sched);
        Ok(())
    }

    fn reset_all_variables(&mut self) -> Result<(), EngineFault> {
        let Some(arena) = self.arena.as_mut() else {
            return Ok(());
        };
        for (index, tensor) in self.tensors.iter().enumerate() {
            if self.input_ids.contains(&index) {
                continue;
            }
            if let Some(buf) = tensor.region.and_then(|r| arena.slice_mut(r)) {
                buf.fill(0);
            }
        }
        tracing::debug!(model = %self.graph.header.name, "variable tensors reset");
        Ok(())
    }

    fn destroy(&mut self) {
        self.arena = None;
        for tensor in &mut self.tensors {
            tensor.region = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{ModelLoader, ModelManifest};
    use resource_monitor::{PaintedStack, StackMonitor};

    fn graph(conditional_last: bool) -> ModelGraph<Validated> {
        let json = format!(
            r#"{{
                "name": "tiny",
                "format": "portable",
                "schema_version": 1,
                "macc": 100,
                "activations_bytes": 0,
                "sched_cycles": 2,
                "tensors": [
                    {{ "name": "in", "dtype": "u8", "shape": [1, 4] }},
                    {{ "name": "mid", "dtype": "u8", "shape": [1, 4] }},
                    {{ "name": "out", "dtype": "u8", "shape": [1, 4] }}
                ],
                "inputs": [0],
                "outputs": [2],
                "nodes": [
                    {{ "name": "a", "code": 19, "outputs": [1], "cost_cycles": 10 }},
                    {{ "name": "b", "code": 19, "outputs": [2], "cost_cycles": 20,
                       "conditional": {conditional_last} }}
                ]
            }}"#
        );
        ModelLoader::from_manifest(&ModelManifest::from_json(&json).unwrap()).unwrap()
    }

    #[test]
    fn test_interpreter_advances_counter() {
        let counter = SimulatedCounter::new();
        let mut e = SimInterpreter::new(graph(false), counter.clone(), None, Arc::default());
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        e.input_mut(0).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        e.invoke(None).unwrap();
        assert_eq!(counter.total(), 2 + 10 + 2 + 20 + 2);
        assert_eq!(e.output_data(0).unwrap(), &[11, 12, 13, 14]);
    }

    #[test]
    fn test_interpreter_reports_declared_rank() {
        let mut e = SimInterpreter::new(graph(false), SimulatedCounter::new(), None, Arc::default());
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        assert_eq!(e.input_info(0).unwrap().dims, vec![1, 4]);
        assert_eq!(e.output_info(0).unwrap().dims, vec![1, 4]);
    }

    #[test]
    fn test_conditional_node_skipped() {
        let counter = SimulatedCounter::new();
        let mut e = SimInterpreter::new(graph(true), counter.clone(), None, Arc::default());
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        e.invoke(None).unwrap();
        assert_eq!(counter.total(), 2 + 10 + 2);
        assert_eq!(e.output_data(0).unwrap(), &[0; 4]);
    }

    #[test]
    fn test_reset_zeroes_all_but_inputs() {
        let mut e = SimInterpreter::new(graph(false), SimulatedCounter::new(), None, Arc::default());
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        e.input_mut(0).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        e.invoke(None).unwrap();
        let mid = e.tensors[1].region.unwrap();
        assert_eq!(e.arena.as_ref().unwrap().slice(mid).unwrap(), &[10, 11, 12, 13]);

        e.reset_all_variables().unwrap();
        assert_eq!(e.arena.as_ref().unwrap().slice(mid).unwrap(), &[0; 4]);
        assert_eq!(e.output_data(0).unwrap(), &[0; 4]);
        assert_eq!(&*e.input_mut(0).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_injected_fault() {
        let control = Arc::new(SimControl::default());
        control.fail_run_at(Some(2));
        let mut e = SimInterpreter::new(graph(false), SimulatedCounter::new(), None, Arc::clone(&control));
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        e.invoke(None).unwrap();
        let err = e.invoke(None).unwrap_err();
        assert_eq!(err.code, SIM_FAULT_CODE);
        e.invoke(None).unwrap();
        assert_eq!(control.runs(), 3);
    }

    #[test]
    fn test_stack_touched() {
        let region = StackRegion::new(4096).unwrap();
        let mut monitor = PaintedStack::new(region.clone());
        monitor.mark().unwrap();
        let mut e = SimInterpreter::new(graph(false), SimulatedCounter::new(), Some(region), Arc::default());
        e.allocate(TensorArena::new(256, 16).unwrap()).unwrap();
        e.invoke(None).unwrap();
        assert_eq!(monitor.evaluate().unwrap().used, node_stack_depth(1));
    }

    #[test]
    fn test_vendor_batches_from_control() {
        let mut m = ModelManifest::from_json(
            &serde_json::to_string(&serde_json::json!({
                "name": "v", "format": "vendor", "schema_version": 1, "macc": 1,
                "activations_bytes": 4,
                "tensors": [ { "name": "in", "dtype": "u8", "shape": [1, 4] } ],
                "inputs": [0], "outputs": [0],
                "nodes": [ { "name": "n", "code": 5, "outputs": [0], "cost_cycles": 7 } ]
            }))
            .unwrap(),
        )
        .unwrap();
        m.sched_cycles = 1;
        let g = ModelLoader::from_manifest(&m).unwrap();
        let control = Arc::new(SimControl::default());
        control.set_batches(2);
        let mut e = SimVendorEngine::new(g, SimulatedCounter::new(), None, control);
        let mut out = vec![Vec::new()];
        assert_eq!(e.run(&[&[0u8; 4]], &mut out, None).unwrap(), 2);
        assert_eq!(out[0], vec![0, 1, 2, 3]);
    }
}
