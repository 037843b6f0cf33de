// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Adapter for the portable micro-interpreter.
//!
//! The interpreter owns a single tensor arena and reports node execution
//! through a profiler with `begin_event` / `end_event` hooks. Output
//! tensors are not pushed: the adapter pulls them on POST, materializing
//! the tensor headers in a temporary arena scope that is released before
//! `end_event` returns.

use crate::backend::{check_inputs, Backend, InitParams, RunStatus};
use crate::{EngineFault, SessionError};
use memory_manager::{ArenaRegion, MemoryError, TensorArena};
use model_ir::{
    GraphHeader, ModelFormat, ModelReport, NodeDescriptor, TensorDescriptor, Version,
};
use observer::{
    EventFlags, NoOutputs, Observer, ObserverError, ObserverId, ObserverOptions, ObserverSlot,
    OutputSource,
};
use tensor_core::{DType, Quantization, Shape, TensorError, TensorLayout, TensorView};

/// Outputs materialized per node event. Extra outputs are not reported.
pub const MAX_NODE_OUTPUTS: usize = 10;

/// Temporary arena bytes taken by one materialized tensor header.
pub const TEMP_TENSOR_BYTES: usize = 64;

// ── Native interpreter types ───────────────────────────────────────

/// Tensor metadata as the interpreter exposes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortableTensorInfo {
    /// Index in the interpreter's tensor table.
    pub index: usize,
    pub name: String,
    /// Native element type code.
    pub type_code: u32,
    /// Dimensions in native rank.
    pub dims: Vec<usize>,
    pub quant: Option<Quantization>,
}

impl PortableTensorInfo {
    pub fn layout(&self) -> Result<TensorLayout, TensorError> {
        let dtype = DType::from_portable_code(self.type_code)?;
        TensorLayout::from_native(dtype, &Shape::new(self.dims.clone()), self.quant)
    }

    fn descriptor(&self) -> Result<TensorDescriptor, SessionError> {
        let layout = self.layout().map_err(|e| {
            SessionError::Info(format!("tensor '{}': {e}", self.name))
        })?;
        Ok(TensorDescriptor {
            index: self.index,
            name: self.name.clone(),
            layout,
            in_activations: false,
        })
    }
}

/// A tensor placed in the arena. `region` is `None` for tensors whose
/// data lives outside the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaTensor {
    pub layout: TensorLayout,
    pub region: Option<ArenaRegion>,
}

/// What `end_event` can reach: the arena and the tensor table.
pub struct TensorContext<'a> {
    pub arena: &'a mut TensorArena,
    pub tensors: &'a [ArenaTensor],
}

/// Operator and registration of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterNode {
    pub name: String,
    pub builtin_code: u32,
    pub version: u32,
    pub outputs: Vec<usize>,
}

/// Profiler interface of the interpreter. Events arrive in node order,
/// `begin_event` before the kernel and `end_event` after it.
///
/// `position` carries FIRST and LAST for the first and last node the
/// interpreter actually executes; skipped nodes produce no events.
pub trait Profiler {
    fn begin_event(&mut self, node_idx: usize, position: EventFlags);
    fn end_event(&mut self, node_idx: usize, position: EventFlags, ctx: &mut TensorContext<'_>);
}

/// Capability set of the portable interpreter.
pub trait InterpreterEngine: Send {
    fn header(&self) -> &GraphHeader;

    fn runtime_version(&self) -> Version;

    /// Takes ownership of the arena and places every tensor in it.
    fn allocate(&mut self, arena: TensorArena) -> Result<(), MemoryError>;

    /// Arena bytes in use after allocation.
    fn arena_used_bytes(&self) -> Option<usize>;

    fn operators_size(&self) -> usize;

    fn node_and_registration(&self, index: usize) -> Option<InterpreterNode>;

    fn tensors_size(&self) -> usize;

    fn inputs_size(&self) -> usize;

    fn outputs_size(&self) -> usize;

    fn input_info(&self, index: usize) -> Option<PortableTensorInfo>;

    fn output_info(&self, index: usize) -> Option<PortableTensorInfo>;

    /// Writable input buffer. `None` before allocation.
    fn input_mut(&mut self, index: usize) -> Option<&mut [u8]>;

    fn output_data(&self, index: usize) -> Option<&[u8]>;

    fn invoke(&mut self, profiler: Option<&mut dyn Profiler>) -> Result<(), EngineFault>;

    /// Zeroes variable tensors (recurrent state).
    fn reset_all_variables(&mut self) -> Result<(), EngineFault>;

    fn destroy(&mut self);
}

// ── PortableAdapter ────────────────────────────────────────────────

/// [`Backend`] over an [`InterpreterEngine`].
pub struct PortableAdapter<E: InterpreterEngine> {
    engine: E,
    nodes: Vec<NodeDescriptor>,
    inputs: Vec<TensorDescriptor>,
    outputs: Vec<TensorDescriptor>,
    slot: ObserverSlot,
    allocated: bool,
    destroyed: bool,
}

impl<E: InterpreterEngine> PortableAdapter<E> {
    /// Reads the operator table and the I/O tensor metadata.
    pub fn create(engine: E) -> Result<Self, SessionError> {
        let nodes = (0..engine.operators_size())
            .map(|index| {
                let node = engine
                    .node_and_registration(index)
                    .ok_or_else(|| SessionError::Info(format!("no registration for node {index}")))?;
                Ok(NodeDescriptor {
                    index,
                    name: node.name,
                    format: ModelFormat::Portable,
                    code: node.builtin_code,
                    version: node.version,
                    id: i32::try_from(index).unwrap_or(i32::MAX),
                    outputs: node.outputs,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?;

        let inputs = (0..engine.inputs_size())
            .map(|i| {
                engine
                    .input_info(i)
                    .ok_or_else(|| SessionError::Info(format!("no info for input {i}")))?
                    .descriptor()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = (0..engine.outputs_size())
            .map(|i| {
                engine
                    .output_info(i)
                    .ok_or_else(|| SessionError::Info(format!("no info for output {i}")))?
                    .descriptor()
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            model = %engine.header().name,
            nodes = nodes.len(),
            tensors = engine.tensors_size(),
            "portable interpreter created"
        );
        Ok(Self {
            engine,
            nodes,
            inputs,
            outputs,
            slot: ObserverSlot::default(),
            allocated: false,
            destroyed: false,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: InterpreterEngine> Backend for PortableAdapter<E> {
    fn kind(&self) -> ModelFormat {
        ModelFormat::Portable
    }

    fn init(&mut self, params: InitParams) -> Result<(), SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        let arena = TensorArena::new(params.arena_size, TensorArena::PORTABLE_ALIGN)?;
        self.engine.allocate(arena)?;
        self.allocated = true;
        tracing::info!(
            used = self.engine.arena_used_bytes().unwrap_or(0),
            capacity = params.arena_size,
            "tensor arena allocated"
        );
        Ok(())
    }

    fn report(&self) -> Result<ModelReport, SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        let header = self.engine.header();
        Ok(ModelReport {
            name: header.name.clone(),
            format: ModelFormat::Portable,
            signature: header
                .signature
                .clone()
                .unwrap_or_else(|| "0x00000000".to_string()),
            runtime_version: self.engine.runtime_version(),
            tool_version: header.tool_version,
            n_nodes: self.nodes.len(),
            n_tensors: self.engine.tensors_size(),
            macc: header.macc,
            activations_bytes: header.activations_bytes,
            weights_bytes: header.weights_bytes,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            arena_used_bytes: self.engine.arena_used_bytes(),
        })
    }

    fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    fn run(&mut self, inputs: &[&[u8]], outputs: &mut [Vec<u8>]) -> Result<RunStatus, SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        if !self.allocated {
            return Err(SessionError::Init("tensors not allocated".into()));
        }
        check_inputs(&self.inputs, inputs)?;

        for (index, data) in inputs.iter().enumerate() {
            let dst = self.engine.input_mut(index).ok_or_else(|| SessionError::Input {
                index,
                detail: "input buffer unavailable".into(),
            })?;
            if dst.len() != data.len() {
                return Err(SessionError::Input {
                    index,
                    detail: format!("engine buffer holds {} bytes, {} supplied", dst.len(), data.len()),
                });
            }
            dst.copy_from_slice(data);
        }

        let (result, timing) = match self.slot.active_mut() {
            Some(observer) => {
                observer.begin_invocation();
                let mut bridge = ProfilerBridge {
                    observer: &mut *observer,
                    nodes: &self.nodes,
                };
                let result = self.engine.invoke(Some(&mut bridge));
                (result, Some(observer.end_invocation()))
            }
            None => (self.engine.invoke(None), None),
        };
        result.map_err(|e| SessionError::Invoke {
            iteration: 0,
            detail: e.to_string(),
        })?;

        for (index, out) in outputs.iter_mut().enumerate().take(self.outputs.len()) {
            let data = self.engine.output_data(index).ok_or_else(|| SessionError::Invoke {
                iteration: 0,
                detail: format!("output {index} unavailable"),
            })?;
            out.clear();
            out.extend_from_slice(data);
        }
        Ok(RunStatus {
            batches: 1,
            timing,
        })
    }

    fn register_observer(&mut self, options: ObserverOptions) -> Result<ObserverId, ObserverError> {
        self.slot.register(options, self.nodes.len())
    }

    fn unregister_observer(&mut self, id: ObserverId) -> Result<Observer, ObserverError> {
        self.slot.unregister(id)
    }

    fn observer(&self) -> Option<&Observer> {
        self.slot.active()
    }

    fn reset_state(&mut self) -> Result<(), SessionError> {
        self.engine
            .reset_all_variables()
            .map_err(|e| SessionError::Init(e.to_string()))
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.engine.destroy();
        self.destroyed = true;
        tracing::info!(model = %self.engine.header().name, "portable interpreter destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl<E: InterpreterEngine> Drop for PortableAdapter<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

// ── Profiler bridge ────────────────────────────────────────────────

struct ProfilerBridge<'a> {
    observer: &'a mut Observer,
    nodes: &'a [NodeDescriptor],
}

impl Profiler for ProfilerBridge<'_> {
    fn begin_event(&mut self, node_idx: usize, position: EventFlags) {
        if let Some(node) = self.nodes.get(node_idx) {
            let flags = EventFlags::PRE | position;
            self.observer.on_event(flags, node, &mut NoOutputs);
        }
    }

    fn end_event(&mut self, node_idx: usize, position: EventFlags, ctx: &mut TensorContext<'_>) {
        if let Some(node) = self.nodes.get(node_idx) {
            let flags = EventFlags::POST | position;
            let mut outputs = ArenaOutputs { ctx, node };
            self.observer.on_event(flags, node, &mut outputs);
        }
    }
}

/// Pulls a node's outputs out of the arena on demand.
struct ArenaOutputs<'c, 'a> {
    ctx: &'c mut TensorContext<'a>,
    node: &'c NodeDescriptor,
}

impl OutputSource for ArenaOutputs<'_, '_> {
    fn visit(&mut self, f: &mut dyn FnMut(&[TensorView<'_>])) {
        let wanted = &self.node.outputs[..self.node.outputs.len().min(MAX_NODE_OUTPUTS)];
        if self.node.outputs.len() > MAX_NODE_OUTPUTS {
            tracing::debug!(
                node = self.node.index,
                outputs = self.node.outputs.len(),
                "output list truncated"
            );
        }

        let tensors = self.ctx.tensors;
        let mut scope = self.ctx.arena.temp_scope();
        for _ in wanted {
            if let Err(e) = scope.alloc(TEMP_TENSOR_BYTES) {
                tracing::warn!(node = self.node.index, error = %e, "no temp memory for output tensors");
                drop(scope);
                f(&[]);
                return;
            }
        }

        let views: Vec<TensorView<'_>> = wanted
            .iter()
            .filter_map(|&t| tensors.get(t).map(|at| (t, at)))
            .map(|(t, at)| {
                at.region
                    .and_then(|r| scope.slice(r))
                    .and_then(|data| TensorView::new(t, at.layout, data).ok())
                    .unwrap_or_else(|| TensorView::layout_only(t, at.layout))
            })
            .collect();
        f(&views);
    }
}
