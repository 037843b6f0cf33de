// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model graph: nodes in execution order plus the tensor table.
//!
//! # Type-State Pattern
//!
//! ```text
//! ModelGraph<Loaded>     : built from a manifest, not yet checked.
//!       │  .validate()
//!       ▼
//! ModelGraph<Validated>  : indices, references and shapes verified.
//! ```
//!
//! Engines and sessions only accept a validated graph. The marker types
//! are `PhantomData`, so the transition costs nothing at runtime.

use crate::{
    ModelError, ModelFormat, ModelManifest, ModelReport, NodeDescriptor, TensorDescriptor,
    Version,
};
use std::fmt;
use tensor_core::{Shape, TensorLayout};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been built but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and can back an engine.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ModelGraph ─────────────────────────────────────────────────────

/// Header fields copied from the model image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphHeader {
    pub name: String,
    pub format: ModelFormat,
    pub signature: Option<String>,
    pub tool_version: Option<Version>,
    pub macc: u64,
    pub activations_bytes: usize,
    pub weights_bytes: usize,
    pub ext_activations_addr: Option<u32>,
    pub sched_cycles: u64,
}

/// Execution cost of one node on the synthetic engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeCost {
    pub cycles: u64,
    /// Never executes on the default path.
    pub conditional: bool,
}

/// A model as an ordered sequence of operator nodes.
///
/// The generic parameter `S` encodes the validation state at compile time.
#[derive(Debug, Clone)]
pub struct ModelGraph<S: GraphState = Loaded> {
    pub header: GraphHeader,
    nodes: Vec<NodeDescriptor>,
    costs: Vec<NodeCost>,
    tensors: Vec<TensorDescriptor>,
    /// Tensor dimensions in the rank the model declares.
    native_shapes: Vec<Shape>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    /// State marker (zero-sized, compile-time only).
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ModelGraph<Loaded> {
    /// Builds descriptors from a manifest. Tensor shapes are normalized
    /// here, so a rank the reports cannot express fails early.
    pub fn from_manifest(manifest: &ModelManifest) -> Result<Self, ModelError> {
        let tensors = manifest
            .tensors
            .iter()
            .enumerate()
            .map(|(index, t)| {
                let layout = TensorLayout::from_native(t.dtype, &t.shape, t.quant).map_err(|e| {
                    ModelError::InvalidTensor {
                        tensor: t.name.clone(),
                        detail: e.to_string(),
                    }
                })?;
                Ok(TensorDescriptor {
                    index,
                    name: t.name.clone(),
                    layout,
                    in_activations: t.in_activations,
                })
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let nodes = manifest
            .nodes
            .iter()
            .enumerate()
            .map(|(index, n)| {
                let mut code = n.code;
                if n.time_distributed {
                    code |= crate::TIME_DISTRIBUTED_BIT;
                }
                NodeDescriptor {
                    index,
                    name: n.name.clone(),
                    format: manifest.format,
                    code,
                    version: n.version,
                    id: n.id.unwrap_or(index as i32),
                    outputs: n.outputs.clone(),
                }
            })
            .collect();

        let costs = manifest
            .nodes
            .iter()
            .map(|n| NodeCost {
                cycles: n.cost_cycles,
                conditional: n.conditional,
            })
            .collect();

        let tool_version = manifest.tool_version.as_deref().and_then(Version::parse);

        let mut graph = Self::new(
            GraphHeader {
                name: manifest.name.clone(),
                format: manifest.format,
                signature: manifest.signature.clone(),
                tool_version,
                macc: manifest.macc,
                activations_bytes: manifest.activations_bytes,
                weights_bytes: manifest.weights_bytes,
                ext_activations_addr: manifest.ext_activations_addr,
                sched_cycles: manifest.sched_cycles,
            },
            nodes,
            costs,
            tensors,
            manifest.inputs.clone(),
            manifest.outputs.clone(),
        );
        graph.native_shapes = manifest.tensors.iter().map(|t| t.shape.clone()).collect();
        Ok(graph)
    }

    /// Creates a new graph in the `Loaded` state.
    pub fn new(
        header: GraphHeader,
        nodes: Vec<NodeDescriptor>,
        costs: Vec<NodeCost>,
        tensors: Vec<TensorDescriptor>,
        inputs: Vec<usize>,
        outputs: Vec<usize>,
    ) -> Self {
        let native_shapes = tensors
            .iter()
            .map(|t| {
                let s = t.layout.shape;
                Shape::new(vec![s.batch, s.height, s.width, s.channels])
            })
            .collect();
        Self {
            header,
            nodes,
            costs,
            tensors,
            native_shapes,
            inputs,
            outputs,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph is non-empty and has one cost entry per node.
    /// - Node indices are consecutive starting from 0.
    /// - Every output and I/O reference names an existing tensor.
    /// - No tensor has zero elements.
    pub fn validate(self) -> Result<ModelGraph<Validated>, ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model graph contains no nodes".into(),
            ));
        }
        if self.costs.len() != self.nodes.len() {
            return Err(ModelError::InvalidGraph(format!(
                "{} cost entries for {} nodes",
                self.costs.len(),
                self.nodes.len()
            )));
        }

        let n_tensors = self.tensors.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.index != i {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("expected index {i}, got {}", node.index),
                });
            }
            if node.outputs.iter().any(|&o| o >= n_tensors) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: "output tensor out of range".into(),
                });
            }
        }

        for t in &self.tensors {
            if t.layout.shape.num_elements() == 0 {
                return Err(ModelError::InvalidTensor {
                    tensor: t.name.clone(),
                    detail: "tensor has zero elements".into(),
                });
            }
        }

        if let Some(&bad) = self
            .inputs
            .iter()
            .chain(&self.outputs)
            .find(|&&i| i >= n_tensors)
        {
            return Err(ModelError::InvalidGraph(format!(
                "I/O tensor index {bad} out of range"
            )));
        }

        tracing::debug!(
            model = %self.header.name,
            nodes = self.nodes.len(),
            tensors = n_tensors,
            "model graph validated"
        );

        Ok(ModelGraph {
            header: self.header,
            nodes: self.nodes,
            costs: self.costs,
            tensors: self.tensors,
            native_shapes: self.native_shapes,
            inputs: self.inputs,
            outputs: self.outputs,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl ModelGraph<Validated> {
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns an iterator over the nodes in execution order.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &NodeDescriptor> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&NodeDescriptor> {
        self.nodes.get(index)
    }

    pub fn cost(&self, index: usize) -> Option<NodeCost> {
        self.costs.get(index).copied()
    }

    /// Nodes on the default execution path, in order. Conditional nodes
    /// are left out.
    pub fn executed_nodes(&self) -> impl Iterator<Item = (&NodeDescriptor, NodeCost)> {
        self.nodes
            .iter()
            .zip(self.costs.iter().copied())
            .filter(|(_, cost)| !cost.conditional)
    }

    pub fn tensor(&self, index: usize) -> Option<&TensorDescriptor> {
        self.tensors.get(index)
    }

    /// Dimensions of tensor `index` before normalization.
    pub fn native_shape(&self, index: usize) -> Option<&Shape> {
        self.native_shapes.get(index)
    }

    pub fn tensors(&self) -> &[TensorDescriptor] {
        &self.tensors
    }

    pub fn inputs(&self) -> impl Iterator<Item = &TensorDescriptor> {
        self.inputs.iter().filter_map(|&i| self.tensors.get(i))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &TensorDescriptor> {
        self.outputs.iter().filter_map(|&i| self.tensors.get(i))
    }

    /// Build the `get_info` report for an engine of the given version.
    pub fn report(&self, runtime_version: Version, arena_used_bytes: Option<usize>) -> ModelReport {
        ModelReport {
            name: self.header.name.clone(),
            format: self.header.format,
            signature: self
                .header
                .signature
                .clone()
                .unwrap_or_else(|| "0x00000000".to_string()),
            runtime_version,
            tool_version: self.header.tool_version,
            n_nodes: self.n_nodes(),
            n_tensors: self.tensors.len(),
            macc: self.header.macc,
            activations_bytes: self.header.activations_bytes,
            weights_bytes: self.header.weights_bytes,
            inputs: self.inputs().cloned().collect(),
            outputs: self.outputs().cloned().collect(),
            arena_used_bytes,
        }
    }

    /// Returns a summary string describing the model.
    pub fn summary(&self) -> String {
        format!(
            "Model '{}' ({}): {} nodes, {} MACC, {} activation bytes",
            self.header.name,
            self.header.format.as_str(),
            self.n_nodes(),
            self.header.macc,
            self.header.activations_bytes,
        )
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ModelGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ModelGraph '{}' ({} nodes):",
            self.header.name,
            self.nodes.len()
        )?;
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}
