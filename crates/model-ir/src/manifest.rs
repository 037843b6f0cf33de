// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON model image parsing.
//!
//! The manifest stands in for the model image an engine would load: it
//! carries the header (schema, versions, MACC, buffer sizes), the tensor
//! table and the node list in execution order. The synthetic engines use
//! the per-node `cost_cycles` to advance the simulated cycle counter.
//!
//! # Format
//! ```json
//! {
//!   "name": "kws",
//!   "format": "portable",
//!   "schema_version": 1,
//!   "macc": 336000,
//!   "activations_bytes": 8192,
//!   "tensors": [
//!     { "name": "input", "dtype": "i8", "shape": [1, 49, 10, 1],
//!       "quant": { "scale": 0.5, "zero_point": -128 } },
//!     { "name": "conv", "dtype": "i8", "shape": [1, 25, 5, 64] }
//!   ],
//!   "inputs": [0],
//!   "outputs": [1],
//!   "nodes": [
//!     { "name": "conv_1", "code": 3, "version": 2, "outputs": [1], "cost_cycles": 1200 }
//!   ]
//! }
//! ```

use crate::ModelError;
use std::collections::HashSet;
use tensor_core::{DType, Quantization, Shape};

/// The only schema revision this harness reads.
pub const SUPPORTED_SCHEMA: u32 = 1;

/// Which backend family produced the model image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormat {
    /// Vendor multi-network runtime: nodes keyed by `(c_idx, type, id)`.
    Vendor,
    /// Portable interpreter: nodes keyed by `(idx, builtin_code, version)`.
    Portable,
}

impl ModelFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFormat::Vendor => "vendor",
            ModelFormat::Portable => "portable",
        }
    }
}

/// Top-level model image, deserialized from JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelManifest {
    pub name: String,
    pub format: ModelFormat,
    pub schema_version: u32,
    /// Opaque build signature reported back by `get_info`.
    #[serde(default)]
    pub signature: Option<String>,
    /// Version of the tool that generated the model, e.g. `"7.0.0"`.
    #[serde(default)]
    pub tool_version: Option<String>,
    /// Multiply-accumulate operations per inference.
    pub macc: u64,
    /// Bytes of activation memory the model requires.
    pub activations_bytes: usize,
    #[serde(default)]
    pub weights_bytes: usize,
    /// Externally mapped activations address. `0xFFFF_FFFF` or absent
    /// selects the local buffer.
    #[serde(default)]
    pub ext_activations_addr: Option<u32>,
    /// Engine cycles spent scheduling between two nodes.
    #[serde(default)]
    pub sched_cycles: u64,
    pub tensors: Vec<ManifestTensor>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    pub nodes: Vec<ManifestNode>,
}

/// A tensor entry in its native rank.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestTensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    #[serde(default)]
    pub quant: Option<Quantization>,
    /// Lives inside the activations buffer rather than a user buffer.
    #[serde(default)]
    pub in_activations: bool,
}

/// A node entry, listed in execution order.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestNode {
    pub name: String,
    /// Vendor layer type or portable builtin operator code.
    pub code: u32,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Vendor node id. Defaults to the node index.
    #[serde(default)]
    pub id: Option<i32>,
    /// Vendor time-distributed wrapper.
    #[serde(default)]
    pub time_distributed: bool,
    pub outputs: Vec<usize>,
    pub cost_cycles: u64,
    /// Control-flow node that never executes on the default path.
    #[serde(default)]
    pub conditional: bool,
}

fn default_version() -> u32 {
    1
}

impl ModelManifest {
    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a manifest from raw image bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Checks the header and cross-references.
    ///
    /// Checks:
    /// - The schema version matches [`SUPPORTED_SCHEMA`].
    /// - At least one node, one input and one output.
    /// - Every tensor reference is in range and every tensor has a
    ///   rank the reports can normalize.
    /// - No duplicate node names.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.schema_version != SUPPORTED_SCHEMA {
            return Err(ModelError::VersionMismatch {
                found: self.schema_version,
                supported: SUPPORTED_SCHEMA,
            });
        }
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidGraph("model contains no nodes".into()));
        }
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(ModelError::InvalidGraph(
                "model must declare at least one input and one output".into(),
            ));
        }

        for t in &self.tensors {
            t.shape.normalize().map_err(|e| ModelError::InvalidTensor {
                tensor: t.name.clone(),
                detail: e.to_string(),
            })?;
        }

        let n_tensors = self.tensors.len();
        for &idx in self.inputs.iter().chain(&self.outputs) {
            if idx >= n_tensors {
                return Err(ModelError::InvalidGraph(format!(
                    "I/O tensor index {idx} out of range ({n_tensors} tensors)"
                )));
            }
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }
            if let Some(&bad) = node.outputs.iter().find(|&&o| o >= n_tensors) {
                return Err(ModelError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("output tensor {bad} out of range"),
                });
            }
        }

        if self.nodes.iter().all(|n| n.conditional) {
            tracing::warn!(model = %self.name, "every node is conditional; nothing will execute");
        }

        Ok(())
    }
}
