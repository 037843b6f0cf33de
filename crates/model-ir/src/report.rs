// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The `get_info` answer of a created model.

use crate::ModelFormat;
use std::fmt;
use tensor_core::TensorLayout;

/// A `major.minor.patch` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Version {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `"7.0.0"`. Missing components default to zero.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.').map(str::parse::<u8>);
        let major = parts.next()?.ok()?;
        let minor = parts.next().transpose().ok()?.unwrap_or(0);
        let patch = parts.next().transpose().ok()?.unwrap_or(0);
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A named model tensor with its normalized layout.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorDescriptor {
    /// Engine tensor index.
    pub index: usize,
    pub name: String,
    pub layout: TensorLayout,
    /// Buffer lives inside the activations buffer and is engine-owned.
    pub in_activations: bool,
}

impl TensorDescriptor {
    pub fn summary(&self) -> String {
        let (scale, zp) = self.layout.scale_zero_point();
        let mut s = format!(
            "{} {} {} {} bytes",
            self.name, self.layout.dtype, self.layout.shape, self.layout.size_bytes
        );
        if self.layout.quant.is_some() {
            s.push_str(&format!(", scale={scale} zp={zp}"));
        }
        if self.in_activations {
            s.push_str(" (in activations)");
        }
        s
    }
}

/// Everything `get_info` tells the session about a model.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelReport {
    pub name: String,
    pub format: ModelFormat,
    pub signature: String,
    pub runtime_version: Version,
    pub tool_version: Option<Version>,
    pub n_nodes: usize,
    pub n_tensors: usize,
    pub macc: u64,
    pub activations_bytes: usize,
    pub weights_bytes: usize,
    pub inputs: Vec<TensorDescriptor>,
    pub outputs: Vec<TensorDescriptor>,
    /// Arena bytes used after allocation (portable backend only).
    pub arena_used_bytes: Option<usize>,
}

impl ModelReport {
    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Multi-line, human-readable report.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Network '{}' ({}) signature {}\n",
            self.name,
            self.format.as_str(),
            self.signature
        ));
        out.push_str(&format!("  runtime       : {}\n", self.runtime_version));
        if let Some(tool) = self.tool_version {
            out.push_str(&format!("  tool          : {tool}\n"));
        }
        out.push_str(&format!(
            "  complexity    : {} MACC, {} nodes, {} tensors\n",
            self.macc, self.n_nodes, self.n_tensors
        ));
        out.push_str(&format!(
            "  activations   : {} bytes\n  weights       : {} bytes\n",
            self.activations_bytes, self.weights_bytes
        ));
        if let Some(used) = self.arena_used_bytes {
            out.push_str(&format!("  arena used    : {used} bytes\n"));
        }
        for (i, t) in self.inputs.iter().enumerate() {
            out.push_str(&format!("  input  #{i}     : {}\n", t.summary()));
        }
        for (i, t) in self.outputs.iter().enumerate() {
            out.push_str(&format!("  output #{i}     : {}\n", t.summary()));
        }
        out
    }
}
