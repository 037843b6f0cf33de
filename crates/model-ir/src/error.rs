// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and IR construction.

/// Errors that can occur when working with model representations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model image could not be read.
    #[error("failed to read model image: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse model image: {0}")]
    Parse(#[from] serde_json::Error),

    /// The image was produced for a different schema revision.
    #[error("model schema version {found} not supported (expected {supported})")]
    VersionMismatch { found: u32, supported: u32 },

    /// A node definition is invalid.
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// A tensor definition is invalid.
    #[error("invalid tensor '{tensor}': {detail}")]
    InvalidTensor { tensor: String, detail: String },

    /// The model graph is malformed as a whole.
    #[error("invalid model graph: {0}")]
    InvalidGraph(String),

    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
