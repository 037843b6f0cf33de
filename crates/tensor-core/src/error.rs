// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor descriptions.

/// Errors that can occur while describing a tensor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Only rank 2, 3 and 4 native shapes map onto `(batch, height, width, channels)`.
    #[error("cannot normalize rank-{rank} shape {dims:?} to 4D")]
    UnsupportedRank { rank: usize, dims: Vec<usize> },

    /// An element type code the backend does not know.
    #[error("unknown element type code {code}")]
    UnknownTypeCode { code: u32 },
}
