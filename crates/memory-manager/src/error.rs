// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for memory management.

/// Errors that can occur while sizing or carving static buffers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The model needs more activation memory than is reserved locally.
    #[error("activations buffer too small: model requires {required} bytes, {available} reserved")]
    BufferSize { required: usize, available: usize },

    /// The arena cannot satisfy an allocation.
    #[error("arena exhausted: requested {requested} bytes, {available} of {capacity} available")]
    ArenaExhausted {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// Attempted to allocate a zero-sized buffer.
    #[error("cannot allocate zero-sized buffer")]
    ZeroSized,

    /// Alignment must be a non-zero power of two.
    #[error("invalid alignment {align}")]
    InvalidAlignment { align: usize },

    /// A size string could not be parsed.
    #[error("invalid size '{input}': expected a number with an optional K, M or G suffix")]
    InvalidSize { input: String },
}
