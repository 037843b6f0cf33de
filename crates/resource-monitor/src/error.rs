// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for resource monitoring.

/// Errors that can occur when sampling heap or stack usage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// A monitored stack region must hold at least one byte.
    #[error("stack region of {size} bytes cannot be monitored")]
    EmptyRegion { size: usize },

    /// A write went past the end of the monitored region.
    #[error("stack depth {depth} exceeds region of {size} bytes")]
    Overflow { depth: usize, size: usize },

    /// Another thread panicked while holding the region.
    #[error("stack region lock poisoned")]
    Poisoned,
}
