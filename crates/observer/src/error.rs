// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for observer registration and bookkeeping.

use crate::ObserverId;

/// Errors raised by the observer subsystem.
///
/// None of these abort a session: the caller proceeds without the
/// requested observation feature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    /// An observer is already registered on this engine.
    #[error("observer {current} is already registered")]
    AlreadyBound { current: ObserverId },

    /// The presented id does not match the registered observer.
    #[error("observer {id} is not registered")]
    NotRegistered { id: ObserverId },

    /// Registration without a time source.
    #[error("a time source is required to register an observer")]
    MissingTimeSource,

    /// The node timing table could not be allocated.
    #[error("cannot allocate node timing table: {bytes} bytes for {nodes} nodes (limit {limit:?})")]
    Allocation {
        nodes: usize,
        bytes: usize,
        limit: Option<usize>,
    },
}
