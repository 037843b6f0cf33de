// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for clock configuration.

/// Errors raised while configuring the cycle clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// A clock frequency is zero or was never set.
    #[error("clock frequency '{which}' is zero or unset")]
    ZeroFrequency { which: &'static str },
}
