// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cycles → seconds / milliseconds / microseconds.

use std::fmt;

/// A cycle count broken down at a given core frequency.
///
/// `us` is the sub-millisecond remainder, so the whole value reads
/// `s * 1000 + ms` milliseconds and `us` microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CycleDuration {
    pub s: u64,
    pub ms: u32,
    pub us: u32,
    /// Frequency used for the conversion, in Hz.
    pub fcpu: u32,
}

impl CycleDuration {
    /// Pure conversion. `fcpu` must be non-zero; a zero frequency yields
    /// an all-zero duration.
    pub fn from_cycles(cycles: u64, fcpu: u32) -> Self {
        if fcpu == 0 {
            return Self {
                s: 0,
                ms: 0,
                us: 0,
                fcpu,
            };
        }
        let f = u64::from(fcpu);
        let s = cycles / f;
        let rem = u128::from(cycles % f);
        let sub_us = rem * 1_000_000 / u128::from(f);
        Self {
            s,
            ms: (sub_us / 1_000) as u32,
            us: (sub_us % 1_000) as u32,
            fcpu,
        }
    }

    /// Whole milliseconds.
    pub fn total_millis(&self) -> u64 {
        self.s * 1_000 + u64::from(self.ms)
    }

    /// Milliseconds with microsecond precision.
    pub fn as_millis_f32(&self) -> f32 {
        self.total_millis() as f32 + self.us as f32 / 1_000.0
    }
}

impl fmt::Display for CycleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03} ms", self.total_millis(), self.us)
    }
}
