// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Two-decimal integer fixed point.
//!
//! Report ratios (cycles per MACC, node share of total time, CPU workload)
//! are computed in integers scaled by 100 and printed as `int.dd`. This
//! keeps reports byte-identical across targets without an FPU.

use std::fmt;

/// A non-negative value in hundredths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Centi(pub u64);

impl Centi {
    /// `num / den` to two decimals, truncated. `None` when `den` is zero.
    pub fn ratio(num: u64, den: u64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        Some(Self((u128::from(num) * 100 / u128::from(den)) as u64))
    }

    /// `part / whole` as a percentage to two decimals.
    pub fn percent(part: u64, whole: u64) -> Option<Self> {
        if whole == 0 {
            return None;
        }
        Some(Self((u128::from(part) * 10_000 / u128::from(whole)) as u64))
    }

    pub fn whole(self) -> u64 {
        self.0 / 100
    }

    pub fn frac(self) -> u64 {
        self.0 % 100
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.whole(), self.frac())
    }
}
