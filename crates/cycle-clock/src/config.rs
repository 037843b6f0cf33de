// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core clock configuration.

use crate::ClockError;

/// Frequencies of the system and core (AHB) clocks.
///
/// The cycle counter ticks at the core clock, so every cycles → time
/// conversion uses [`ClockConfig::cpu_hz`]. The system clock is only
/// reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClockConfig {
    /// System clock frequency in Hz.
    pub sysclk_hz: u32,
    /// Core (HCLK) frequency in Hz. The cycle counter runs at this rate.
    pub hclk_hz: u32,
}

impl ClockConfig {
    /// Both clocks running at `mhz` megahertz.
    pub fn from_mhz(mhz: u32) -> Self {
        Self {
            sysclk_hz: mhz * 1_000_000,
            hclk_hz: mhz * 1_000_000,
        }
    }

    /// Frequency of the cycle counter in Hz.
    pub fn cpu_hz(&self) -> u32 {
        self.hclk_hz
    }

    /// Rejects unset frequencies.
    pub fn validate(&self) -> Result<(), ClockError> {
        if self.sysclk_hz == 0 {
            return Err(ClockError::ZeroFrequency { which: "sysclk" });
        }
        if self.hclk_hz == 0 {
            return Err(ClockError::ZeroFrequency { which: "hclk" });
        }
        Ok(())
    }

    /// One-line description, e.g. `"480MHz/240MHz"`.
    pub fn summary(&self) -> String {
        format!(
            "{}MHz/{}MHz",
            self.sysclk_hz / 1_000_000,
            self.hclk_hz / 1_000_000
        )
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::from_mhz(80)
    }
}
