// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Harness configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! backend = "portable"
//! model_path = "./models/kws.json"
//! warmup = 1
//! iterations = 16
//! profiling = false
//! profiling_factor = 5
//! observer = true
//! seed = 3
//! activations_capacity = "64K"
//! arena_size = "96K"
//!
//! [clock]
//! sysclk_hz = 480000000
//! hclk_hz = 480000000
//! ```

use crate::SessionError;
use cycle_clock::ClockConfig;
use memory_manager::ByteSize;
use model_ir::ModelFormat;
use std::path::{Path, PathBuf};

/// Configuration for a profiling session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Backend family: `"vendor"` or `"portable"`.
    pub backend: ModelFormat,
    /// Path to the model manifest.
    pub model_path: Option<PathBuf>,
    /// Vendor network to select from a multi-network image.
    pub network: Option<String>,
    /// Untimed runs before the benchmark loop.
    pub warmup: u32,
    /// Timed iterations of the benchmark loop.
    pub iterations: u32,
    /// Profiling mode: more iterations, no early stop.
    pub profiling: bool,
    /// Iteration multiplier in profiling mode.
    pub profiling_factor: u32,
    /// Register the per-node observer during benchmarks.
    pub observer: bool,
    /// An iteration longer than this shortens the loop.
    pub max_iteration_secs: u64,
    /// Seed of the random input generator.
    pub seed: u64,
    /// Mask interrupts around the timed loop.
    pub mask_interrupts: bool,
    pub clock: ClockConfig,
    /// Statically reserved local activations buffer (vendor backend).
    pub activations_capacity: ByteSize,
    /// Tensor arena (portable backend).
    pub arena_size: ByteSize,
    /// Upper bound for the node timing table.
    pub observer_table_limit: Option<ByteSize>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            backend: ModelFormat::Vendor,
            model_path: None,
            network: None,
            warmup: 1,
            iterations: 16,
            profiling: false,
            profiling_factor: 5,
            observer: true,
            max_iteration_secs: 10,
            seed: 3,
            mask_interrupts: false,
            clock: ClockConfig::default(),
            activations_capacity: ByteSize::from_kb(64),
            arena_size: ByteSize::from_kb(64),
            observer_table_limit: None,
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SessionError> {
        toml::from_str(toml_str).map_err(|e| SessionError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, SessionError> {
        toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects settings no session can run with.
    pub fn validate(&self) -> Result<(), SessionError> {
        self.clock.validate()?;
        if self.iterations == 0 {
            return Err(SessionError::Config("iterations must be at least 1".into()));
        }
        if self.profiling && self.profiling_factor == 0 {
            return Err(SessionError::Config(
                "profiling_factor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Iterations of the benchmark loop after the profiling multiplier.
    pub fn effective_iterations(&self) -> u32 {
        if self.profiling {
            self.iterations.saturating_mul(self.profiling_factor)
        } else {
            self.iterations
        }
    }

    /// The long-iteration threshold in cycles, `None` in profiling mode.
    pub fn max_iteration_cycles(&self) -> Option<u64> {
        (!self.profiling)
            .then(|| self.max_iteration_secs.saturating_mul(u64::from(self.clock.cpu_hz())))
    }
}
