// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for sessions and backends.
//!
//! Every [`SessionError`] maps to a stable `kind()` string and a negative
//! `code()`; [`Diagnostic`] bundles both with the message and is emitted
//! before a session or a benchmark run is abandoned.

use memory_manager::MemoryError;

/// A failure reported by an inference engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine fault {code}: {detail}")]
pub struct EngineFault {
    pub code: i32,
    pub detail: String,
}

impl EngineFault {
    pub fn new(code: i32, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Errors that can occur while driving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The model image is malformed or has an unsupported version.
    #[error("model create failed: {0}")]
    ModelCreate(#[from] model_ir::ModelError),

    /// The model image targets another backend.
    #[error("model create failed: {found} model on a {expected} backend")]
    FormatMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The requested network is not part of the model image.
    #[error("model create failed: no network named '{name}'")]
    NetworkNotFound { name: String },

    /// The engine could not report its model information.
    #[error("model info query failed: {0}")]
    Info(String),

    /// The engine refused its weights or activations.
    #[error("engine init failed: {0}")]
    Init(String),

    /// The statically reserved buffer cannot hold the model's activations.
    #[error("activation buffer too small: {required} bytes required, {available} available")]
    BufferSize { required: usize, available: usize },

    /// The engine's run call failed or processed an unexpected batch count.
    #[error("invoke failed at iteration {iteration}: {detail}")]
    Invoke { iteration: u32, detail: String },

    /// Caller-supplied input does not match the model.
    #[error("input {index}: {detail}")]
    Input { index: usize, detail: String },

    /// Invalid harness configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("clock error: {0}")]
    Clock(#[from] cycle_clock::ClockError),

    #[error("memory error: {0}")]
    Memory(MemoryError),

    #[error("monitor error: {0}")]
    Monitor(#[from] resource_monitor::MonitorError),

    #[error("observer error: {0}")]
    Observer(#[from] observer::ObserverError),

    /// The session holds no backend in the state an operation needs.
    #[error("session not ready: {0}")]
    NotReady(&'static str),

    /// The backend was already destroyed.
    #[error("backend destroyed")]
    Destroyed,
}

impl From<MemoryError> for SessionError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::BufferSize {
                required,
                available,
            } => SessionError::BufferSize {
                required,
                available,
            },
            MemoryError::ArenaExhausted {
                requested,
                available,
                ..
            } => SessionError::BufferSize {
                required: requested,
                available,
            },
            other => SessionError::Memory(other),
        }
    }
}

impl SessionError {
    /// Stable snake_case name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::ModelCreate(_)
            | SessionError::FormatMismatch { .. }
            | SessionError::NetworkNotFound { .. } => "model_create",
            SessionError::Info(_) => "info",
            SessionError::Init(_) => "init",
            SessionError::BufferSize { .. } => "buffer_size",
            SessionError::Invoke { .. } => "invoke",
            SessionError::Input { .. } => "input",
            SessionError::Config(_) | SessionError::Clock(_) => "config",
            SessionError::Memory(_) => "memory",
            SessionError::Monitor(_) => "monitor",
            SessionError::Observer(_) => "observer",
            SessionError::NotReady(_) => "not_ready",
            SessionError::Destroyed => "destroyed",
        }
    }

    /// Numeric return code.
    pub fn code(&self) -> i32 {
        match self {
            SessionError::Info(_) => -2,
            SessionError::Init(_) | SessionError::Memory(_) => -4,
            SessionError::BufferSize { .. } => -5,
            SessionError::Invoke { .. } => -10,
            _ => -1,
        }
    }

    pub fn diagnostic(&self) -> Diagnostic {
        Diagnostic {
            kind: self.kind().to_string(),
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Structured failure report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub kind: String,
    pub code: i32,
    pub message: String,
}

impl Diagnostic {
    /// Logs the diagnostic at error level and returns it.
    pub fn emit(self) -> Self {
        tracing::error!(kind = %self.kind, code = self.code, "{}", self.message);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E: {} ({}) {}", self.kind, self.code, self.message)
    }
}
