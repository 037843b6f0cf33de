// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Backend adapters and the session controller that profiles neural
//! network inference on a cycle-counted target.
//!
//! The runtime takes:
//! - A model image described by a `ModelManifest` from `model-ir`.
//! - A [`BackendFactory`] that builds either the vendor multi-network
//!   runtime or the portable interpreter behind one [`Backend`] trait.
//! - A `CycleCounter` from `cycle-clock`.
//!
//! And drives the model through creation, initialization and a timed
//! benchmark loop, attaching an `observer::Observer` that attributes
//! cycles to individual nodes.
//!
//! # Type-State Pipeline
//! ```text
//! Session<Uninitialized> → Session<Created> → Session<Initialized> → Session<Ready>
//! ```
//! Benchmarks and validation runs are only available on `Session<Ready>`.
//!
//! # Host runs
//! The [`sim`] module provides synthetic engines that advance a
//! simulated counter by the per-node costs in the model image, so the
//! whole pipeline runs deterministically off-target.

pub mod backend;
mod bench;
mod config;
mod error;
mod input;
pub mod irq;
pub mod portable;
mod report;
mod session;
pub mod sim;
mod validate;
pub mod vendor;

pub use backend::{Backend, BackendFactory, InitParams, RunStatus};
pub use config::HarnessConfig;
pub use error::{Diagnostic, EngineFault, SessionError};
pub use input::InputFiller;
pub use irq::{IrqControl, IrqGuard, IrqState, NoIrq};
pub use portable::PortableAdapter;
pub use report::{BenchReport, CycleStats, RunOutcome};
pub use session::{Created, Initialized, Ready, Session, SessionState, Uninitialized};
pub use sim::{SimControl, SimFactory, SimPlatform};
pub use validate::RunMode;
pub use vendor::VendorAdapter;
