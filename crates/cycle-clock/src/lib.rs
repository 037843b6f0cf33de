// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cycle-clock
//!
//! Monotonic CPU-cycle timing for on-device inference profiling.
//!
//! The hardware cycle counter found on Cortex-M class cores is a 32-bit
//! register. At 480 MHz it wraps in under nine seconds, so raw register
//! deltas cannot be trusted across long windows. This crate widens the
//! register into a 64-bit count using a software-maintained overflow epoch.
//!
//! # Key Components
//!
//! - [`CycleCounter`]: the hardware register: `reset()` and `read()`.
//! - [`SimulatedCounter`]: a host-side counter advanced explicitly, used by
//!   the synthetic engines and the test-suite for exact cycle accounting.
//! - [`CycleClock`]: a cheap, clonable handle over one counter that
//!   implements `start()` / `elapsed()` with overflow correction.
//! - [`TimeSource`]: the capability the observer callback needs.
//! - [`ClockConfig`] / [`CycleDuration`]: pure cycles → time conversion.
//! - [`Centi`]: integer fixed-point with two decimals for report ratios.
//!
//! # Example
//! ```
//! use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};
//!
//! let counter = SimulatedCounter::new();
//! let clock = CycleClock::new(counter.clone(), ClockConfig::from_mhz(80)).unwrap();
//!
//! clock.start();
//! counter.advance(80_000);
//! assert_eq!(clock.elapsed(), 80_000);
//! assert_eq!(clock.to_duration(80_000).to_string(), "1.000 ms");
//! ```

mod clock;
mod config;
mod counter;
mod duration;
mod error;
mod fixed;

pub use clock::{CycleClock, TimeSource};
pub use config::ClockConfig;
pub use counter::{CycleCounter, SimulatedCounter};
pub use duration::CycleDuration;
pub use error::ClockError;
pub use fixed::Centi;
