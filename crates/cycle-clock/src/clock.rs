// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Overflow-corrected 64-bit cycle clock.
//!
//! When the counter reports its own overflow count, [`CycleClock::elapsed`]
//! combines it with the register and any number of wraps between two
//! samples is accounted for.
//!
//! Otherwise the current register value is compared against the previous
//! sample. A smaller value means the register wrapped, and the epoch is
//! bumped by 2^32. At most one wrap may then occur between two samples.

use crate::{ClockConfig, ClockError, CycleCounter, CycleDuration};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Anything that can produce a monotonic cycle count.
///
/// The observer callback requires one of these. A [`CycleClock`] is the
/// production implementation; tests may script their own.
pub trait TimeSource: Send {
    /// Cycles since the start of the current measurement window.
    /// Monotonic non-decreasing within a window.
    fn now(&self) -> u64;
}

/// Shared clock state. Handles clone the `Arc`, not the counter.
struct ClockInner {
    counter: Box<dyn CycleCounter>,
    config: ClockConfig,
    /// Accumulated 2^32 periods since `start()`.
    epoch: AtomicU64,
    /// Register value at the previous sample.
    last: AtomicU32,
}

/// Clonable handle over one hardware cycle register.
///
/// All clones observe the same register and the same overflow epoch, so
/// the session, the perf loop and the observer can each hold one.
#[derive(Clone)]
pub struct CycleClock {
    inner: Arc<ClockInner>,
}

impl CycleClock {
    /// Wrap `counter`, validating the clock configuration.
    pub fn new(
        counter: impl CycleCounter + 'static,
        config: ClockConfig,
    ) -> Result<Self, ClockError> {
        config.validate()?;
        tracing::debug!(clocks = %config.summary(), "cycle clock configured");
        Ok(Self {
            inner: Arc::new(ClockInner {
                counter: Box::new(counter),
                config,
                epoch: AtomicU64::new(0),
                last: AtomicU32::new(0),
            }),
        })
    }

    /// Zero the register and the overflow epoch.
    pub fn start(&self) {
        self.inner.counter.reset();
        self.inner.epoch.store(0, Ordering::Release);
        self.inner.last.store(0, Ordering::Release);
    }

    /// Cycles since the last [`start`](Self::start), widened to 64 bits.
    pub fn elapsed(&self) -> u64 {
        let counter = &self.inner.counter;
        if let Some(mut wraps) = counter.overflows() {
            loop {
                let now = counter.read();
                // an overflow between the two reads leaves `now` ambiguous
                match counter.overflows() {
                    Some(again) if again != wraps => wraps = again,
                    _ => {
                        self.inner.last.store(now, Ordering::Release);
                        return (wraps << 32) + u64::from(now);
                    }
                }
            }
        }

        let now = counter.read();
        let prev = self.inner.last.swap(now, Ordering::AcqRel);
        let epoch = if now < prev {
            self.inner.epoch.fetch_add(1 << 32, Ordering::AcqRel) + (1 << 32)
        } else {
            self.inner.epoch.load(Ordering::Acquire)
        };
        epoch + u64::from(now)
    }

    pub fn config(&self) -> &ClockConfig {
        &self.inner.config
    }

    /// Convert a cycle count to wall time at the configured core clock.
    pub fn to_duration(&self, cycles: u64) -> CycleDuration {
        CycleDuration::from_cycles(cycles, self.inner.config.cpu_hz())
    }
}

impl TimeSource for CycleClock {
    fn now(&self) -> u64 {
        self.elapsed()
    }
}

impl fmt::Debug for CycleClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleClock")
            .field("config", &self.inner.config)
            .field("epoch", &self.inner.epoch.load(Ordering::Relaxed))
            .finish()
    }
}
