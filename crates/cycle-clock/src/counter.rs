// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The raw 32-bit cycle register.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A free-running 32-bit cycle register.
///
/// Implementations must be cheap to read: the observer samples the
/// register twice per node event.
pub trait CycleCounter: Send + Sync {
    /// Zero the register.
    fn reset(&self);

    /// Current register value. Wraps modulo 2^32.
    fn read(&self) -> u32;

    /// Register overflows since the last reset, when the platform counts
    /// them (an overflow interrupt or a chained timer). `None` leaves wrap
    /// detection to the clock, which then tolerates one wrap per sample.
    fn overflows(&self) -> Option<u64> {
        None
    }
}

/// Host-side cycle register driven by explicit [`advance`] calls.
///
/// Clones share the same underlying counter, so a synthetic engine can
/// advance time while a [`CycleClock`](crate::CycleClock) reads it.
///
/// [`advance`]: SimulatedCounter::advance
#[derive(Debug, Clone, Default)]
pub struct SimulatedCounter {
    inner: Arc<SimInner>,
}

#[derive(Debug, Default)]
struct SimInner {
    /// Cycles since construction. Never wraps.
    now: AtomicU64,
    /// Value of `now` at the last reset.
    base: AtomicU64,
}

impl SimulatedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `cycles` core cycles pass.
    pub fn advance(&self, cycles: u64) {
        self.inner.now.fetch_add(cycles, Ordering::AcqRel);
    }

    /// Cycles since construction, ignoring resets.
    pub fn total(&self) -> u64 {
        self.inner.now.load(Ordering::Acquire)
    }
}

impl CycleCounter for SimulatedCounter {
    fn reset(&self) {
        let now = self.inner.now.load(Ordering::Acquire);
        self.inner.base.store(now, Ordering::Release);
    }

    fn read(&self) -> u32 {
        let now = self.inner.now.load(Ordering::Acquire);
        let base = self.inner.base.load(Ordering::Acquire);
        // Truncation models the 32-bit register.
        now.wrapping_sub(base) as u32
    }

    fn overflows(&self) -> Option<u64> {
        let now = self.inner.now.load(Ordering::Acquire);
        let base = self.inner.base.load(Ordering::Acquire);
        Some(now.wrapping_sub(base) >> 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_and_read() {
        let c = SimulatedCounter::new();
        c.advance(100);
        assert_eq!(c.read(), 100);
        c.reset();
        assert_eq!(c.read(), 0);
        c.advance(5);
        assert_eq!(c.read(), 5);
        assert_eq!(c.total(), 105);
    }

    #[test]
    fn test_register_wraps() {
        let c = SimulatedCounter::new();
        c.advance(u64::from(u32::MAX) + 11);
        assert_eq!(c.read(), 10);
        assert_eq!(c.overflows(), Some(1));
        c.reset();
        assert_eq!(c.overflows(), Some(0));
    }

    #[test]
    fn test_clones_share_state() {
        let a = SimulatedCounter::new();
        let b = a.clone();
        a.advance(42);
        assert_eq!(b.read(), 42);
    }
}
