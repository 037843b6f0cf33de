// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heap usage counting.
//!
//! The counters only move while the monitor is enabled, so the session can
//! bracket exactly the engine call and nothing else. Bytes freed inside a
//! window that were allocated before it can drive the running total below
//! zero; the reported `used` saturates at zero.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Begin/end/read service for heap usage.
pub trait HeapMonitor: Send + Sync {
    /// Zero every counter.
    fn reset(&self);

    /// Start counting.
    fn enable(&self);

    /// Stop counting. Counters keep their values.
    fn disable(&self);

    /// Current readings.
    fn usage(&self) -> HeapUsage;
}

/// Heap readings over the enabled windows since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HeapUsage {
    /// Net bytes still allocated.
    pub used: u64,
    /// High-water mark of `used`.
    pub max_used: u64,
    pub allocs: u64,
    pub frees: u64,
}

impl HeapUsage {
    pub fn summary(&self) -> String {
        format!(
            "{}:{} (req:allocated,req:released) max={} used={}",
            self.allocs, self.frees, self.max_used, self.used
        )
    }
}

/// A [`GlobalAlloc`] wrapper that counts while enabled.
///
/// # Example
/// ```no_run
/// use resource_monitor::CountingAllocator;
///
/// #[global_allocator]
/// static HEAP: CountingAllocator = CountingAllocator::system();
/// ```
pub struct CountingAllocator<A = System> {
    inner: A,
    enabled: AtomicBool,
    current: AtomicI64,
    max: AtomicI64,
    allocs: AtomicU64,
    frees: AtomicU64,
}

impl CountingAllocator<System> {
    /// Wraps the system allocator.
    pub const fn system() -> Self {
        Self::new(System)
    }
}

impl<A> CountingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self {
            inner,
            enabled: AtomicBool::new(false),
            current: AtomicI64::new(0),
            max: AtomicI64::new(0),
            allocs: AtomicU64::new(0),
            frees: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn record_alloc(&self, size: usize) {
        if !self.is_enabled() {
            return;
        }
        self.allocs.fetch_add(1, Ordering::Relaxed);
        let now = self.current.fetch_add(size as i64, Ordering::Relaxed) + size as i64;
        self.max.fetch_max(now, Ordering::Relaxed);
    }

    fn record_free(&self, size: usize) {
        if !self.is_enabled() {
            return;
        }
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.current.fetch_sub(size as i64, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded unchanged to `inner`; the wrapper only
// updates atomic counters and never allocates itself.
unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.record_free(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            self.record_free(layout.size());
            self.record_alloc(new_size);
        }
        new_ptr
    }
}

impl<A: Send + Sync> HeapMonitor for CountingAllocator<A> {
    fn reset(&self) {
        self.current.store(0, Ordering::Relaxed);
        self.max.store(0, Ordering::Relaxed);
        self.allocs.store(0, Ordering::Relaxed);
        self.frees.store(0, Ordering::Relaxed);
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    fn usage(&self) -> HeapUsage {
        HeapUsage {
            used: self.current.load(Ordering::Relaxed).max(0) as u64,
            max_used: self.max.load(Ordering::Relaxed).max(0) as u64,
            allocs: self.allocs.load(Ordering::Relaxed),
            frees: self.frees.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(size: usize) -> Layout {
        Layout::from_size_align(size, 8).unwrap()
    }

    #[test]
    fn test_counts_only_when_enabled() {
        let heap = CountingAllocator::system();
        unsafe {
            let a = heap.alloc(layout(64));
            heap.enable();
            let b = heap.alloc(layout(128));
            heap.dealloc(b, layout(128));
            heap.disable();
            heap.dealloc(a, layout(64));
        }
        let u = heap.usage();
        assert_eq!(u.allocs, 1);
        assert_eq!(u.frees, 1);
        assert_eq!(u.used, 0);
        assert_eq!(u.max_used, 128);
    }

    #[test]
    fn test_high_water_mark() {
        let heap = CountingAllocator::system();
        heap.enable();
        unsafe {
            let a = heap.alloc(layout(100));
            let b = heap.alloc(layout(50));
            heap.dealloc(a, layout(100));
            let c = heap.alloc(layout(10));
            assert_eq!(heap.usage().used, 60);
            heap.dealloc(b, layout(50));
            heap.dealloc(c, layout(10));
        }
        assert_eq!(heap.usage().max_used, 150);
    }

    #[test]
    fn test_free_of_older_block_saturates() {
        let heap = CountingAllocator::system();
        unsafe {
            let a = heap.alloc(layout(32));
            heap.enable();
            heap.dealloc(a, layout(32));
        }
        assert_eq!(heap.usage().used, 0);
    }

    #[test]
    fn test_reset() {
        let heap = CountingAllocator::system();
        heap.enable();
        unsafe {
            let a = heap.alloc(layout(16));
            heap.dealloc(a, layout(16));
        }
        heap.reset();
        assert_eq!(heap.usage(), HeapUsage::default());
    }

    #[test]
    fn test_realloc_tracks_growth() {
        let heap = CountingAllocator::system();
        heap.enable();
        unsafe {
            let a = heap.alloc(layout(16));
            let b = heap.realloc(a, layout(16), 64);
            assert_eq!(heap.usage().used, 64);
            heap.dealloc(b, layout(64));
        }
    }
}
