// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # resource-monitor
//!
//! Heap and stack high-water marks around inference calls.
//!
//! Both monitors are opaque begin/end/read services from the session's
//! point of view:
//!
//! - **Heap**: [`CountingAllocator`] wraps a [`GlobalAlloc`] and counts
//!   bytes allocated and freed while enabled. Install it as the
//!   `#[global_allocator]` to watch a whole process, or drive it directly.
//! - **Stack**: [`PaintedStack`] fills a [`StackRegion`] with a known
//!   pattern before a run and scans for the deepest overwritten byte after.
//!
//! # Example
//! ```
//! use resource_monitor::{PaintedStack, StackMonitor, StackRegion};
//!
//! let region = StackRegion::new(1024).unwrap();
//! let mut stack = PaintedStack::new(region.clone());
//! stack.mark().unwrap();
//! region.touch(300).unwrap();
//! assert_eq!(stack.evaluate().unwrap().used, 300);
//! ```
//!
//! [`GlobalAlloc`]: std::alloc::GlobalAlloc

mod error;
mod heap;
mod report;
mod stack;

pub use error::MonitorError;
pub use heap::{CountingAllocator, HeapMonitor, HeapUsage};
pub use report::MonitorReport;
pub use stack::{PaintedStack, StackMonitor, StackRegion, StackUsage, STACK_PAINT};
