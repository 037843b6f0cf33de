// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-capacity bump arena with an aligned start.
//!
//! Layout of the arena:
//!
//! ```text
//! start                 head                temp_head          capacity
//!   │   persistent        │   temporary        │      free         │
//!   ├─────────────────────┼────────────────────┼───────────────────┤
//! ```
//!
//! Persistent allocations live for the lifetime of the arena (or until
//! [`TensorArena::reset`]). Temporary allocations are only possible through
//! a [`TempScope`](crate::TempScope) and are released when it drops.

use crate::{ArenaStats, MemoryError, TempScope};

/// A region handed out by the arena.
///
/// Offsets are relative to the aligned arena start. Temporary regions are
/// stamped with the scope generation that produced them and stop resolving
/// once that scope is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaRegion {
    pub offset: usize,
    pub len: usize,
    pub(crate) generation: Option<u64>,
}

impl ArenaRegion {
    pub fn is_temporary(&self) -> bool {
        self.generation.is_some()
    }
}

/// A statically sized tensor arena.
pub struct TensorArena {
    buf: Vec<u8>,
    /// Offset of the first aligned byte in `buf`.
    start: usize,
    capacity: usize,
    align: usize,
    pub(crate) head: usize,
    pub(crate) temp_head: usize,
    /// Incremented every time a temporary scope closes.
    pub(crate) generation: u64,
    pub(crate) stats: ArenaStats,
}

impl TensorArena {
    /// Alignment the vendor runtime expects for its activations buffer.
    pub const VENDOR_ALIGN: usize = 32;
    /// Alignment the portable interpreter expects for its tensor arena.
    pub const PORTABLE_ALIGN: usize = 16;

    /// Reserves `capacity` usable bytes starting on an `align` boundary.
    pub fn new(capacity: usize, align: usize) -> Result<Self, MemoryError> {
        if align == 0 || !align.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment { align });
        }
        if capacity == 0 {
            return Err(MemoryError::ZeroSized);
        }
        let buf = vec![0u8; capacity + align - 1];
        let addr = buf.as_ptr() as usize;
        let start = addr.next_multiple_of(align) - addr;
        tracing::debug!(capacity, align, "tensor arena reserved");
        Ok(Self {
            buf,
            start,
            capacity,
            align,
            head: 0,
            temp_head: 0,
            generation: 0,
            stats: ArenaStats::default(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn align(&self) -> usize {
        self.align
    }

    /// Bytes held by persistent allocations.
    pub fn used_bytes(&self) -> usize {
        self.head
    }

    /// Highest number of bytes ever in use.
    pub fn peak_bytes(&self) -> usize {
        self.stats.peak_bytes
    }

    pub fn available(&self) -> usize {
        self.capacity - self.temp_head
    }

    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }

    /// Allocates `len` bytes that live until [`reset`](Self::reset).
    pub fn alloc_persistent(&mut self, len: usize) -> Result<ArenaRegion, MemoryError> {
        let (offset, end) = self.bump(self.head, len)?;
        self.head = end;
        self.temp_head = end;
        self.stats.record_persistent(end);
        Ok(ArenaRegion {
            offset,
            len,
            generation: None,
        })
    }

    /// Opens a temporary scope. Allocations made through it are released
    /// when the scope drops.
    pub fn temp_scope(&mut self) -> TempScope<'_> {
        self.stats.record_scope();
        TempScope::new(self)
    }

    /// Read access to a region, or `None` if it is stale or out of bounds.
    pub fn slice(&self, region: ArenaRegion) -> Option<&[u8]> {
        let range = self.range(region)?;
        self.buf.get(range)
    }

    /// Write access to a region, or `None` if it is stale or out of bounds.
    pub fn slice_mut(&mut self, region: ArenaRegion) -> Option<&mut [u8]> {
        let range = self.range(region)?;
        self.buf.get_mut(range)
    }

    /// Drops every allocation. Outstanding regions become stale.
    pub fn reset(&mut self) {
        self.head = 0;
        self.temp_head = 0;
        self.generation += 1;
    }

    /// Absolute address of the first usable byte.
    pub fn base_addr(&self) -> usize {
        self.buf.as_ptr() as usize + self.start
    }

    pub(crate) fn bump(&mut self, from: usize, len: usize) -> Result<(usize, usize), MemoryError> {
        if len == 0 {
            return Err(MemoryError::ZeroSized);
        }
        let end = len
            .checked_next_multiple_of(self.align)
            .and_then(|padded| from.checked_add(padded));
        match end {
            Some(end) if end <= self.capacity => Ok((from, end)),
            _ => {
                self.stats.record_failure();
                tracing::warn!(
                    requested = len,
                    available = self.capacity - from,
                    "tensor arena exhausted"
                );
                Err(MemoryError::ArenaExhausted {
                    requested: len,
                    available: self.capacity - from,
                    capacity: self.capacity,
                })
            }
        }
    }

    fn range(&self, region: ArenaRegion) -> Option<std::ops::Range<usize>> {
        let limit = match region.generation {
            None => self.head,
            Some(g) if g == self.generation => self.temp_head,
            Some(_) => return None,
        };
        let end = region.offset.checked_add(region.len)?;
        if end > limit {
            return None;
        }
        Some(self.start + region.offset..self.start + end)
    }
}

impl std::fmt::Debug for TensorArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorArena")
            .field("capacity", &self.capacity)
            .field("align", &self.align)
            .field("used", &self.head)
            .field("peak", &self.stats.peak_bytes)
            .finish()
    }
}
