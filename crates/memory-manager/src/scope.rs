// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII temporary scope over a [`TensorArena`].
//!
//! The portable interpreter materializes a node's output tensor views in
//! temporary arena memory, valid only while the node callback runs.
//! [`TempScope`] makes that lifetime explicit: it borrows the arena
//! mutably, and dropping it rewinds the temporary head and bumps the
//! arena generation so that no region from the scope resolves again.

use crate::{ArenaRegion, MemoryError, TensorArena};

/// A scope for temporary allocations.
///
/// # Example
/// ```
/// use memory_manager::TensorArena;
///
/// let mut arena = TensorArena::new(256, 16).unwrap();
/// let region = {
///     let mut scope = arena.temp_scope();
///     scope.alloc(64).unwrap()
/// };
/// // The scope is gone, and so is the region.
/// assert!(arena.slice(region).is_none());
/// ```
pub struct TempScope<'a> {
    arena: &'a mut TensorArena,
}

impl<'a> TempScope<'a> {
    pub(crate) fn new(arena: &'a mut TensorArena) -> Self {
        Self { arena }
    }

    /// Allocates `len` bytes released when this scope drops.
    pub fn alloc(&mut self, len: usize) -> Result<ArenaRegion, MemoryError> {
        let (offset, end) = self.arena.bump(self.arena.temp_head, len)?;
        self.arena.temp_head = end;
        self.arena.stats.record_temp(end);
        Ok(ArenaRegion {
            offset,
            len,
            generation: Some(self.arena.generation),
        })
    }

    /// Bytes allocated in this scope so far.
    pub fn used(&self) -> usize {
        self.arena.temp_head - self.arena.head
    }

    pub fn slice(&self, region: ArenaRegion) -> Option<&[u8]> {
        self.arena.slice(region)
    }

    pub fn slice_mut(&mut self, region: ArenaRegion) -> Option<&mut [u8]> {
        self.arena.slice_mut(region)
    }

    /// The arena this scope allocates from.
    pub fn arena(&self) -> &TensorArena {
        &*self.arena
    }
}

impl Drop for TempScope<'_> {
    fn drop(&mut self) {
        self.arena.temp_head = self.arena.head;
        self.arena.generation += 1;
    }
}

impl std::fmt::Debug for TempScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempScope")
            .field("used", &self.used())
            .field("generation", &self.arena.generation)
            .finish()
    }
}
