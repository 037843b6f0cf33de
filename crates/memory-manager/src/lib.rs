// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Statically sized memory for inference engines on microcontrollers.
//!
//! # Key Components
//!
//! - [`ByteSize`]: a byte count with human-readable parsing (`"64K"`,
//!   `"1M"`, `"512"`), used for every configured buffer size.
//! - [`TensorArena`]: a fixed-capacity arena with an aligned start
//!   (32 bytes for the vendor runtime, 16 for the portable interpreter),
//!   persistent bump allocation and used/peak accounting.
//! - [`TempScope`]: an RAII scope over the arena. Everything allocated in
//!   the scope is released when it drops; regions handed out inside it
//!   become unreadable afterwards.
//! - [`resolve_activations`]: chooses between the local activations
//!   buffer and an externally mapped address.
//!
//! # Ownership Model
//!
//! ```text
//! TensorArena::temp_scope()
//!       │
//!       ▼
//!   TempScope  ◄─── holds &mut TensorArena
//!       │
//!       │  drop()
//!       ▼
//!   temp head rewound to the persistent head, generation bumped
//! ```
//!
//! # Example
//! ```
//! use memory_manager::TensorArena;
//!
//! let mut arena = TensorArena::new(1024, 16).unwrap();
//! let weights = arena.alloc_persistent(100).unwrap();
//! {
//!     let mut scope = arena.temp_scope();
//!     let scratch = scope.alloc(200).unwrap();
//!     scope.slice_mut(scratch).unwrap().fill(1);
//! }
//! assert_eq!(arena.used_bytes(), 112);
//! assert!(arena.slice(weights).is_some());
//! ```

mod activations;
mod arena;
mod error;
mod scope;
mod size;
mod stats;

pub use activations::{resolve_activations, ActivationSource, EXT_ADDR_SENTINEL};
pub use arena::{ArenaRegion, TensorArena};
pub use error::MemoryError;
pub use scope::TempScope;
pub use size::ByteSize;
pub use stats::ArenaStats;
