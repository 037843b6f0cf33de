// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Event and registration flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Phase and position of one node event.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct EventFlags(u32);

impl EventFlags {
    /// Immediately before the node executes.
    pub const PRE: Self = Self(1 << 0);
    /// Immediately after the node executes.
    pub const POST: Self = Self(1 << 1);
    /// First node of the inference.
    pub const FIRST: Self = Self(1 << 2);
    /// Last node of the inference.
    pub const LAST: Self = Self(1 << 3);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_pre(self) -> bool {
        self.contains(Self::PRE)
    }

    pub const fn is_post(self) -> bool {
        self.contains(Self::POST)
    }

    pub const fn is_first(self) -> bool {
        self.contains(Self::FIRST)
    }

    pub const fn is_last(self) -> bool {
        self.contains(Self::LAST)
    }

    /// Position flags for the `ordinal`-th of `n_executed` nodes that run
    /// in one inference. Skipped nodes do not count.
    pub fn position(ordinal: usize, n_executed: usize) -> Self {
        let mut f = Self::empty();
        if ordinal == 0 {
            f |= Self::FIRST;
        }
        if ordinal + 1 == n_executed {
            f |= Self::LAST;
        }
        f
    }
}

impl BitOr for EventFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::PRE, "PRE"),
            (Self::POST, "POST"),
            (Self::FIRST, "FIRST"),
            (Self::LAST, "LAST"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if set.is_empty() {
            f.write_str("EventFlags(empty)")
        } else {
            write!(f, "EventFlags({})", set.join("|"))
        }
    }
}

/// Options fixed at registration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ObserverFlags(u32);

impl ObserverFlags {
    /// Timings and output tensors.
    pub const DEFAULT: Self = Self(0);
    /// Timings only: no output tensor is materialized for the sink.
    pub const TIME_ONLY: Self = Self(1);

    pub const fn is_time_only(self) -> bool {
        self.0 & Self::TIME_ONLY.0 != 0
    }
}
