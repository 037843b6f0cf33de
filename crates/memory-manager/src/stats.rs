// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena usage statistics.
//!
//! [`ArenaStats`] answers the sizing question every deployment asks:
//! how much of the reserved arena did the model actually touch?

/// Cumulative statistics about one [`crate::TensorArena`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ArenaStats {
    /// Successful persistent allocations.
    pub persistent_allocations: u64,
    /// Successful allocations made inside temporary scopes.
    pub temp_allocations: u64,
    /// Temporary scopes opened.
    pub temp_scopes: u64,
    /// Allocation requests refused for lack of space.
    pub failed_allocations: u64,
    /// Highest `persistent + temporary` bytes ever in use.
    pub peak_bytes: usize,
}

impl ArenaStats {
    pub(crate) fn record_persistent(&mut self, in_use: usize) {
        self.persistent_allocations += 1;
        self.update_peak(in_use);
    }

    pub(crate) fn record_temp(&mut self, in_use: usize) {
        self.temp_allocations += 1;
        self.update_peak(in_use);
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_scope(&mut self) {
        self.temp_scopes += 1;
    }

    fn update_peak(&mut self, in_use: usize) {
        self.peak_bytes = self.peak_bytes.max(in_use);
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "peak {} bytes, {} persistent / {} temporary allocations in {} scopes, {} failed",
            self.peak_bytes,
            self.persistent_allocations,
            self.temp_allocations,
            self.temp_scopes,
            self.failed_allocations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_is_monotonic() {
        let mut s = ArenaStats::default();
        s.record_persistent(64);
        s.record_temp(256);
        s.record_persistent(128);
        assert_eq!(s.peak_bytes, 256);
        assert_eq!(s.persistent_allocations, 2);
    }

    #[test]
    fn test_summary() {
        let mut s = ArenaStats::default();
        s.record_failure();
        assert!(s.summary().contains("1 failed"));
    }
}
