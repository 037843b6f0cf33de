// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Observer registration options.

use crate::event::NodeSink;
use crate::{NodeTimingTable, Observer, ObserverError, ObserverFlags};
use cycle_clock::TimeSource;

/// Builder for an [`Observer`].
///
/// A time source is mandatory; everything else has a default: no sink,
/// [`ObserverFlags::DEFAULT`], per-node table enabled without a size cap.
pub struct ObserverOptions {
    time: Option<Box<dyn TimeSource>>,
    flags: ObserverFlags,
    sink: Option<Box<dyn NodeSink>>,
    per_node: bool,
    table_limit: Option<usize>,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            time: None,
            flags: ObserverFlags::DEFAULT,
            sink: None,
            per_node: true,
            table_limit: None,
        }
    }
}

impl ObserverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_source(mut self, time: impl TimeSource + 'static) -> Self {
        self.time = Some(Box::new(time));
        self
    }

    pub fn flags(mut self, flags: ObserverFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn sink(mut self, sink: impl NodeSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn boxed_sink(mut self, sink: Box<dyn NodeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Enables or disables the per-node timing table.
    pub fn per_node(mut self, enabled: bool) -> Self {
        self.per_node = enabled;
        self
    }

    /// Caps the node table's storage, in bytes.
    pub fn table_limit(mut self, bytes: usize) -> Self {
        self.table_limit = Some(bytes);
        self
    }

    /// Builds an observer for a model of `n_nodes` nodes.
    ///
    /// A node table that cannot be allocated is not an error: the
    /// observer is returned without per-node detail and a warning is
    /// logged.
    pub fn build(self, n_nodes: usize) -> Result<Observer, ObserverError> {
        let time = self.time.ok_or(ObserverError::MissingTimeSource)?;

        let table = if self.per_node {
            let mut table = match self.table_limit {
                Some(limit) => NodeTimingTable::with_limit(limit),
                None => NodeTimingTable::new(),
            };
            match table.reset(n_nodes) {
                Ok(()) => Some(table),
                Err(e) => {
                    tracing::warn!(error = %e, "observing without per-node detail");
                    None
                }
            }
        } else {
            None
        };

        Ok(Observer::new(time, self.flags, table, self.sink, n_nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};

    fn clock() -> CycleClock {
        CycleClock::new(SimulatedCounter::new(), ClockConfig::default()).unwrap()
    }

    #[test]
    fn test_missing_time_source() {
        assert!(matches!(
            ObserverOptions::new().build(2),
            Err(ObserverError::MissingTimeSource)
        ));
    }

    #[test]
    fn test_defaults() {
        let obs = ObserverOptions::new().time_source(clock()).build(3).unwrap();
        assert_eq!(obs.flags(), ObserverFlags::DEFAULT);
        assert_eq!(obs.table().map(NodeTimingTable::len), Some(3));
    }

    #[test]
    fn test_per_node_disabled() {
        let obs = ObserverOptions::new()
            .time_source(clock())
            .per_node(false)
            .build(3)
            .unwrap();
        assert!(obs.table().is_none());
    }
}
