// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # observer
//!
//! The per-node profiling callback and its bookkeeping.
//!
//! An inference engine calls the [`Observer`] immediately before (PRE) and
//! after (POST) every operator node. From those timestamps the observer
//! splits each inference window into three disjoint parts:
//!
//! - `node_dur`: time inside operator kernels, accumulated per node in the
//!   [`NodeTimingTable`];
//! - `cb_dur`: time spent inside the callback itself, including any
//!   [`NodeSink`] work such as streaming inspector records;
//! - `engine_dur`: engine scheduling before, between and after nodes.
//!
//! For every completed invocation, `window == node_dur + cb_dur + engine_dur`
//! holds exactly.
//!
//! # Registration
//!
//! An [`ObserverSlot`] holds at most one observer. A second registration is
//! rejected without disturbing the first; unregistration must present the
//! [`ObserverId`] handed out at registration.
//!
//! ```
//! use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};
//! use observer::{ObserverOptions, ObserverSlot};
//!
//! let counter = SimulatedCounter::new();
//! let clock = CycleClock::new(counter, ClockConfig::default()).unwrap();
//!
//! let mut slot = ObserverSlot::default();
//! let id = slot.register(ObserverOptions::new().time_source(clock.clone()), 4).unwrap();
//! assert!(slot.register(ObserverOptions::new().time_source(clock), 4).is_err());
//! let observer = slot.unregister(id).unwrap();
//! assert_eq!(observer.info().n_invoks, 0);
//! ```

mod error;
mod event;
mod flags;
pub mod inspector;
mod observer;
mod options;
mod slot;
mod table;

pub use error::ObserverError;
pub use event::{NodeEvent, NodeSink, NoOutputs, OutputSource, PushedOutputs};
pub use flags::{EventFlags, ObserverFlags};
pub use inspector::{InspectorMode, InspectorSink, JsonLines, NodeRecord, RecordBuffer, RecordSink};
pub use observer::{InvocationTiming, Observer, ProfileInfo};
pub use options::ObserverOptions;
pub use slot::{ObserverId, ObserverSlot};
pub use table::{NodeAnomaly, NodeReport, NodeRow, NodeStat, NodeTimingTable};
