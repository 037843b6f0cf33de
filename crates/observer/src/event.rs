// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Node events and the consumer seam.
//!
//! An engine reports every node twice. The observer hands each event to
//! an optional [`NodeSink`]; on POST events the node's output tensors are
//! obtained lazily through an [`OutputSource`] so engines that must
//! materialize views (into temporary arena memory) only pay for it when
//! a sink asks.

use crate::EventFlags;
use model_ir::NodeDescriptor;
use tensor_core::TensorView;

/// One PRE or POST notification as seen by a sink.
#[derive(Debug, Clone, Copy)]
pub struct NodeEvent<'a> {
    pub flags: EventFlags,
    pub node: &'a NodeDescriptor,
    /// Kernel cycles of this execution. Set on POST only.
    pub duration: Option<u64>,
    /// Output tensors of the node. Empty on PRE and in time-only mode.
    pub outputs: &'a [TensorView<'a>],
}

/// Consumer of node events, invoked inside the timed callback region.
///
/// Whatever a sink does is charged to callback overhead, never to the
/// node's own duration.
pub trait NodeSink: Send {
    fn on_event(&mut self, event: &NodeEvent<'_>);

    /// Whether POST events should carry output tensors.
    fn wants_outputs(&self) -> bool {
        true
    }
}

impl<F> NodeSink for F
where
    F: FnMut(&NodeEvent<'_>) + Send,
{
    fn on_event(&mut self, event: &NodeEvent<'_>) {
        self(event)
    }
}

/// Lazy provider of a node's output tensors.
pub trait OutputSource {
    /// Calls `f` with the node's outputs. Implementations call `f` at most
    /// once and may pass an empty slice when outputs are unavailable.
    fn visit(&mut self, f: &mut dyn FnMut(&[TensorView<'_>]));
}

/// Outputs the engine already holds as views.
#[derive(Debug, Clone, Copy)]
pub struct PushedOutputs<'s, 'a>(pub &'s [TensorView<'a>]);

impl OutputSource for PushedOutputs<'_, '_> {
    fn visit(&mut self, f: &mut dyn FnMut(&[TensorView<'_>])) {
        f(self.0)
    }
}

/// Source for PRE events and engines that expose no outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutputs;

impl OutputSource for NoOutputs {
    fn visit(&mut self, f: &mut dyn FnMut(&[TensorView<'_>])) {
        f(&[])
    }
}
