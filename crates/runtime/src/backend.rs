// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The unified backend interface.
//!
//! Both adapters present the same capability set to the session:
//! `init`, `report` (get_info), `nodes` (per-node introspection), `run`,
//! observer registration and `destroy`. Engine-specific node identities
//! and tensor access styles stay inside the adapters.

use crate::SessionError;
use model_ir::graph::Validated;
use model_ir::{ModelFormat, ModelGraph, ModelReport, NodeDescriptor, TensorDescriptor};
use observer::{InvocationTiming, Observer, ObserverError, ObserverId, ObserverOptions};

/// Outcome of one engine run call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Batches the engine reports as processed.
    pub batches: u32,
    /// Observer breakdown, when an observer is registered.
    pub timing: Option<InvocationTiming>,
}

/// Sizes the session needs to resolve buffers at init time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitParams {
    /// Capacity of the statically reserved local activations buffer.
    pub activations_capacity: usize,
    /// Capacity of the tensor arena.
    pub arena_size: usize,
}

/// An inference engine behind a common reporting model.
pub trait Backend: Send {
    fn kind(&self) -> ModelFormat;

    /// Binds weights and activations.
    fn init(&mut self, params: InitParams) -> Result<(), SessionError>;

    /// The model report (`get_info`).
    fn report(&self) -> Result<ModelReport, SessionError>;

    /// Node descriptors in index order.
    fn nodes(&self) -> &[NodeDescriptor];

    /// Runs one inference. `outputs[i]` is resized to output `i`'s size.
    ///
    /// An input the engine owns (see [`input_buffer`](Self::input_buffer))
    /// may be passed as an empty slice: its data is already in place. An
    /// output the engine owns is left in the engine and `outputs[i]` is
    /// cleared.
    fn run(&mut self, inputs: &[&[u8]], outputs: &mut [Vec<u8>]) -> Result<RunStatus, SessionError>;

    /// Engine-owned buffer of input `index`, when the tensor lives inside
    /// the activations buffer.
    fn input_buffer(&mut self, _index: usize) -> Option<&mut [u8]> {
        None
    }

    /// Engine-owned buffer of output `index`, when the tensor lives inside
    /// the activations buffer.
    fn output_buffer(&self, _index: usize) -> Option<&[u8]> {
        None
    }

    fn register_observer(&mut self, options: ObserverOptions) -> Result<ObserverId, ObserverError>;

    fn unregister_observer(&mut self, id: ObserverId) -> Result<Observer, ObserverError>;

    fn observer(&self) -> Option<&Observer>;

    /// Clears engine-held state between runs.
    fn reset_state(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    /// Releases engine resources. Calling it twice is a no-op.
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}

/// Builds backends for validated model graphs.
pub trait BackendFactory: Send {
    fn create(
        &self,
        kind: ModelFormat,
        graph: ModelGraph<Validated>,
    ) -> Result<Box<dyn Backend>, SessionError>;
}

/// Checks caller-supplied inputs against the model's input descriptors.
/// An empty slice is accepted for inputs inside the activations buffer.
pub(crate) fn check_inputs(
    descriptors: &[TensorDescriptor],
    inputs: &[&[u8]],
) -> Result<(), SessionError> {
    if inputs.len() != descriptors.len() {
        return Err(SessionError::Input {
            index: inputs.len(),
            detail: format!("{} inputs given, model takes {}", inputs.len(), descriptors.len()),
        });
    }
    for (index, (desc, data)) in descriptors.iter().zip(inputs).enumerate() {
        if desc.in_activations && data.is_empty() {
            continue;
        }
        if data.len() != desc.layout.size_bytes {
            return Err(SessionError::Input {
                index,
                detail: format!(
                    "{} bytes given, '{}' needs {}",
                    data.len(),
                    desc.name,
                    desc.layout.size_bytes
                ),
            });
        }
    }
    Ok(())
}
