// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Adapter for the vendor multi-network runtime.
//!
//! The vendor runtime identifies nodes by `(c_idx, type, id)` and pushes
//! each node's output tensors to its observer hook. The adapter maps
//! `c_idx` onto the node descriptors built at create time and forwards
//! every event, outputs included, to the registered [`Observer`].

use crate::backend::{check_inputs, Backend, InitParams, RunStatus};
use crate::{EngineFault, SessionError};
use memory_manager::{resolve_activations, ActivationSource};
use model_ir::{ModelFormat, ModelReport, NodeDescriptor};
use observer::{
    EventFlags, Observer, ObserverError, ObserverId, ObserverOptions, ObserverSlot, PushedOutputs,
};
use tensor_core::TensorView;

/// Node identity as the vendor runtime reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorNode {
    pub c_idx: u16,
    /// Layer type; bit 15 marks a time-distributed wrapper.
    pub type_code: u16,
    pub id: i16,
}

/// Per-node introspection record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorNodeInfo {
    pub node: VendorNode,
    pub name: String,
    pub outputs: Vec<usize>,
}

/// Observer hook the vendor runtime calls around every node.
pub trait VendorHook {
    fn on_node(&mut self, flags: EventFlags, node: &VendorNode, tensors: &[TensorView<'_>]);
}

/// Capability set of the vendor runtime.
pub trait VendorEngine: Send {
    /// Network report, valid after create.
    fn info(&self) -> Result<ModelReport, EngineFault>;

    /// Externally mapped activations address baked into the network, if any.
    fn ext_activations_addr(&self) -> Option<u32>;

    fn init(&mut self, activations: ActivationSource) -> Result<(), EngineFault>;

    fn node_info(&self, c_idx: u16) -> Option<VendorNodeInfo>;

    /// Runs one inference and returns the number of processed batches.
    ///
    /// Inputs placed in the activations buffer may arrive empty and are
    /// read from [`input_buffer`](Self::input_buffer). Outputs placed there
    /// stay in [`output_buffer`](Self::output_buffer).
    fn run(
        &mut self,
        inputs: &[&[u8]],
        outputs: &mut [Vec<u8>],
        hook: Option<&mut dyn VendorHook>,
    ) -> Result<u32, EngineFault>;

    /// Buffer of input `index` inside the activations buffer, after init.
    fn input_buffer(&mut self, index: usize) -> Option<&mut [u8]>;

    /// Buffer of output `index` inside the activations buffer, after init.
    fn output_buffer(&self, index: usize) -> Option<&[u8]>;

    fn destroy(&mut self);
}

/// [`Backend`] over a [`VendorEngine`].
pub struct VendorAdapter<E: VendorEngine> {
    engine: E,
    report: ModelReport,
    nodes: Vec<NodeDescriptor>,
    slot: ObserverSlot,
    activations: Option<ActivationSource>,
    destroyed: bool,
}

impl<E: VendorEngine> VendorAdapter<E> {
    /// Queries the network report and node table of a created engine.
    pub fn create(engine: E) -> Result<Self, SessionError> {
        let report = engine
            .info()
            .map_err(|e| SessionError::Info(e.to_string()))?;

        let nodes = (0..report.n_nodes)
            .map(|index| {
                let info = u16::try_from(index)
                    .ok()
                    .and_then(|c_idx| engine.node_info(c_idx))
                    .ok_or_else(|| SessionError::Info(format!("no info for c-node {index}")))?;
                Ok(NodeDescriptor {
                    index,
                    name: info.name,
                    format: ModelFormat::Vendor,
                    code: u32::from(info.node.type_code),
                    version: 1,
                    id: i32::from(info.node.id),
                    outputs: info.outputs,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?;

        tracing::info!(
            network = %report.name,
            nodes = nodes.len(),
            "vendor network created"
        );
        Ok(Self {
            engine,
            report,
            nodes,
            slot: ObserverSlot::default(),
            activations: None,
            destroyed: false,
        })
    }

    /// Where the activations were bound, after init.
    pub fn activations(&self) -> Option<ActivationSource> {
        self.activations
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: VendorEngine> Backend for VendorAdapter<E> {
    fn kind(&self) -> ModelFormat {
        ModelFormat::Vendor
    }

    fn init(&mut self, params: InitParams) -> Result<(), SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        let source = resolve_activations(
            self.engine.ext_activations_addr(),
            self.report.activations_bytes,
            params.activations_capacity,
        )?;
        self.engine
            .init(source)
            .map_err(|e| SessionError::Init(e.to_string()))?;
        tracing::info!(
            local = source.is_local(),
            bytes = source.required(),
            "vendor activations bound"
        );
        self.activations = Some(source);
        Ok(())
    }

    fn report(&self) -> Result<ModelReport, SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        Ok(self.report.clone())
    }

    fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    fn run(&mut self, inputs: &[&[u8]], outputs: &mut [Vec<u8>]) -> Result<RunStatus, SessionError> {
        if self.destroyed {
            return Err(SessionError::Destroyed);
        }
        if self.activations.is_none() {
            return Err(SessionError::Init("network not initialized".into()));
        }
        check_inputs(&self.report.inputs, inputs)?;

        let (result, timing) = match self.slot.active_mut() {
            Some(observer) => {
                observer.begin_invocation();
                let mut bridge = VendorBridge {
                    observer: &mut *observer,
                    nodes: &self.nodes,
                };
                let result = self.engine.run(inputs, outputs, Some(&mut bridge));
                (result, Some(observer.end_invocation()))
            }
            None => (self.engine.run(inputs, outputs, None), None),
        };

        let batches = result.map_err(|e| SessionError::Invoke {
            iteration: 0,
            detail: e.to_string(),
        })?;
        Ok(RunStatus { batches, timing })
    }

    fn input_buffer(&mut self, index: usize) -> Option<&mut [u8]> {
        if self.destroyed || !self.report.inputs.get(index)?.in_activations {
            return None;
        }
        self.engine.input_buffer(index)
    }

    fn output_buffer(&self, index: usize) -> Option<&[u8]> {
        if self.destroyed || !self.report.outputs.get(index)?.in_activations {
            return None;
        }
        self.engine.output_buffer(index)
    }

    fn register_observer(&mut self, options: ObserverOptions) -> Result<ObserverId, ObserverError> {
        self.slot.register(options, self.nodes.len())
    }

    fn unregister_observer(&mut self, id: ObserverId) -> Result<Observer, ObserverError> {
        self.slot.unregister(id)
    }

    fn observer(&self) -> Option<&Observer> {
        self.slot.active()
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.engine.destroy();
        self.destroyed = true;
        tracing::info!(network = %self.report.name, "vendor network destroyed");
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl<E: VendorEngine> Drop for VendorAdapter<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Routes vendor hook calls to the observer.
struct VendorBridge<'a> {
    observer: &'a mut Observer,
    nodes: &'a [NodeDescriptor],
}

impl VendorHook for VendorBridge<'_> {
    fn on_node(&mut self, flags: EventFlags, node: &VendorNode, tensors: &[TensorView<'_>]) {
        match self.nodes.get(usize::from(node.c_idx)) {
            Some(desc) => self.observer.on_event(flags, desc, &mut PushedOutputs(tensors)),
            None => tracing::trace!(c_idx = node.c_idx, "event for unknown c-node ignored"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimControl, SimVendorEngine};
    use cycle_clock::{ClockConfig, CycleClock, SimulatedCounter};
    use model_ir::{ModelLoader, ModelManifest};
    use observer::NodeEvent;
    use std::sync::{Arc, Mutex};

    const MODEL: &str = r#"{
        "name": "har",
        "format": "vendor",
        "schema_version": 1,
        "macc": 5000,
        "activations_bytes": 256,
        "tensors": [
            { "name": "in", "dtype": "f32", "shape": [1, 8] },
            { "name": "lstm", "dtype": "f32", "shape": [1, 4, 8] },
            { "name": "out", "dtype": "f32", "shape": [1, 4] },
            { "name": "aux", "dtype": "i8", "shape": [1, 2] }
        ],
        "inputs": [0],
        "outputs": [2],
        "nodes": [
            { "name": "lstm_1", "code": 12, "time_distributed": true, "id": 3,
              "outputs": [1], "cost_cycles": 500 },
            { "name": "dense_1", "code": 1, "id": 5, "outputs": [2, 3], "cost_cycles": 100 }
        ]
    }"#;

    fn adapter(counter: &SimulatedCounter) -> VendorAdapter<SimVendorEngine> {
        let graph = ModelLoader::from_manifest(&ModelManifest::from_json(MODEL).unwrap()).unwrap();
        let engine = SimVendorEngine::new(graph, counter.clone(), None, Arc::new(SimControl::default()));
        VendorAdapter::create(engine).unwrap()
    }

    fn params(capacity: usize) -> InitParams {
        InitParams {
            activations_capacity: capacity,
            arena_size: 0,
        }
    }

    #[test]
    fn test_node_translation() {
        let a = adapter(&SimulatedCounter::new());
        let nodes = a.nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].display_kind(), "TD-LSTM");
        assert_eq!(nodes[0].id, 3);
        assert_eq!(nodes[1].kind(), "Dense");
        assert_eq!(nodes[1].outputs, vec![2, 3]);
    }

    #[test]
    fn test_init_buffer_too_small() {
        let mut a = adapter(&SimulatedCounter::new());
        let err = a.init(params(128)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::BufferSize {
                required: 256,
                available: 128
            }
        ));
        a.init(params(1024)).unwrap();
        assert!(a.activations().unwrap().is_local());
    }

    #[test]
    fn test_run_requires_init() {
        let mut a = adapter(&SimulatedCounter::new());
        let input = vec![0u8; 32];
        let mut out = vec![Vec::new()];
        assert!(matches!(
            a.run(&[&input], &mut out),
            Err(SessionError::Init(_))
        ));
    }

    #[test]
    fn test_observer_sees_pushed_outputs() {
        let counter = SimulatedCounter::new();
        let clock = CycleClock::new(counter.clone(), ClockConfig::default()).unwrap();
        let mut a = adapter(&counter);
        a.init(params(1024)).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        a.register_observer(ObserverOptions::new().time_source(clock).sink(
            move |e: &NodeEvent<'_>| {
                if e.flags.is_post() {
                    log.lock().unwrap().push((e.node.index, e.outputs.len(), e.flags.is_last()));
                }
            },
        ))
        .unwrap();

        let input = vec![0u8; 32];
        let mut out = vec![Vec::new()];
        let status = a.run(&[&input], &mut out).unwrap();
        assert_eq!(status.batches, 1);
        assert_eq!(status.timing.unwrap().node_dur, 600);
        assert_eq!(out[0].len(), 16);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 1, false), (1, 2, true)]);
    }

    #[test]
    fn test_io_inside_activations_used_in_place() {
        let mut m = ModelManifest::from_json(MODEL).unwrap();
        m.tensors[0].in_activations = true;
        m.tensors[2].in_activations = true;
        let graph = ModelLoader::from_manifest(&m).unwrap();
        let engine = SimVendorEngine::new(graph, SimulatedCounter::new(), None, Arc::default());
        let mut a = VendorAdapter::create(engine).unwrap();
        assert!(a.input_buffer(0).is_none());

        a.init(params(1024)).unwrap();
        a.input_buffer(0).unwrap().fill(1);
        let in_place: &[u8] = &[];
        let mut out = vec![Vec::new()];
        a.run(&[in_place], &mut out).unwrap();
        assert!(out[0].is_empty());
        // seed 32 from the in-place input, written by node 1
        let expected: Vec<u8> = (0..16).map(|j| 33 + j).collect();
        assert_eq!(a.output_buffer(0).unwrap(), &expected[..]);
    }

    #[test]
    fn test_user_io_not_exposed() {
        let mut a = adapter(&SimulatedCounter::new());
        a.init(params(1024)).unwrap();
        assert!(a.input_buffer(0).is_none());
        assert!(a.output_buffer(0).is_none());
    }

    #[test]
    fn test_wrong_input_size() {
        let mut a = adapter(&SimulatedCounter::new());
        a.init(params(1024)).unwrap();
        let input = vec![0u8; 3];
        let mut out = vec![Vec::new()];
        assert!(matches!(
            a.run(&[&input], &mut out),
            Err(SessionError::Input { index: 0, .. })
        ));
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut a = adapter(&SimulatedCounter::new());
        a.destroy();
        a.destroy();
        assert!(a.is_destroyed());
        assert!(matches!(a.report(), Err(SessionError::Destroyed)));
    }
}
