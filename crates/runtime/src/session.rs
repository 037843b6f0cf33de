// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The profiling session with a type-state lifecycle.
//!
//! ```text
//! Session<Uninitialized>
//!     │  .create(&manifest)      model image → backend
//!     ▼
//! Session<Created>
//!     │  .init()                 activations / arena bound
//!     ▼
//! Session<Initialized>
//!     │  .prepare()              I/O descriptors cached, buffers allocated
//!     ▼
//! Session<Ready>  ── .bench() / .run_once() ──▶ reports
//! ```
//!
//! Each transition consumes the session and returns it in the next state,
//! so running a model that was never initialized does not compile.
//! `destroy()` is available in every state.

use crate::backend::{Backend, BackendFactory, InitParams};
use crate::irq::{IrqControl, NoIrq};
use crate::{HarnessConfig, InputFiller, SessionError};
use cycle_clock::{CycleClock, CycleCounter};
use model_ir::{ModelLoader, ModelManifest, ModelReport, NodeDescriptor};
use resource_monitor::{HeapMonitor, StackMonitor};
use std::marker::PhantomData;
use std::path::Path;

// ── Type-state markers ─────────────────────────────────────────────

/// No model instantiated yet.
#[derive(Debug)]
pub struct Uninitialized;

/// A backend holds the model; buffers are not bound.
#[derive(Debug)]
pub struct Created;

/// Weights and activations are bound.
#[derive(Debug)]
pub struct Initialized;

/// I/O descriptors cached; the session can run.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for session states.
pub trait SessionState: std::fmt::Debug {}
impl SessionState for Uninitialized {}
impl SessionState for Created {}
impl SessionState for Initialized {}
impl SessionState for Ready {}

/// Logs the diagnostic of an error that aborts an operation.
pub(crate) fn fail(e: SessionError) -> SessionError {
    e.diagnostic().emit();
    e
}

// ── Session ────────────────────────────────────────────────────────

/// One model on one backend, plus the clock and monitors that observe it.
///
/// # Example
/// ```
/// use model_ir::ModelManifest;
/// use runtime::{HarnessConfig, Session, SimPlatform};
///
/// let manifest = ModelManifest::from_json(r#"{
///     "name": "tiny", "format": "vendor", "schema_version": 1,
///     "macc": 200, "activations_bytes": 64,
///     "tensors": [ { "name": "in", "dtype": "u8", "shape": [1, 8] },
///                  { "name": "out", "dtype": "u8", "shape": [1, 8] } ],
///     "inputs": [0], "outputs": [1],
///     "nodes": [ { "name": "relu", "code": 5, "outputs": [1], "cost_cycles": 100 } ]
/// }"#).unwrap();
///
/// let platform = SimPlatform::new();
/// let mut session = Session::new(
///     HarnessConfig { iterations: 4, ..Default::default() },
///     platform.counter().clone(),
///     platform.factory(),
/// )
/// .unwrap()
/// .create(&manifest)
/// .unwrap()
/// .init()
/// .unwrap()
/// .prepare()
/// .unwrap();
///
/// let report = session.bench().unwrap();
/// assert_eq!(report.iterations, 4);
/// assert_eq!(report.cycles.avg, 100);
/// ```
pub struct Session<S: SessionState = Uninitialized> {
    pub(crate) config: HarnessConfig,
    pub(crate) clock: CycleClock,
    pub(crate) factory: Box<dyn BackendFactory>,
    pub(crate) backend: Option<Box<dyn Backend>>,
    pub(crate) report: Option<ModelReport>,
    pub(crate) inputs: Vec<Vec<u8>>,
    pub(crate) outputs: Vec<Vec<u8>>,
    pub(crate) filler: InputFiller,
    pub(crate) heap: Option<&'static dyn HeapMonitor>,
    pub(crate) stack: Option<Box<dyn StackMonitor>>,
    pub(crate) irq: Box<dyn IrqControl>,
    _state: PhantomData<S>,
}

impl<S: SessionState> Session<S> {
    fn into_state<T: SessionState>(self) -> Session<T> {
        Session {
            config: self.config,
            clock: self.clock,
            factory: self.factory,
            backend: self.backend,
            report: self.report,
            inputs: self.inputs,
            outputs: self.outputs,
            filler: self.filler,
            heap: self.heap,
            stack: self.stack,
            irq: self.irq,
            _state: PhantomData,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    /// Releases the backend. Safe in any state; the engine is destroyed
    /// at most once.
    pub fn destroy(mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.destroy();
        }
        tracing::info!(state = std::any::type_name::<S>(), "session destroyed");
    }

    pub(crate) fn active_backend(
        &mut self,
    ) -> Result<&mut (dyn Backend + 'static), SessionError> {
        self.backend
            .as_deref_mut()
            .ok_or(SessionError::NotReady("no backend"))
    }
}

// ── Uninitialized → Created ────────────────────────────────────────

impl Session<Uninitialized> {
    /// A session reading `counter` and building backends with `factory`.
    ///
    /// Fails when the configuration cannot drive a benchmark, e.g. a zero
    /// clock frequency or zero iterations.
    pub fn new(
        config: HarnessConfig,
        counter: impl CycleCounter + 'static,
        factory: impl BackendFactory + 'static,
    ) -> Result<Self, SessionError> {
        config.validate().map_err(fail)?;
        let clock = CycleClock::new(counter, config.clock).map_err(|e| fail(e.into()))?;
        tracing::info!(
            backend = config.backend.as_str(),
            clock = %config.clock.summary(),
            "session created"
        );
        Ok(Self {
            filler: InputFiller::new(config.seed),
            config,
            clock,
            factory: Box::new(factory),
            backend: None,
            report: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            heap: None,
            stack: None,
            irq: Box::new(NoIrq),
            _state: PhantomData,
        })
    }

    /// Samples heap usage around the benchmark loop.
    pub fn with_heap_monitor(mut self, heap: &'static dyn HeapMonitor) -> Self {
        self.heap = Some(heap);
        self
    }

    /// Measures the stack high-water mark of the benchmark loop.
    pub fn with_stack_monitor(mut self, stack: impl StackMonitor + 'static) -> Self {
        self.stack = Some(Box::new(stack));
        self
    }

    /// Interrupt controller used when `mask_interrupts` is set.
    pub fn with_irq(mut self, irq: impl IrqControl + 'static) -> Self {
        self.irq = Box::new(irq);
        self
    }

    /// Instantiates the model on the configured backend.
    ///
    /// # Errors
    /// [`SessionError::FormatMismatch`] when the image targets the other
    /// backend, [`SessionError::NetworkNotFound`] when a network is
    /// selected and the image does not carry it, and
    /// [`SessionError::ModelCreate`] for malformed images.
    pub fn create(mut self, manifest: &ModelManifest) -> Result<Session<Created>, SessionError> {
        if manifest.format != self.config.backend {
            return Err(fail(SessionError::FormatMismatch {
                expected: self.config.backend.as_str(),
                found: manifest.format.as_str(),
            }));
        }
        if let Some(name) = &self.config.network {
            if *name != manifest.name {
                return Err(fail(SessionError::NetworkNotFound { name: name.clone() }));
            }
        }

        let graph = ModelLoader::from_manifest(manifest).map_err(|e| fail(e.into()))?;
        let backend = self
            .factory
            .create(self.config.backend, graph)
            .map_err(fail)?;
        tracing::info!(
            model = %manifest.name,
            nodes = backend.nodes().len(),
            "model instance created"
        );
        self.backend = Some(backend);
        Ok(self.into_state())
    }

    /// Reads the model image at `path` and instantiates it.
    pub fn create_from_path(self, path: &Path) -> Result<Session<Created>, SessionError> {
        let manifest = ModelLoader::load_manifest(path).map_err(|e| fail(e.into()))?;
        self.create(&manifest)
    }
}

// ── Created → Initialized ──────────────────────────────────────────

impl Session<Created> {
    pub fn nodes(&self) -> &[NodeDescriptor] {
        self.backend.as_ref().map_or(&[], |b| b.nodes())
    }

    /// Binds the activations buffer (vendor) or the tensor arena
    /// (portable).
    pub fn init(mut self) -> Result<Session<Initialized>, SessionError> {
        let params = InitParams {
            activations_capacity: self.config.activations_capacity.as_bytes(),
            arena_size: self.config.arena_size.as_bytes(),
        };
        self.active_backend()?.init(params).map_err(fail)?;
        Ok(self.into_state())
    }
}

// ── Initialized → Ready ────────────────────────────────────────────

impl Session<Initialized> {
    /// Caches the model report and allocates user buffers for the I/O
    /// tensors the engine does not own.
    pub fn prepare(mut self) -> Result<Session<Ready>, SessionError> {
        let report = self.active_backend()?.report().map_err(fail)?;
        if report.inputs.is_empty() || report.outputs.is_empty() {
            return Err(fail(SessionError::Info(format!(
                "'{}' reports {} inputs and {} outputs",
                report.name,
                report.inputs.len(),
                report.outputs.len()
            ))));
        }

        // I/O tensors inside the activations buffer are used in place.
        let backend = self.active_backend()?;
        let engine_inputs: Vec<bool> = (0..report.inputs.len())
            .map(|i| backend.input_buffer(i).is_some())
            .collect();
        let engine_outputs: Vec<bool> = (0..report.outputs.len())
            .map(|i| backend.output_buffer(i).is_some())
            .collect();
        let engine_owned = engine_inputs.iter().chain(&engine_outputs).filter(|&&e| e).count();
        tracing::debug!(engine_owned, "I/O tensors inside the activations buffer");

        self.inputs = report
            .inputs
            .iter()
            .zip(&engine_inputs)
            .map(|(t, &engine)| if engine { Vec::new() } else { vec![0; t.layout.size_bytes] })
            .collect();
        self.outputs = report
            .outputs
            .iter()
            .zip(&engine_outputs)
            .map(|(t, &engine)| if engine { Vec::new() } else { Vec::with_capacity(t.layout.size_bytes) })
            .collect();

        tracing::info!("{}", report.summary());
        self.report = Some(report);
        Ok(self.into_state())
    }
}

// ── Ready ──────────────────────────────────────────────────────────

impl Session<Ready> {
    /// The cached `get_info` report.
    pub fn report(&self) -> Option<&ModelReport> {
        self.report.as_ref()
    }

    pub fn nodes(&self) -> &[NodeDescriptor] {
        self.backend.as_ref().map_or(&[], |b| b.nodes())
    }

    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut (dyn Backend + 'static)> {
        self.backend.as_deref_mut()
    }

    /// Output `index` of the last run, wherever its buffer lives.
    pub fn output(&self, index: usize) -> Option<&[u8]> {
        let backend = self.backend.as_deref()?;
        backend
            .output_buffer(index)
            .or_else(|| self.outputs.get(index).map(Vec::as_slice))
    }

    /// Clears engine-held state, e.g. recurrent tensors.
    pub fn reset_state(&mut self) -> Result<(), SessionError> {
        self.active_backend()?.reset_state()
    }
}

impl<S: SessionState> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &std::any::type_name::<S>())
            .field("backend", &self.config.backend)
            .field("has_backend", &self.backend.is_some())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimPlatform;
    use model_ir::ModelFormat;

    fn manifest(format: ModelFormat) -> ModelManifest {
        let json = format!(
            r#"{{
                "name": "tiny",
                "format": "{}",
                "schema_version": 1,
                "macc": 2000,
                "activations_bytes": 128,
                "tensors": [
                    {{ "name": "in", "dtype": "f32", "shape": [1, 4] }},
                    {{ "name": "mid", "dtype": "i8", "shape": [1, 2, 2, 4] }},
                    {{ "name": "out", "dtype": "f32", "shape": [1, 2] }}
                ],
                "inputs": [0],
                "outputs": [2],
                "nodes": [
                    {{ "name": "conv", "code": 3, "outputs": [1], "cost_cycles": 100 }},
                    {{ "name": "fc", "code": 9, "outputs": [2], "cost_cycles": 100 }}
                ]
            }}"#,
            format.as_str()
        );
        ModelManifest::from_json(&json).unwrap()
    }

    fn session(format: ModelFormat) -> (SimPlatform, Session) {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            backend: format,
            ..Default::default()
        };
        let s = Session::new(config, platform.counter().clone(), platform.factory()).unwrap();
        (platform, s)
    }

    #[test]
    fn test_lifecycle_to_ready() {
        for format in [ModelFormat::Vendor, ModelFormat::Portable] {
            let (_p, s) = session(format);
            let ready = s
                .create(&manifest(format))
                .unwrap()
                .init()
                .unwrap()
                .prepare()
                .unwrap();
            let report = ready.report().unwrap();
            assert_eq!(report.n_nodes, 2);
            assert_eq!(report.format, format);
            assert_eq!(ready.nodes().len(), 2);
            ready.destroy();
        }
    }

    #[test]
    fn test_io_inside_activations_not_allocated() {
        let mut m = manifest(ModelFormat::Vendor);
        m.tensors[0].in_activations = true;
        m.tensors[2].in_activations = true;
        let (_p, s) = session(ModelFormat::Vendor);
        let mut ready = s.create(&m).unwrap().init().unwrap().prepare().unwrap();
        assert!(ready.inputs[0].is_empty());
        assert_eq!(ready.outputs[0].capacity(), 0);

        let out = ready.run_once(&[&[1; 16]], crate::RunMode::Timing).unwrap();
        let expected: Vec<u8> = (0..8).map(|j| 17 + j).collect();
        assert_eq!(out.outputs[0], expected);
        assert_eq!(ready.output(0), Some(&expected[..]));

        let r = ready.bench().unwrap();
        assert_eq!(r.iterations, 16);
        assert!(ready.inputs[0].is_empty());
    }

    #[test]
    fn test_format_mismatch() {
        let (_p, s) = session(ModelFormat::Vendor);
        let err = s.create(&manifest(ModelFormat::Portable)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::FormatMismatch {
                expected: "vendor",
                found: "portable"
            }
        ));
        assert_eq!(err.kind(), "model_create");
    }

    #[test]
    fn test_network_not_found() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            network: Some("other".into()),
            ..Default::default()
        };
        let s = Session::new(config, platform.counter().clone(), platform.factory()).unwrap();
        assert!(matches!(
            s.create(&manifest(ModelFormat::Vendor)),
            Err(SessionError::NetworkNotFound { .. })
        ));
    }

    #[test]
    fn test_schema_mismatch_is_model_create() {
        let (_p, s) = session(ModelFormat::Vendor);
        let mut m = manifest(ModelFormat::Vendor);
        m.schema_version = 9;
        let err = s.create(&m).unwrap_err();
        assert!(matches!(err, SessionError::ModelCreate(_)));
        assert_eq!(err.code(), -1);
    }

    #[test]
    fn test_zero_clock_rejected_at_start() {
        let platform = SimPlatform::new();
        let mut config = HarnessConfig::default();
        config.clock.hclk_hz = 0;
        let err = Session::new(config, platform.counter().clone(), platform.factory()).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_buffer_size_error() {
        let platform = SimPlatform::new();
        let config = HarnessConfig {
            activations_capacity: memory_manager::ByteSize::parse("64").unwrap(),
            ..Default::default()
        };
        let s = Session::new(config, platform.counter().clone(), platform.factory()).unwrap();
        let err = s
            .create(&manifest(ModelFormat::Vendor))
            .unwrap()
            .init()
            .unwrap_err();
        assert_eq!(err.code(), -5);
    }

    #[test]
    fn test_destroy_from_created() {
        let (_p, s) = session(ModelFormat::Portable);
        let created = s.create(&manifest(ModelFormat::Portable)).unwrap();
        assert_eq!(created.nodes()[0].kind(), "CONV_2D");
        created.destroy();
    }

    #[test]
    fn test_debug_format() {
        let (_p, s) = session(ModelFormat::Vendor);
        let debug = format!("{s:?}");
        assert!(debug.contains("Uninitialized"));
        assert!(debug.contains("Vendor"));
    }
}
