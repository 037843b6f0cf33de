// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! What the harness knows about a model without running it.
//!
//! Inference engines are external collaborators; this crate only carries
//! the metadata the profiling core needs to interpret them:
//!
//! - [`ModelManifest`]: the JSON model image (header, tensors, nodes).
//! - [`NodeDescriptor`]: one operator instance, keyed by its contiguous
//!   index, with its kind, version tag and output tensors.
//! - [`ModelGraph`]: nodes and tensors with a **type-state pattern**
//!   (`Loaded` → `Validated`).
//! - [`ModelReport`]: the `get_info` answer (name, versions, MACC, sizes,
//!   input/output layouts).
//! - [`ModelLoader`]: reads a manifest from disk via a memory map.
//!
//! # Example
//! ```no_run
//! use model_ir::ModelLoader;
//! use std::path::Path;
//!
//! let graph = ModelLoader::load(Path::new("./models/kws.json")).unwrap();
//! println!("{}", graph.summary());
//! for node in graph.iter_nodes() {
//!     println!("  {}", node.summary());
//! }
//! ```

mod error;
pub mod graph;
mod layer;
mod loader;
mod manifest;
mod report;

pub use error::ModelError;
pub use graph::{GraphHeader, ModelGraph, NodeCost};
pub use layer::{portable_op_name, vendor_layer_name, NodeDescriptor, TIME_DISTRIBUTED_BIT};
pub use loader::ModelLoader;
pub use manifest::{ManifestNode, ManifestTensor, ModelFormat, ModelManifest, SUPPORTED_SCHEMA};
pub use report::{ModelReport, TensorDescriptor, Version};
