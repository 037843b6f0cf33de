// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptions shared by both inference backends.
//!
//! This crate provides:
//! - [`DType`]: element formats understood by the vendor runtime and the
//!   portable interpreter (float, integer, fixed-point, boolean).
//! - [`Shape`]: a native, engine-ranked dimension list.
//! - [`Shape4`]: the `{batch, height, width, channels}` quadruple every
//!   report uses, produced by [`Shape::normalize`].
//! - [`Quantization`]: affine scale / zero-point parameters.
//! - [`TensorView`]: a non-owning descriptor of one tensor buffer.
//!
//! Nothing here owns tensor memory. Buffers belong to the engine or to the
//! session that allocated them.

mod dtype;
mod error;
mod quant;
mod shape;
mod view;

pub use dtype::DType;
pub use error::TensorError;
pub use quant::Quantization;
pub use shape::{Shape, Shape4};
pub use view::{TensorLayout, TensorView};
