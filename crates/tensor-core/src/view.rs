// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor layout and non-owning tensor views.

use crate::{DType, Quantization, Shape, Shape4, TensorError};

/// Format, normalized geometry and quantization of one tensor.
///
/// This is the part of a tensor description that outlives any single
/// node invocation and can be stored in reports.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorLayout {
    pub dtype: DType,
    pub shape: Shape4,
    pub size_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant: Option<Quantization>,
}

impl TensorLayout {
    /// Layout for a tensor already expressed in 4D.
    pub fn new(dtype: DType, shape: Shape4, quant: Option<Quantization>) -> Self {
        Self {
            dtype,
            shape,
            size_bytes: shape.num_elements() * dtype.size_bytes(),
            quant,
        }
    }

    /// Layout for a tensor in its native rank. Fails for ranks other
    /// than 2, 3 or 4.
    pub fn from_native(
        dtype: DType,
        shape: &Shape,
        quant: Option<Quantization>,
    ) -> Result<Self, TensorError> {
        Ok(Self::new(dtype, shape.normalize()?, quant))
    }

    /// `(scale, zero_point)`, or `(0.0, 0)` when unquantized.
    pub fn scale_zero_point(&self) -> (f32, i32) {
        Quantization::or_zero(self.quant)
    }
}

/// A non-owning view of one tensor buffer.
///
/// `data` borrows engine- or session-owned memory. For tensors
/// materialized in a temporary arena scope, the borrow ends with the node
/// callback that received the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorView<'a> {
    /// Engine tensor index (or position in the node's output list).
    pub index: usize,
    pub layout: TensorLayout,
    data: Option<&'a [u8]>,
}

impl<'a> TensorView<'a> {
    /// A view over `data`, which must be exactly `layout.size_bytes` long.
    pub fn new(index: usize, layout: TensorLayout, data: &'a [u8]) -> Result<Self, TensorError> {
        if data.len() != layout.size_bytes {
            return Err(TensorError::BufferSizeMismatch {
                expected: layout.size_bytes,
                actual: data.len(),
            });
        }
        Ok(Self {
            index,
            layout,
            data: Some(data),
        })
    }

    /// A description with no buffer attached.
    pub fn layout_only(index: usize, layout: TensorLayout) -> Self {
        Self {
            index,
            layout,
            data: None,
        }
    }

    pub fn data(&self) -> Option<&'a [u8]> {
        self.data
    }

    pub fn dtype(&self) -> DType {
        self.layout.dtype
    }

    pub fn shape(&self) -> Shape4 {
        self.layout.shape
    }

    pub fn size_bytes(&self) -> usize {
        self.layout.size_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_native() {
        let l = TensorLayout::from_native(DType::I8, &Shape::new(vec![1, 10]), None).unwrap();
        assert_eq!(l.shape, Shape4::new(1, 1, 1, 10));
        assert_eq!(l.size_bytes, 10);
        assert_eq!(l.scale_zero_point(), (0.0, 0));
    }

    #[test]
    fn test_layout_rejects_rank5() {
        let res = TensorLayout::from_native(DType::F32, &Shape::new(vec![1, 1, 1, 1, 1]), None);
        assert!(matches!(res, Err(TensorError::UnsupportedRank { rank: 5, .. })));
    }

    #[test]
    fn test_view_checks_size() {
        let l = TensorLayout::new(DType::F32, Shape4::new(1, 1, 1, 2), None);
        let buf = [0u8; 8];
        let v = TensorView::new(3, l, &buf).unwrap();
        assert_eq!(v.index, 3);
        assert_eq!(v.data().map(<[u8]>::len), Some(8));

        let short = [0u8; 4];
        assert_eq!(
            TensorView::new(3, l, &short),
            Err(TensorError::BufferSizeMismatch {
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_layout_only() {
        let q = Quantization::new(0.1, 5);
        let l = TensorLayout::new(DType::U8, Shape4::new(1, 4, 4, 1), Some(q));
        let v = TensorView::layout_only(0, l);
        assert!(v.data().is_none());
        assert_eq!(v.layout.scale_zero_point(), (0.1, 5));
    }

    #[test]
    fn test_layout_serde() {
        let l = TensorLayout::new(DType::Fixed { bits: 8, frac: 7 }, Shape4::new(1, 2, 2, 3), None);
        let json = serde_json::to_string(&l).unwrap();
        assert!(!json.contains("quant"));
        let back: TensorLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);
    }
}
