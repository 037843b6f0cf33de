// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Affine quantization parameters.

/// `real = scale * (q - zero_point)`.
///
/// Only per-tensor parameters are reported. For per-channel quantized
/// tensors the engine adapters report the first channel.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Quantization {
    pub scale: f32,
    pub zero_point: i32,
}

impl Quantization {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    /// Scale and zero point as reported for a possibly unquantized tensor:
    /// `(0.0, 0)` when there are no parameters.
    pub fn or_zero(q: Option<Self>) -> (f32, i32) {
        q.map_or((0.0, 0), |q| (q.scale, q.zero_point))
    }

    pub fn dequantize(&self, q: i32) -> f32 {
        self.scale * (q - self.zero_point) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dequantize() {
        let q = Quantization::new(0.5, -128);
        assert_eq!(q.dequantize(-128), 0.0);
        assert_eq!(q.dequantize(-126), 1.0);
    }

    #[test]
    fn test_or_zero() {
        assert_eq!(Quantization::or_zero(None), (0.0, 0));
        assert_eq!(
            Quantization::or_zero(Some(Quantization::new(0.25, 3))),
            (0.25, 3)
        );
    }
}
