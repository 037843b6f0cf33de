// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic random input generation for benchmarks.
//!
//! Values are drawn uniformly from `[-1, 1]`. Float tensors receive the
//! value itself; integer tensors receive `v * 127` truncated to `i8` in
//! every byte; boolean tensors receive `1` for positive draws and `0`
//! otherwise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensor_core::{DType, TensorLayout};

/// Seeded generator shared across iterations so every iteration sees
/// fresh, yet reproducible, data.
#[derive(Debug, Clone)]
pub struct InputFiller {
    rng: StdRng,
}

impl InputFiller {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn draw(&mut self) -> f32 {
        self.rng.gen_range(-1.0f32..=1.0)
    }

    /// Fills `buf`, laid out as `layout`, with random data.
    pub fn fill(&mut self, layout: &TensorLayout, buf: &mut [u8]) {
        match layout.dtype {
            DType::F32 => {
                for chunk in buf.chunks_exact_mut(4) {
                    chunk.copy_from_slice(&self.draw().to_le_bytes());
                }
            }
            DType::Bool => {
                for b in buf.iter_mut() {
                    let v = (self.draw() * 127.0) as i8;
                    *b = u8::from(v > 0);
                }
            }
            _ => {
                for b in buf.iter_mut() {
                    *b = (self.draw() * 127.0) as i8 as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape4;

    fn layout(dtype: DType, n: usize) -> TensorLayout {
        TensorLayout::new(dtype, Shape4::new(1, 1, 1, n), None)
    }

    #[test]
    fn test_same_seed_same_data() {
        let l = layout(DType::I8, 64);
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        InputFiller::new(3).fill(&l, &mut a);
        InputFiller::new(3).fill(&l, &mut b);
        assert_eq!(a, b);
        InputFiller::new(4).fill(&l, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn test_float_range() {
        let l = layout(DType::F32, 256);
        let mut buf = vec![0u8; 1024];
        InputFiller::new(3).fill(&l, &mut buf);
        for chunk in buf.chunks_exact(4) {
            let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_bool_is_binary() {
        let l = layout(DType::Bool, 128);
        let mut buf = vec![7u8; 128];
        InputFiller::new(3).fill(&l, &mut buf);
        assert!(buf.iter().all(|&b| b <= 1));
        assert!(buf.contains(&1));
    }

    #[test]
    fn test_int_range() {
        let l = layout(DType::I8, 512);
        let mut buf = vec![0u8; 512];
        InputFiller::new(3).fill(&l, &mut buf);
        assert!(buf.iter().all(|&b| (b as i8) >= -127));
    }

    #[test]
    fn test_successive_fills_differ() {
        let l = layout(DType::U8, 32);
        let mut filler = InputFiller::new(3);
        let mut a = vec![0u8; 32];
        let mut b = vec![0u8; 32];
        filler.fill(&l, &mut a);
        filler.fill(&l, &mut b);
        assert_ne!(a, b);
    }
}
