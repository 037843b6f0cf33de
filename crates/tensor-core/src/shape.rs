// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Native shapes and their normalized 4D form.

use crate::{DType, TensorError};
use std::fmt;

/// The dimension list a backend reports, in its own rank.
///
/// The portable interpreter reports `[N, C]`, `[N, H, C]` or `[N, H, W, C]`
/// depending on the operator. Reports always go through [`Shape::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![1, 8, 8, 3]);
    /// assert_eq!(s.rank(), 4);
    /// assert_eq!(s.num_elements(), 192);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Computes the memory footprint in bytes for a given [`DType`].
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Map the native dimensions onto `(batch, height, width, channels)`.
    ///
    /// - `[N, C]` → `(N, 1, 1, C)`
    /// - `[N, H, C]` → `(N, H, 1, C)`
    /// - `[N, H, W, C]` → `(N, H, W, C)`
    ///
    /// Any other rank is rejected.
    pub fn normalize(&self) -> Result<Shape4, TensorError> {
        match *self.dims.as_slice() {
            [n, c] => Ok(Shape4::new(n, 1, 1, c)),
            [n, h, c] => Ok(Shape4::new(n, h, 1, c)),
            [n, h, w, c] => Ok(Shape4::new(n, h, w, c)),
            _ => Err(TensorError::UnsupportedRank {
                rank: self.rank(),
                dims: self.dims.clone(),
            }),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

/// Normalized tensor geometry used by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape4 {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape4 {
    pub fn new(batch: usize, height: usize, width: usize, channels: usize) -> Self {
        Self {
            batch,
            height,
            width,
            channels,
        }
    }

    /// Elements in a single batch item.
    pub fn item_elements(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn num_elements(&self) -> usize {
        self.batch * self.item_elements()
    }
}

impl fmt::Display for Shape4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.batch, self.height, self.width, self.channels
        )
    }
}
