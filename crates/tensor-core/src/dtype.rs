// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element formats.

use crate::TensorError;

/// Element formats a [`crate::TensorView`] can describe.
///
/// The vendor runtime expresses integer tensors either as affine-quantized
/// 8-bit values or as signed fixed point `Qm.n`; the portable interpreter
/// uses plain integer types with optional affine parameters. Both map here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    I8,
    U8,
    I16,
    U16,
    I32,
    /// One byte per element, 0 or 1.
    Bool,
    /// Signed fixed point with `bits` total bits, `frac` of them fractional.
    Fixed { bits: u8, frac: u8 },
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::I16 | DType::U16 => 2,
            DType::I8 | DType::U8 | DType::Bool => 1,
            DType::Fixed { bits, .. } => usize::from(bits).div_ceil(8),
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32)
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::I8 => "i8",
            DType::U8 => "u8",
            DType::I16 => "i16",
            DType::U16 => "u16",
            DType::I32 => "i32",
            DType::Bool => "bool",
            DType::Fixed { .. } => "fxp",
        }
    }

    /// Map a portable-interpreter type code onto a format.
    ///
    /// Codes follow the flatbuffer schema of the portable model format:
    /// 1 float32, 2 int32, 3 uint8, 6 bool, 7 int16, 9 int8.
    pub fn from_portable_code(code: u32) -> Result<Self, TensorError> {
        match code {
            1 => Ok(DType::F32),
            2 => Ok(DType::I32),
            3 => Ok(DType::U8),
            6 => Ok(DType::Bool),
            7 => Ok(DType::I16),
            9 => Ok(DType::I8),
            other => Err(TensorError::UnknownTypeCode { code: other }),
        }
    }

    /// Inverse of [`from_portable_code`](Self::from_portable_code).
    /// `None` for formats the portable interpreter cannot express.
    pub fn portable_code(self) -> Option<u32> {
        match self {
            DType::F32 => Some(1),
            DType::I32 => Some(2),
            DType::U8 => Some(3),
            DType::Bool => Some(6),
            DType::I16 => Some(7),
            DType::I8 => Some(9),
            DType::U16 | DType::Fixed { .. } => None,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Fixed { bits, frac } => write!(f, "q{}.{}", bits - 1 - frac, frac),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::Bool.size_bytes(), 1);
        assert_eq!(DType::Fixed { bits: 16, frac: 7 }.size_bytes(), 2);
        assert_eq!(DType::Fixed { bits: 12, frac: 4 }.size_bytes(), 2);
    }

    #[test]
    fn test_portable_codes() {
        assert_eq!(DType::from_portable_code(9).unwrap(), DType::I8);
        assert_eq!(
            DType::from_portable_code(42),
            Err(TensorError::UnknownTypeCode { code: 42 })
        );
        for dtype in [DType::F32, DType::I32, DType::U8, DType::Bool, DType::I16, DType::I8] {
            let code = dtype.portable_code().unwrap();
            assert_eq!(DType::from_portable_code(code).unwrap(), dtype);
        }
        assert_eq!(DType::U16.portable_code(), None);
    }

    #[test]
    fn test_display_fixed() {
        assert_eq!(DType::Fixed { bits: 8, frac: 7 }.to_string(), "q0.7");
        assert_eq!(DType::I8.to_string(), "i8");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DType::U8).unwrap();
        assert_eq!(json, "\"u8\"");
    }
}
