// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Byte counts and their human-readable form.
//!
//! Buffer sizes in configuration files are written the way linker scripts
//! and datasheets write them: `"64K"`, `"1M"`, or a plain byte count.

use crate::MemoryError;
use std::fmt;

/// A byte count.
///
/// # Parsing
/// Supports binary suffixes, case-insensitive:
/// - `"16K"` or `"16KB"` → 16 × 1024 bytes
/// - `"1M"` or `"1MB"` → 1 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
/// - `"512"` or `"512B"` → 512 bytes
///
/// In TOML and JSON a `ByteSize` may be written either as such a string or
/// as a bare integer.
///
/// # Examples
/// ```
/// use memory_manager::ByteSize;
///
/// assert_eq!(ByteSize::parse("64K").unwrap().as_bytes(), 65_536);
/// assert_eq!(ByteSize::from_kb(2).to_string(), "2K");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "SizeRepr", into = "String")]
pub struct ByteSize {
    bytes: usize,
}

impl ByteSize {
    pub const fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub const fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Returns the size in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable size string. Zero is accepted.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let invalid = || MemoryError::InvalidSize {
            input: s.to_string(),
        };
        let t = s.trim();
        if t.is_empty() {
            return Err(invalid());
        }

        let upper = t.to_ascii_uppercase();
        let stripped = upper.strip_suffix('B').unwrap_or(&upper);
        let (num_str, multiplier) = match stripped.chars().last() {
            Some('K') => (&stripped[..stripped.len() - 1], 1024),
            Some('M') => (&stripped[..stripped.len() - 1], 1024 * 1024),
            Some('G') => (&stripped[..stripped.len() - 1], 1024 * 1024 * 1024),
            _ => (stripped, 1),
        };

        let value: usize = num_str.trim().parse().map_err(|_| invalid())?;
        let bytes = value.checked_mul(multiplier).ok_or_else(invalid)?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const G: usize = 1024 * 1024 * 1024;
        const M: usize = 1024 * 1024;
        const K: usize = 1024;
        match self.bytes {
            0 => write!(f, "0"),
            b if b % G == 0 => write!(f, "{}G", b / G),
            b if b % M == 0 => write!(f, "{}M", b / M),
            b if b % K == 0 => write!(f, "{}K", b / K),
            b => write!(f, "{b}"),
        }
    }
}

impl From<ByteSize> for String {
    fn from(s: ByteSize) -> Self {
        s.to_string()
    }
}

/// Either spelling accepted on the wire.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Bytes(usize),
    Text(String),
}

impl TryFrom<SizeRepr> for ByteSize {
    type Error = MemoryError;

    fn try_from(repr: SizeRepr) -> Result<Self, Self::Error> {
        match repr {
            SizeRepr::Bytes(b) => Ok(Self::from_bytes(b)),
            SizeRepr::Text(s) => Self::parse(&s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(ByteSize::parse("16K").unwrap().as_bytes(), 16 * 1024);
        assert_eq!(ByteSize::parse("16kb").unwrap().as_bytes(), 16 * 1024);
        assert_eq!(ByteSize::parse("1M").unwrap().as_bytes(), 1024 * 1024);
        assert_eq!(ByteSize::parse("1GB").unwrap().as_bytes(), 1024 * 1024 * 1024);
    }

    #[test]
    fn test_parse_raw_bytes() {
        assert_eq!(ByteSize::parse("512").unwrap().as_bytes(), 512);
        assert_eq!(ByteSize::parse("512B").unwrap().as_bytes(), 512);
        assert_eq!(ByteSize::parse("0").unwrap().as_bytes(), 0);
    }

    #[test]
    fn test_parse_with_whitespace() {
        assert_eq!(ByteSize::parse("  64 K ").unwrap().as_bytes(), 65_536);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ByteSize::parse("").is_err());
        assert!(ByteSize::parse("abc").is_err());
        assert!(ByteSize::parse("K").is_err());
        assert!(ByteSize::parse("99999999999999999999G").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ByteSize::from_bytes(3 * 1024 * 1024).to_string(), "3M");
        assert_eq!(ByteSize::from_kb(48).to_string(), "48K");
        assert_eq!(ByteSize::from_bytes(100).to_string(), "100");
    }

    #[test]
    fn test_serde_both_spellings() {
        #[derive(serde::Deserialize)]
        struct Cfg {
            a: ByteSize,
            b: ByteSize,
        }
        let cfg: Cfg = toml::from_str("a = \"64K\"\nb = 300\n").unwrap();
        assert_eq!(cfg.a.as_bytes(), 65_536);
        assert_eq!(cfg.b.as_bytes(), 300);

        let json = serde_json::to_string(&ByteSize::from_kb(8)).unwrap();
        assert_eq!(json, "\"8K\"");
    }
}
