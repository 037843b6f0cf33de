// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Activation buffer resolution.
//!
//! A model either brings its own externally mapped activations region
//! (e.g. external SDRAM) or runs from the statically reserved local buffer.
//! The all-ones address is the "no external region" marker.

use crate::MemoryError;

/// External address meaning "use the local buffer".
pub const EXT_ADDR_SENTINEL: u32 = 0xFFFF_FFFF;

/// Where a model's activations live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    /// The local statically reserved buffer; `required` of its `capacity`
    /// bytes are used.
    Local { required: usize, capacity: usize },
    /// An externally mapped region at `addr`.
    External { addr: u32, required: usize },
}

impl ActivationSource {
    pub fn required(&self) -> usize {
        match *self {
            ActivationSource::Local { required, .. } => required,
            ActivationSource::External { required, .. } => required,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ActivationSource::Local { .. })
    }
}

/// Pick the activations region for a model needing `required` bytes.
///
/// An absent address or [`EXT_ADDR_SENTINEL`] selects the local buffer,
/// which must be large enough.
pub fn resolve_activations(
    ext_addr: Option<u32>,
    required: usize,
    local_capacity: usize,
) -> Result<ActivationSource, MemoryError> {
    match ext_addr {
        Some(addr) if addr != EXT_ADDR_SENTINEL => {
            tracing::debug!(addr = format_args!("{addr:#010x}"), required, "external activations");
            Ok(ActivationSource::External { addr, required })
        }
        _ if required > local_capacity => Err(MemoryError::BufferSize {
            required,
            available: local_capacity,
        }),
        _ => Ok(ActivationSource::Local {
            required,
            capacity: local_capacity,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_selects_local() {
        let src = resolve_activations(Some(EXT_ADDR_SENTINEL), 1024, 4096).unwrap();
        assert_eq!(
            src,
            ActivationSource::Local {
                required: 1024,
                capacity: 4096
            }
        );
        assert!(resolve_activations(None, 1024, 4096).unwrap().is_local());
    }

    #[test]
    fn test_local_too_small() {
        assert_eq!(
            resolve_activations(None, 8192, 4096),
            Err(MemoryError::BufferSize {
                required: 8192,
                available: 4096
            })
        );
    }

    #[test]
    fn test_external_skips_local_check() {
        let src = resolve_activations(Some(0xC000_0000), 1 << 20, 16).unwrap();
        assert_eq!(src.required(), 1 << 20);
        assert!(!src.is_local());
    }
}
