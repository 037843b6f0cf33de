// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Combined monitor readings for one benchmark run.

use crate::{HeapUsage, StackUsage};

/// What the heap and stack monitors saw during a run. A monitor that was
/// not attached leaves its field empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MonitorReport {
    pub heap: Option<HeapUsage>,
    pub stack: Option<StackUsage>,
}

impl MonitorReport {
    /// Report lines, empty when neither monitor was attached.
    ///
    /// # Example output
    /// ```text
    ///  used stack   : 1024 bytes (of 8192)
    ///  used heap    : 3:3 (req:allocated,req:released) max=96 used=0
    /// ```
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(stack) = &self.stack {
            out.push_str(&format!(" used stack   : {}\n", stack.summary()));
        }
        if let Some(heap) = &self.heap {
            out.push_str(&format!(" used heap    : {}\n", heap.summary()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        assert!(MonitorReport::default().summary().is_empty());
    }

    #[test]
    fn test_summary_lines() {
        let r = MonitorReport {
            heap: Some(HeapUsage {
                used: 0,
                max_used: 96,
                allocs: 3,
                frees: 3,
            }),
            stack: Some(StackUsage {
                size: 8192,
                used: 1024,
            }),
        };
        let s = r.summary();
        assert!(s.contains("used stack   : 1024 bytes (of 8192)"));
        assert!(s.contains("max=96"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let r = MonitorReport {
            heap: None,
            stack: Some(StackUsage { size: 10, used: 2 }),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(serde_json::from_str::<MonitorReport>(&json).unwrap(), r);
    }
}
