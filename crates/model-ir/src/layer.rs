// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator node descriptors.
//!
//! Each [`NodeDescriptor`] identifies one operator instance in the compiled
//! graph. It is created once at model-load time and is read-only afterwards:
//! the observer keys its statistics by [`NodeDescriptor::index`] and never
//! mutates the descriptor.

use crate::ModelFormat;

/// Bit of the vendor layer type marking a time-distributed wrapper.
pub const TIME_DISTRIBUTED_BIT: u32 = 0x8000;

/// Vendor layer type codes (without the time-distributed bit).
const VENDOR_LAYERS: &[(u32, &str)] = &[
    (1, "Dense"),
    (2, "Conv2D"),
    (3, "Conv2D_Pool"),
    (4, "Pool"),
    (5, "NL"),
    (6, "SM"),
    (7, "Eltwise"),
    (8, "Concat"),
    (9, "Reshape"),
    (10, "BN"),
    (11, "Pad"),
    (12, "LSTM"),
    (13, "GRU"),
    (14, "Upsample"),
    (15, "Transpose"),
];

/// Builtin operator codes of the portable model format.
const PORTABLE_OPS: &[(u32, &str)] = &[
    (0, "ADD"),
    (1, "AVERAGE_POOL_2D"),
    (2, "CONCATENATION"),
    (3, "CONV_2D"),
    (4, "DEPTHWISE_CONV_2D"),
    (6, "DEQUANTIZE"),
    (9, "FULLY_CONNECTED"),
    (14, "LOGISTIC"),
    (17, "MAX_POOL_2D"),
    (18, "MUL"),
    (19, "RELU"),
    (21, "RELU6"),
    (22, "RESHAPE"),
    (25, "SOFTMAX"),
    (28, "TANH"),
    (34, "PAD"),
    (40, "MEAN"),
    (114, "QUANTIZE"),
];

fn lookup(table: &[(u32, &'static str)], code: u32) -> &'static str {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("unknown", |(_, name)| name)
}

/// Name of a vendor layer type. The time-distributed bit is ignored.
pub fn vendor_layer_name(code: u32) -> &'static str {
    lookup(VENDOR_LAYERS, code & !TIME_DISTRIBUTED_BIT)
}

/// Name of a portable builtin operator.
pub fn portable_op_name(code: u32) -> &'static str {
    lookup(PORTABLE_OPS, code)
}

/// One operator instance of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodeDescriptor {
    /// Contiguous index in `0..n_nodes`, stable for the model's lifetime.
    pub index: usize,
    pub name: String,
    pub format: ModelFormat,
    /// Vendor layer type (time-distributed bit included) or portable
    /// builtin operator code.
    pub code: u32,
    /// Builtin-operator version tag.
    pub version: u32,
    /// Vendor node id.
    pub id: i32,
    /// Engine tensor indices written by this node.
    pub outputs: Vec<usize>,
}

impl NodeDescriptor {
    pub fn is_time_distributed(&self) -> bool {
        self.format == ModelFormat::Vendor && self.code & TIME_DISTRIBUTED_BIT != 0
    }

    /// Operator kind, e.g. `"Conv2D"` or `"FULLY_CONNECTED"`.
    pub fn kind(&self) -> &'static str {
        match self.format {
            ModelFormat::Vendor => vendor_layer_name(self.code),
            ModelFormat::Portable => portable_op_name(self.code),
        }
    }

    /// Operator kind as printed in reports: `TD-` prefixed for
    /// time-distributed vendor layers.
    pub fn display_kind(&self) -> String {
        if self.is_time_distributed() {
            format!("TD-{}", self.kind())
        } else {
            self.kind().to_string()
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "#{:<3} {:<24} {} v{} id={} outputs={:?}",
            self.index,
            self.name,
            self.display_kind(),
            self.version,
            self.id,
            self.outputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(format: ModelFormat, code: u32) -> NodeDescriptor {
        NodeDescriptor {
            index: 0,
            name: "n0".into(),
            format,
            code,
            version: 1,
            id: 4,
            outputs: vec![1],
        }
    }

    #[test]
    fn test_vendor_names() {
        assert_eq!(vendor_layer_name(2), "Conv2D");
        assert_eq!(vendor_layer_name(2 | TIME_DISTRIBUTED_BIT), "Conv2D");
        assert_eq!(vendor_layer_name(999), "unknown");
    }

    #[test]
    fn test_portable_names() {
        assert_eq!(portable_op_name(9), "FULLY_CONNECTED");
        assert_eq!(portable_op_name(5), "unknown");
    }

    #[test]
    fn test_time_distributed_prefix() {
        let n = node(ModelFormat::Vendor, 1 | TIME_DISTRIBUTED_BIT);
        assert!(n.is_time_distributed());
        assert_eq!(n.display_kind(), "TD-Dense");

        let plain = node(ModelFormat::Vendor, 1);
        assert_eq!(plain.display_kind(), "Dense");
    }

    #[test]
    fn test_portable_ignores_td_bit() {
        // Portable builtin codes never carry the vendor flag.
        let n = node(ModelFormat::Portable, TIME_DISTRIBUTED_BIT);
        assert!(!n.is_time_distributed());
        assert_eq!(n.kind(), "unknown");
    }

    #[test]
    fn test_summary() {
        let s = node(ModelFormat::Portable, 3).summary();
        assert!(s.contains("CONV_2D"));
        assert!(s.contains("v1"));
    }
}
