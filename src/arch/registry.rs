//! Operation vocabulary and custom-operation registry
//!
//! The base vocabulary covers the operations a descriptor may reference
//! without registration. Anything else must be supplied through an
//! [`OpRegistry`] whose entries match exactly what the training process
//! used; an unresolved name is a fatal load error.

use std::collections::BTreeMap;

/// Operations every descriptor may use without registration.
pub const BUILTIN_OPS: &[&str] = &[
    "Input",
    "Conv2D",
    "Dense",
    "BatchNorm",
    "Dropout",
    "ReLU",
    "Sigmoid",
    "Softmax",
    "MaxPool",
    "UpSample",
    "Add",
    "Concat",
];

/// Operations whose behavior depends on the inference/training mode.
const MODE_SENSITIVE_OPS: &[&str] = &["BatchNorm", "Dropout"];

pub fn is_builtin(op: &str) -> bool {
    BUILTIN_OPS.contains(&op)
}

/// Whether an operation bakes different behavior for inference vs. training.
pub fn is_mode_sensitive(op: &str) -> bool {
    MODE_SENSITIVE_OPS.contains(&op)
}

/// Descriptor for an operation outside the base vocabulary.
///
/// Attributes are fixed constants the operation was trained with (e.g. a
/// resize scaling factor) and are carried verbatim into the exported graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomOp {
    pub name: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl CustomOp {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Attach a fixed attribute constant.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Registry of custom operations, keyed by operation name.
///
/// Resolution happens eagerly at load time so that a descriptor referencing
/// an unregistered operation fails before any weights are touched.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    ops: BTreeMap<String, CustomOp>,
}

impl OpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry carrying the standard extensions the training stack uses:
    /// bilinear resizing with its fixed scale factor.
    pub fn with_standard_extensions() -> Self {
        let mut registry = Self::new();
        registry.register(
            CustomOp::new("ResizeBilinear").with_attribute("factor", serde_json::json!(2.0)),
        );
        registry
    }

    pub fn register(&mut self, op: CustomOp) {
        self.ops.insert(op.name.clone(), op);
    }

    pub fn resolve(&self, name: &str) -> Option<&CustomOp> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.ops.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
