//! Architecture descriptor parsing and validation
//!
//! The descriptor is a JSON document describing layer topology independent
//! of learned values: named layers with operations, upstream connections,
//! and the parameters each layer owns. By convention it lives in a
//! `model.json` file next to the weight archive.
//!
//! # Example
//!
//! ```json
//! {
//!   "name": "detector",
//!   "inputs": ["image_input"],
//!   "outputs": ["logits", "boxes"],
//!   "layers": [
//!     {"name": "image_input", "op": "Input", "shape": [-1, 512, 512, 3]},
//!     {"name": "conv1", "op": "Conv2D", "inputs": ["image_input"],
//!      "params": [{"name": "conv1.weight", "shape": [3, 3, 3, 16]}]}
//!   ]
//! }
//! ```

mod registry;

pub use registry::{is_builtin, is_mode_sensitive, CustomOp, OpRegistry, BUILTIN_OPS};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A trained parameter a layer owns: name and expected tensor shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

/// One layer of the topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer name, also the name of its node in the exported graph
    pub name: String,

    /// Operation type (builtin vocabulary or a registered custom op)
    pub op: String,

    /// Names of upstream layers feeding this one
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Output tensor shape, `-1` marking a dynamic dimension
    #[serde(default)]
    pub shape: Option<Vec<i64>>,

    /// Parameters this layer owns, in declaration order
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

/// The full architecture descriptor: endpoints plus ordered layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub layers: Vec<LayerSpec>,
}

impl Architecture {
    /// Parse and structurally validate a descriptor from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let arch: Architecture = serde_json::from_str(text)
            .map_err(|e| Error::MalformedDescriptor(format!("JSON parse failed: {e}")))?;
        arch.validate()?;
        Ok(arch)
    }

    /// Read and parse a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Structural validation: endpoints declared, layer names unique,
    /// every connection resolves to a declared layer.
    fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::MalformedDescriptor(
                "descriptor declares no input endpoints".to_string(),
            ));
        }
        if self.outputs.is_empty() {
            return Err(Error::MalformedDescriptor(
                "descriptor declares no output endpoints".to_string(),
            ));
        }

        let mut names: HashSet<&str> = HashSet::new();
        for layer in &self.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(Error::MalformedDescriptor(format!(
                    "duplicate layer name '{}'",
                    layer.name
                )));
            }
        }

        for layer in &self.layers {
            for input in &layer.inputs {
                if !names.contains(input.as_str()) {
                    return Err(Error::MalformedDescriptor(format!(
                        "layer '{}' references undeclared input '{}'",
                        layer.name, input
                    )));
                }
            }
        }

        for endpoint in self.inputs.iter().chain(self.outputs.iter()) {
            if !names.contains(endpoint.as_str()) {
                return Err(Error::MalformedDescriptor(format!(
                    "endpoint '{endpoint}' does not name a declared layer"
                )));
            }
        }

        let mut param_names: HashSet<&str> = HashSet::new();
        for spec in self.param_specs() {
            if !param_names.insert(spec.name.as_str()) {
                return Err(Error::MalformedDescriptor(format!(
                    "duplicate parameter name '{}'",
                    spec.name
                )));
            }
        }

        Ok(())
    }

    /// Resolve every layer operation against the base vocabulary and the
    /// supplied registry. Called eagerly by the loader; an unresolved name
    /// fails before any weights are read.
    pub fn resolve_ops(&self, registry: &OpRegistry) -> Result<()> {
        for layer in &self.layers {
            if !is_builtin(&layer.op) && !registry.contains(&layer.op) {
                return Err(Error::UnknownOp {
                    layer: layer.name.clone(),
                    op: layer.op.clone(),
                });
            }
        }
        Ok(())
    }

    /// All declared parameters in layer declaration order.
    pub fn param_specs(&self) -> impl Iterator<Item = &ParamSpec> {
        self.layers.iter().flat_map(|layer| layer.params.iter())
    }
}
