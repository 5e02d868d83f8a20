//! Model loading: topology plus weights, materialized in memory
//!
//! The loader combines an architecture descriptor with a weight archive
//! into a live [`Model`]. Operation resolution happens first (against the
//! base vocabulary and the caller's registry), then every declared
//! parameter is bound against the archive: a missing or undeclared entry,
//! or a shape mismatch, is a fatal load error.
//!
//! Mode-sensitive layers (dropout, batch normalization) bake their behavior
//! from the execution context at construction time. The baked behavior is
//! part of the model; a context created afterward has no effect on it.

use crate::arch::{is_mode_sensitive, Architecture, OpRegistry, ParamSpec};
use crate::context::{ExecutionContext, Mode};
use crate::weights::{Tensor, WeightArchive};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Behavior a mode-sensitive layer was frozen with at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerBehavior {
    /// Inference behavior: no stochastic regularization, fixed statistics
    Deterministic,
    /// Training behavior retained (model was loaded in training mode)
    Stochastic,
}

/// A resolved layer: descriptor fields plus baked behavior and any
/// attributes contributed by a custom operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    pub name: String,
    pub op: String,
    pub inputs: Vec<String>,
    pub shape: Option<Vec<i64>>,
    pub params: Vec<ParamSpec>,
    /// Set only for mode-sensitive operations
    pub behavior: Option<LayerBehavior>,
    /// Fixed attribute constants from the custom-op registry
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// A fully materialized model: topology, bound parameter tensors, and the
/// mode it was constructed under. Created by [`load_model`], never
/// persisted itself.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    mode: Mode,
    inputs: Vec<String>,
    outputs: Vec<String>,
    layers: Vec<LayerNode>,
    parameters: Vec<(String, Tensor)>,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mode this model was loaded under, fixed for its lifetime.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Name of the first declared input endpoint.
    pub fn input_layer(&self) -> &str {
        &self.inputs[0]
    }

    pub fn output_layers(&self) -> &[String] {
        &self.outputs
    }

    /// Output endpoint names formatted for diagnostics, e.g.
    /// `['logits', 'boxes']`.
    pub fn describe_outputs(&self) -> String {
        let quoted: Vec<String> = self.outputs.iter().map(|n| format!("'{n}'")).collect();
        format!("[{}]", quoted.join(", "))
    }

    pub fn layers(&self) -> &[LayerNode] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&LayerNode> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Bound parameters in declaration order.
    pub fn parameters(&self) -> &[(String, Tensor)] {
        &self.parameters
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Tensor> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

/// Load a model from a descriptor file and a weight archive.
///
/// The context must already be configured; the model bakes its
/// mode-sensitive behavior from `ctx.mode` during construction. No disk
/// writes happen here.
pub fn load_model(
    arch_path: impl AsRef<Path>,
    weights_path: impl AsRef<Path>,
    registry: &OpRegistry,
    ctx: &ExecutionContext,
) -> Result<Model> {
    let arch = Architecture::from_file(arch_path)?;
    arch.resolve_ops(registry)?;

    let archive = WeightArchive::open(weights_path)?;
    build_model(arch, &archive, registry, ctx)
}

/// Assemble a model from parsed pieces. Split out from [`load_model`] so
/// tests can drive it without touching disk.
pub fn build_model(
    arch: Architecture,
    archive: &WeightArchive,
    registry: &OpRegistry,
    ctx: &ExecutionContext,
) -> Result<Model> {
    arch.resolve_ops(registry)?;

    let baked = if ctx.mode.is_inference() {
        LayerBehavior::Deterministic
    } else {
        LayerBehavior::Stochastic
    };

    let mut parameters = Vec::new();
    let mut declared: HashSet<&str> = HashSet::new();
    for spec in arch.param_specs() {
        declared.insert(spec.name.as_str());

        let tensor = archive
            .get(&spec.name)
            .ok_or_else(|| Error::MissingParameter(spec.name.clone()))?;
        if tensor.shape() != spec.shape.as_slice() {
            return Err(Error::ShapeMismatch {
                name: spec.name.clone(),
                expected: spec.shape.clone(),
                got: tensor.shape().to_vec(),
            });
        }
        parameters.push((spec.name.clone(), tensor.clone()));
    }

    for name in archive.names() {
        if !declared.contains(name) {
            return Err(Error::UnexpectedParameter(name.to_string()));
        }
    }

    let layers = arch
        .layers
        .iter()
        .map(|spec| {
            let behavior = is_mode_sensitive(&spec.op).then_some(baked);
            let attributes = registry
                .resolve(&spec.op)
                .map(|op| op.attributes.clone())
                .unwrap_or_default();
            LayerNode {
                name: spec.name.clone(),
                op: spec.op.clone(),
                inputs: spec.inputs.clone(),
                shape: spec.shape.clone(),
                params: spec.params.clone(),
                behavior,
                attributes,
            }
        })
        .collect();

    Ok(Model {
        name: arch.name,
        mode: ctx.mode,
        inputs: arch.inputs,
        outputs: arch.outputs,
        layers,
        parameters,
    })
}
