//! Graph definition export
//!
//! Serializes a model's operation/tensor topology — never its values —
//! into a stable, human-readable text form. Each layer becomes a `node`
//! block in declaration order, preceded by one `Variable` node per
//! parameter it owns, so every name in a checkpoint's parameter index also
//! appears as a graph node. The output fully overwrites any existing file
//! at the target path.

use crate::model::{LayerBehavior, Model};
use crate::Result;
use std::fmt::Write as _;
use std::path::Path;

/// Conventional graph definition file name.
pub const GRAPH_FILE: &str = "model.pb";

/// Format version emitted in the header.
const GRAPH_VERSION: u32 = 1;

/// Render the graph definition text for a model.
///
/// Deterministic: identical models yield byte-identical output.
pub fn render_graph(model: &Model) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# congelar graph definition");
    let _ = writeln!(out, "version: {GRAPH_VERSION}");
    let _ = writeln!(out, "model: \"{}\"", model.name());
    let _ = writeln!(out, "mode: \"{}\"", model.mode());

    for layer in model.layers() {
        for param in &layer.params {
            let _ = writeln!(out);
            let _ = writeln!(out, "node {{");
            let _ = writeln!(out, "  name: \"{}\"", param.name);
            let _ = writeln!(out, "  op: \"Variable\"");
            let _ = writeln!(out, "  shape: {}", format_dims(&param.shape));
            let _ = writeln!(out, "}}");
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "node {{");
        let _ = writeln!(out, "  name: \"{}\"", layer.name);
        let _ = writeln!(out, "  op: \"{}\"", layer.op);
        for input in &layer.inputs {
            let _ = writeln!(out, "  input: \"{input}\"");
        }
        for param in &layer.params {
            let _ = writeln!(out, "  input: \"{}\"", param.name);
        }
        if let Some(shape) = &layer.shape {
            let dims: Vec<String> = shape.iter().map(i64::to_string).collect();
            let _ = writeln!(out, "  shape: [{}]", dims.join(", "));
        }
        if let Some(behavior) = layer.behavior {
            let deterministic = behavior == LayerBehavior::Deterministic;
            let _ = writeln!(
                out,
                "  attr {{ key: \"deterministic\" value: {deterministic} }}"
            );
        }
        for (key, value) in &layer.attributes {
            let _ = writeln!(out, "  attr {{ key: \"{key}\" value: {value} }}");
        }
        let _ = writeln!(out, "}}");
    }

    let _ = writeln!(out);
    for output in model.output_layers() {
        let _ = writeln!(out, "output: \"{output}\"");
    }

    out
}

fn format_dims(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(usize::to_string).collect();
    format!("[{}]", dims.join(", "))
}

/// Write the graph definition to `path`, overwriting any previous file.
pub fn write_graph(model: &Model, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path.as_ref(), render_graph(model))?;
    Ok(())
}

/// Node names present in a rendered graph definition, in order of
/// appearance. Used to check graph/checkpoint consistency.
pub fn node_names(graph_text: &str) -> Vec<String> {
    graph_text
        .lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix("name: \"")
                .and_then(|rest| rest.strip_suffix('"'))
                .map(str::to_string)
        })
        .collect()
}
