//! The export pipeline: context setup, load, checkpoint, graph export
//!
//! A single sequential path with no branches except failure exits:
//!
//! ```text
//! Start -> ContextConfigured -> ModelLoaded -> CheckpointWritten
//!       -> GraphExported -> Done
//! ```
//!
//! Any stage failure moves the pipeline to the terminal `Failed` state and
//! aborts the remaining stages. The checkpoint is always written before
//! the graph, so a checkpoint failure leaves no graph file behind.

use crate::arch::OpRegistry;
use crate::checkpoint;
use crate::context::ExecutionContext;
use crate::export;
use crate::model::load_model;
use crate::Result;
use std::path::{Path, PathBuf};

/// Conventional architecture descriptor file name, resolved next to the
/// weight archive.
pub const ARCH_FILE: &str = "model.json";

/// Configuration for one export run, supplied by the CLI.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Device selector string (e.g. "0", "0,1", "cpu")
    pub gpu_list: String,
    /// Path to the weight archive
    pub model_path: PathBuf,
    /// Directory receiving the checkpoint bundle and graph definition
    pub output_dir: PathBuf,
    /// Snapshot index for this run's checkpoint
    pub step: u64,
}

impl ExportConfig {
    pub fn new(gpu_list: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            gpu_list: gpu_list.into(),
            model_path: model_path.into(),
            output_dir: PathBuf::from("models"),
            step: 0,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    /// The architecture descriptor path: `model.json` in the weight
    /// archive's directory.
    pub fn arch_path(&self) -> PathBuf {
        self.model_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(ARCH_FILE)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.output_dir.join(export::GRAPH_FILE)
    }
}

/// Pipeline progress, observable for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    ContextConfigured,
    ModelLoaded,
    CheckpointWritten,
    GraphExported,
    Done,
    Failed,
}

/// Outcome of a completed run, for diagnostic reporting.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub model_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub graph_path: PathBuf,
    pub input_layer: String,
    pub output_layers: Vec<String>,
}

impl ExportReport {
    /// Output endpoints formatted for diagnostics, e.g. `['logits', 'boxes']`.
    pub fn describe_outputs(&self) -> String {
        let quoted: Vec<String> = self.output_layers.iter().map(|n| format!("'{n}'")).collect();
        format!("[{}]", quoted.join(", "))
    }
}

/// The export pipeline state machine.
#[derive(Debug)]
pub struct ExportPipeline {
    state: PipelineState,
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportPipeline {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Start,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run all stages in order. On error the pipeline lands in `Failed`
    /// and the error propagates to the caller unrecovered.
    pub fn run(&mut self, config: &ExportConfig, registry: &OpRegistry) -> Result<ExportReport> {
        match self.run_stages(config, registry) {
            Ok(report) => {
                self.state = PipelineState::Done;
                Ok(report)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    fn run_stages(
        &mut self,
        config: &ExportConfig,
        registry: &OpRegistry,
    ) -> Result<ExportReport> {
        // Context first: mode-sensitive layers bake behavior at load time.
        let ctx = ExecutionContext::inference(&config.gpu_list)?;
        self.state = PipelineState::ContextConfigured;

        let model = load_model(config.arch_path(), &config.model_path, registry, &ctx)?;
        self.state = PipelineState::ModelLoaded;

        let checkpoint_path = checkpoint::write_snapshot(&model, &config.output_dir, config.step)?;
        self.state = PipelineState::CheckpointWritten;

        let graph_path = config.graph_path();
        export::write_graph(&model, &graph_path)?;
        self.state = PipelineState::GraphExported;

        Ok(ExportReport {
            model_path: config.model_path.clone(),
            checkpoint_path,
            graph_path,
            input_layer: model.input_layer().to_string(),
            output_layers: model.output_layers().to_vec(),
        })
    }
}

/// Run one export end to end. Convenience wrapper over [`ExportPipeline`].
pub fn run_export(config: &ExportConfig, registry: &OpRegistry) -> Result<ExportReport> {
    ExportPipeline::new().run(config, registry)
}
