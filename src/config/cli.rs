//! CLI argument parsing
//!
//! Thin glue around the pipeline: the CLI only supplies configuration
//! values (device selector, paths, snapshot step) and controls output
//! verbosity.
//!
//! # Usage
//!
//! ```bash
//! congelar --model-path ./model.safetensors
//! congelar --gpu-list 0,1 --model-path trained/model.safetensors --step 3
//! congelar --model-path ./model.safetensors --output-dir exported --quiet
//! ```

use crate::pipeline::ExportConfig;
use clap::Parser;
use std::path::PathBuf;

/// Congelar: freeze a trained model into a checkpoint and graph definition
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "congelar")]
#[command(version)]
#[command(about = "Export a trained model into a restorable checkpoint and a text graph definition")]
pub struct Cli {
    /// Device selector: comma-separated GPU ordinals, or "cpu"
    #[arg(long, default_value = "0", value_name = "LIST")]
    pub gpu_list: String,

    /// Path to the weight archive; model.json is expected alongside it
    #[arg(long, default_value = "./model.safetensors", value_name = "PATH")]
    pub model_path: PathBuf,

    /// Directory receiving the checkpoint bundle and graph definition
    #[arg(long, default_value = "models", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Snapshot index for this run's checkpoint
    #[arg(long, default_value_t = 0)]
    pub step: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Translate parsed arguments into a pipeline configuration.
    pub fn to_config(&self) -> ExportConfig {
        ExportConfig::new(self.gpu_list.clone(), self.model_path.clone())
            .with_output_dir(self.output_dir.clone())
            .with_step(self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["congelar"]);
        assert_eq!(cli.gpu_list, "0");
        assert_eq!(cli.model_path, PathBuf::from("./model.safetensors"));
        assert_eq!(cli.output_dir, PathBuf::from("models"));
        assert_eq!(cli.step, 0);
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_explicit_arguments() {
        let cli = Cli::parse_from([
            "congelar",
            "--gpu-list",
            "0,1",
            "--model-path",
            "trained/model.safetensors",
            "--output-dir",
            "exported",
            "--step",
            "3",
            "--verbose",
        ]);
        assert_eq!(cli.gpu_list, "0,1");
        assert_eq!(cli.model_path, PathBuf::from("trained/model.safetensors"));
        assert_eq!(cli.output_dir, PathBuf::from("exported"));
        assert_eq!(cli.step, 3);
        assert!(cli.verbose);
    }

    #[test]
    fn test_to_config() {
        let cli = Cli::parse_from([
            "congelar",
            "--model-path",
            "run/model.safetensors",
            "--step",
            "2",
        ]);
        let config = cli.to_config();
        assert_eq!(config.model_path, PathBuf::from("run/model.safetensors"));
        assert_eq!(config.arch_path(), PathBuf::from("run/model.json"));
        assert_eq!(config.step, 2);
    }
}
