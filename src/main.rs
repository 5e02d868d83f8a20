//! Congelar CLI
//!
//! Single-command export entry point: load a trained model, snapshot its
//! weights into a checkpoint bundle, and write the graph definition.
//!
//! # Usage
//!
//! ```bash
//! congelar --model-path ./model.safetensors
//! congelar --gpu-list 0,1 --model-path trained/model.safetensors --step 3
//! ```

use clap::Parser;
use congelar::arch::OpRegistry;
use congelar::config::Cli;
use congelar::pipeline::run_export;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let config = cli.to_config();
    let registry = OpRegistry::with_standard_extensions();

    log(
        log_level,
        LogLevel::Normal,
        &format!("Loading {}", config.model_path.display()),
    );

    match run_export(&config, &registry) {
        Ok(report) => {
            log(
                log_level,
                LogLevel::Normal,
                &format!("Checkpoint saved to: {}", report.checkpoint_path.display()),
            );
            log(
                log_level,
                LogLevel::Normal,
                &format!("Input layer: {}", report.input_layer),
            );
            log(
                log_level,
                LogLevel::Normal,
                &format!("Output layers: {}", report.describe_outputs()),
            );
            log(
                log_level,
                LogLevel::Normal,
                &format!("Graph written to: {}", report.graph_path.display()),
            );
            log(
                log_level,
                LogLevel::Verbose,
                &format!("Export complete for {}", report.model_path.display()),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}
