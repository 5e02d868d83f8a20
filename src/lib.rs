//! # Congelar: model freeze & export pipeline
//!
//! Congelar converts a trained model artifact — an architecture descriptor
//! (`model.json`) plus a weight archive (safetensors) — into two
//! deployment-ready forms: a restorable checkpoint bundle and a text-encoded
//! computation-graph definition for inference-only use.
//!
//! ## Architecture
//!
//! - **context**: device selection and the inference/training mode flag
//! - **arch**: architecture descriptor parsing, op vocabulary, custom-op registry
//! - **weights**: weight archive reading and tensor storage
//! - **model**: the loader combining topology and weights
//! - **checkpoint**: versioned snapshot writing and restoration
//! - **export**: graph definition serialization
//! - **pipeline**: the Loader → Checkpoint → Export state machine
//! - **config**: CLI glue
//!
//! ## Example
//!
//! ```no_run
//! use congelar::arch::OpRegistry;
//! use congelar::pipeline::{run_export, ExportConfig};
//!
//! let config = ExportConfig::new("0", "./model.safetensors");
//! let registry = OpRegistry::with_standard_extensions();
//! let report = run_export(&config, &registry).unwrap();
//! println!("Checkpoint saved to: {}", report.checkpoint_path.display());
//! ```

pub mod arch;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod weights;

pub mod error;

// Re-export commonly used types
pub use arch::Architecture;
pub use context::{Device, ExecutionContext, Mode};
pub use error::{Error, Result};
pub use model::Model;
pub use weights::Tensor;
