//! CLI configuration surface
//!
//! Argument parsing lives here; everything with design content lives in
//! the pipeline and the modules it drives.

mod cli;

pub use cli::Cli;
