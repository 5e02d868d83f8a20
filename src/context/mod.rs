//! Execution context: device selection and inference/training mode
//!
//! The context is built exactly once, before any model is loaded, and is
//! read-only afterward. The mode flag is threaded explicitly into the model
//! loader rather than living in process-global state: a model captures the
//! mode it was constructed under, and later contexts do not affect it.

use crate::{Error, Result};

/// Compute device(s) visible to the export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Device {
    /// Run on the host CPU
    Cpu,
    /// Run on the listed GPU ordinals (e.g. "0" or "0,1")
    Gpu(Vec<u32>),
}

impl Device {
    /// Parse a device selector string.
    ///
    /// Accepts `"cpu"` (case-insensitive) or a comma-separated list of GPU
    /// ordinals. An empty or otherwise invalid selector is a fatal
    /// configuration error.
    pub fn parse(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(Error::ConfigError("empty device selector".to_string()));
        }

        if selector.eq_ignore_ascii_case("cpu") {
            return Ok(Device::Cpu);
        }

        let ordinals: Vec<u32> = selector
            .split(',')
            .map(|part| {
                part.trim().parse::<u32>().map_err(|_| {
                    Error::ConfigError(format!("invalid device selector: '{selector}'"))
                })
            })
            .collect::<Result<Vec<u32>>>()?;

        Ok(Device::Gpu(ordinals))
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu(ids) => {
                let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
                write!(f, "gpu:{}", ids.join(","))
            }
        }
    }
}

/// Global behavioral mode for mode-sensitive layers.
///
/// In `Inference` mode, stochastic regularization (dropout) and running
/// statistics updates (batch normalization) are disabled; layers become
/// deterministic. The mode is baked into each layer at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Inference,
    Training,
}

impl Mode {
    pub fn is_inference(self) -> bool {
        matches!(self, Mode::Inference)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Inference => write!(f, "inference"),
            Mode::Training => write!(f, "training"),
        }
    }
}

/// Process-wide execution settings, fixed before the loader runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub device: Device,
    pub mode: Mode,
}

impl ExecutionContext {
    /// Build a context from a device selector and explicit mode.
    pub fn new(selector: &str, mode: Mode) -> Result<Self> {
        Ok(Self {
            device: Device::parse(selector)?,
            mode,
        })
    }

    /// Build an inference-mode context, the configuration every export
    /// run uses.
    pub fn inference(selector: &str) -> Result<Self> {
        Self::new(selector, Mode::Inference)
    }
}
