//! Checkpoint writing and restoration
//!
//! A snapshot captures every bound parameter tensor of a model under a
//! monotonically tagged name (`checkpoint-<step>`), alongside a JSON
//! parameter index, and updates the `checkpoint_state` pointer file. State
//! is append-only across runs: each run adds a record rather than erasing
//! history.
//!
//! All files are written to a temporary sibling and renamed into place, so
//! a crash mid-write never leaves a truncated file installed as `latest`.

use crate::model::Model;
use crate::weights::{self, Tensor, WeightArchive};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the latest-snapshot pointer file inside the checkpoint directory.
pub const STATE_FILE: &str = "checkpoint_state";

/// One entry of a snapshot's parameter index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
}

/// Parameter index written next to each snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotIndex {
    pub model: String,
    pub step: u64,
    pub parameters: Vec<ParameterEntry>,
}

/// A record of one written snapshot, kept forever in `checkpoint_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub tag: String,
    pub step: u64,
    pub file: String,
    pub index_file: String,
    pub created_at: DateTime<Utc>,
}

/// The `checkpoint_state` pointer file: latest tag plus full history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointState {
    pub latest: Option<String>,
    pub snapshots: Vec<SnapshotRecord>,
}

impl CheckpointState {
    /// Load existing state from a checkpoint directory, or start fresh.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(STATE_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::Serialization(format!("checkpoint_state parse failed: {e}")))
    }

    /// Record of the latest snapshot, if any.
    pub fn latest_record(&self) -> Option<&SnapshotRecord> {
        let tag = self.latest.as_deref()?;
        self.snapshots.iter().rev().find(|r| r.tag == tag)
    }

    fn record(&mut self, record: SnapshotRecord) {
        // Re-using a step replaces its record; history of other steps stays.
        self.snapshots.retain(|r| r.tag != record.tag);
        self.latest = Some(record.tag.clone());
        self.snapshots.push(record);
    }
}

/// Write a snapshot of the model's current tensor values.
///
/// Creates the target directory if needed, writes
/// `checkpoint-<step>.safetensors` and `checkpoint-<step>.index.json`, then
/// installs the updated `checkpoint_state`. Returns the resolved snapshot
/// path for diagnostics. Any I/O failure is fatal; no retry.
pub fn write_snapshot(model: &Model, dir: impl AsRef<Path>, step: u64) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let tag = format!("checkpoint-{step}");
    let data_file = format!("{tag}.safetensors");
    let index_file = format!("{tag}.index.json");
    let data_path = dir.join(&data_file);
    let index_path = dir.join(&index_file);

    let mut metadata = HashMap::new();
    metadata.insert("model".to_string(), model.name().to_string());
    metadata.insert("step".to_string(), step.to_string());
    metadata.insert("mode".to_string(), model.mode().to_string());

    let bytes = weights::to_safetensors_bytes(model.parameters(), metadata)?;
    write_atomic(&data_path, &bytes)?;

    let index = SnapshotIndex {
        model: model.name().to_string(),
        step,
        parameters: model
            .parameters()
            .iter()
            .map(|(name, tensor)| ParameterEntry {
                name: name.clone(),
                shape: tensor.shape().to_vec(),
                dtype: "f32".to_string(),
            })
            .collect(),
    };
    let index_text = serde_json::to_string_pretty(&index)
        .map_err(|e| Error::Serialization(format!("index serialization failed: {e}")))?;
    write_atomic(&index_path, index_text.as_bytes())?;

    let mut state = CheckpointState::load_or_default(dir)?;
    state.record(SnapshotRecord {
        tag,
        step,
        file: data_file,
        index_file,
        created_at: Utc::now(),
    });
    let state_text = serde_json::to_string_pretty(&state)
        .map_err(|e| Error::Serialization(format!("state serialization failed: {e}")))?;
    write_atomic(&dir.join(STATE_FILE), state_text.as_bytes())?;

    Ok(data_path)
}

/// Read a snapshot's tensors back, sorted by parameter name.
pub fn restore_snapshot(path: impl AsRef<Path>) -> Result<Vec<(String, Tensor)>> {
    let archive = WeightArchive::open(path)?;
    Ok(archive.entries().to_vec())
}

/// Read a snapshot's parameter index.
pub fn read_index(path: impl AsRef<Path>) -> Result<SnapshotIndex> {
    let text = std::fs::read_to_string(path.as_ref())?;
    serde_json::from_str(&text)
        .map_err(|e| Error::Serialization(format!("index parse failed: {e}")))
}

/// Write bytes to a temporary sibling, then rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Architecture, OpRegistry};
    use crate::context::ExecutionContext;
    use crate::model::build_model;
    use crate::weights::write_safetensors;
    use tempfile::TempDir;

    fn model(dir: &TempDir) -> Model {
        let arch = Architecture::from_json(
            &serde_json::json!({
                "name": "tiny",
                "inputs": ["x"],
                "outputs": ["y"],
                "layers": [
                    {"name": "x", "op": "Input"},
                    {"name": "y", "op": "Dense", "inputs": ["x"],
                     "params": [
                         {"name": "y.weight", "shape": [2, 2]},
                         {"name": "y.bias", "shape": [2]}
                     ]}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let path = dir.path().join("model.safetensors");
        let entries = vec![
            (
                "y.weight".to_string(),
                Tensor::from_vec(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            ),
            (
                "y.bias".to_string(),
                Tensor::from_vec(vec![2], vec![0.5, -0.5]).unwrap(),
            ),
        ];
        write_safetensors(&path, &entries, HashMap::new()).unwrap();
        let archive = WeightArchive::open(&path).unwrap();

        let ctx = ExecutionContext::inference("cpu").unwrap();
        build_model(arch, &archive, &OpRegistry::new(), &ctx).unwrap()
    }

    #[test]
    fn test_write_snapshot_layout() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        let path = write_snapshot(&model, &out, 0).unwrap();
        assert_eq!(path, out.join("checkpoint-0.safetensors"));
        assert!(path.exists());
        assert!(out.join("checkpoint-0.index.json").exists());
        assert!(out.join(STATE_FILE).exists());
        assert!(!out.join("checkpoint-0.tmp").exists());
    }

    #[test]
    fn test_state_points_at_latest() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        write_snapshot(&model, &out, 0).unwrap();
        let state = CheckpointState::load_or_default(&out).unwrap();
        assert_eq!(state.latest.as_deref(), Some("checkpoint-0"));
        let record = state.latest_record().unwrap();
        assert_eq!(record.step, 0);
        assert_eq!(record.file, "checkpoint-0.safetensors");
    }

    #[test]
    fn test_state_append_only_across_runs() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        write_snapshot(&model, &out, 0).unwrap();
        write_snapshot(&model, &out, 1).unwrap();

        let state = CheckpointState::load_or_default(&out).unwrap();
        assert_eq!(state.snapshots.len(), 2);
        assert_eq!(state.latest.as_deref(), Some("checkpoint-1"));
        assert!(out.join("checkpoint-0.safetensors").exists());
        assert!(out.join("checkpoint-1.safetensors").exists());
    }

    #[test]
    fn test_rewriting_same_step_keeps_single_record() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        write_snapshot(&model, &out, 0).unwrap();
        write_snapshot(&model, &out, 0).unwrap();

        let state = CheckpointState::load_or_default(&out).unwrap();
        assert_eq!(state.snapshots.len(), 1);
        assert_eq!(state.latest.as_deref(), Some("checkpoint-0"));
    }

    #[test]
    fn test_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        let path = write_snapshot(&model, &out, 0).unwrap();
        let restored = restore_snapshot(&path).unwrap();

        assert_eq!(restored.len(), model.parameters().len());
        for (name, tensor) in &restored {
            let original = model.get_parameter(name).unwrap();
            assert!(tensor.allclose(original, 1e-6));
        }
    }

    #[test]
    fn test_index_lists_all_parameters() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");

        write_snapshot(&model, &out, 0).unwrap();
        let index = read_index(out.join("checkpoint-0.index.json")).unwrap();

        assert_eq!(index.model, "tiny");
        assert_eq!(index.step, 0);
        let names: Vec<&str> = index.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["y.weight", "y.bias"]);
        assert_eq!(index.parameters[0].shape, vec![2, 2]);
    }

    #[test]
    fn test_corrupt_state_is_fatal() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        let out = dir.path().join("models");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join(STATE_FILE), b"{ corrupt").unwrap();

        let err = write_snapshot(&model, &out, 0).unwrap_err();
        assert!(err.to_string().contains("checkpoint_state parse failed"));
    }

    #[test]
    fn test_unwritable_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let model = model(&dir);
        // A file standing where the directory should be.
        let out = dir.path().join("blocked");
        std::fs::write(&out, b"").unwrap();

        let err = write_snapshot(&model, &out, 0).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
