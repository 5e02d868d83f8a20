//! Weight archive reading and tensor storage
//!
//! Trained parameter values live in a safetensors container mapping
//! parameter name to an f32 tensor. The archive is a read-only input,
//! consumed once per export run. The same container format backs the
//! checkpoint snapshots written by `crate::checkpoint`.

use crate::{Error, Result};
use ndarray::{ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::path::Path;

/// A dense f32 tensor with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor, checking that the value count matches the shape.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::Serialization(format!(
                "shape {shape:?} expects {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw values in row-major order.
    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// View the tensor as an ndarray array.
    pub fn to_array(&self) -> Result<ArrayD<f32>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone()).map_err(|e| {
            Error::Serialization(format!("tensor shape {:?} invalid: {e}", self.shape))
        })
    }

    /// Element-wise comparison within a floating-point tolerance.
    pub fn allclose(&self, other: &Tensor, tolerance: f32) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

/// An opened weight archive: parameter name → tensor, read once from disk.
#[derive(Debug, Clone)]
pub struct WeightArchive {
    tensors: Vec<(String, Tensor)>,
}

impl WeightArchive {
    /// Read a safetensors archive from disk.
    ///
    /// Only f32 tensors are accepted; any other dtype is a serialization
    /// error. Entries are kept sorted by name so iteration is stable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;

        let safetensors = safetensors::SafeTensors::deserialize(&data)
            .map_err(|e| Error::Serialization(format!("safetensors parsing failed: {e}")))?;

        let mut names: Vec<String> = safetensors
            .names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        names.sort();

        let mut tensors = Vec::with_capacity(names.len());
        for name in names {
            let view = safetensors
                .tensor(&name)
                .map_err(|e| Error::Serialization(format!("tensor '{name}' unreadable: {e}")))?;
            if view.dtype() != Dtype::F32 {
                return Err(Error::Serialization(format!(
                    "tensor '{name}' has unsupported dtype {:?}",
                    view.dtype()
                )));
            }
            let values: &[f32] = bytemuck::cast_slice(view.data());
            let tensor = Tensor::from_vec(view.shape().to_vec(), values.to_vec())?;
            tensors.push((name, tensor));
        }

        Ok(Self { tensors })
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Parameter names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.tensors.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn entries(&self) -> &[(String, Tensor)] {
        &self.tensors
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// Serialize named tensors into safetensors bytes with string metadata.
///
/// Shared by the checkpoint writer and by tests fabricating archives.
pub fn to_safetensors_bytes(
    entries: &[(String, Tensor)],
    metadata: HashMap<String, String>,
) -> Result<Vec<u8>> {
    let tensor_data: Vec<(String, Vec<u8>, Vec<usize>)> = entries
        .iter()
        .map(|(name, tensor)| {
            let bytes: Vec<u8> = bytemuck::cast_slice(tensor.values()).to_vec();
            (name.clone(), bytes, tensor.shape().to_vec())
        })
        .collect();

    let views: Vec<(&str, TensorView<'_>)> = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            let view = TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map_err(|e| Error::Serialization(format!("tensor '{name}' invalid: {e}")))?;
            Ok((name.as_str(), view))
        })
        .collect::<Result<Vec<_>>>()?;

    safetensors::serialize(views, &Some(metadata))
        .map_err(|e| Error::Serialization(format!("safetensors serialization failed: {e}")))
}

/// Write named tensors to a safetensors file.
pub fn write_safetensors(
    path: impl AsRef<Path>,
    entries: &[(String, Tensor)],
    metadata: HashMap<String, String>,
) -> Result<()> {
    let bytes = to_safetensors_bytes(entries, metadata)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn entry(name: &str, shape: Vec<usize>, data: Vec<f32>) -> (String, Tensor) {
        (name.to_string(), Tensor::from_vec(shape, data).unwrap())
    }

    #[test]
    fn test_tensor_shape_checked() {
        assert!(Tensor::from_vec(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).is_ok());
        assert!(Tensor::from_vec(vec![2, 2], vec![1.0]).is_err());
    }

    #[test]
    fn test_tensor_to_array() {
        let t = Tensor::from_vec(vec![2, 3], (0..6).map(|i| i as f32).collect()).unwrap();
        let arr = t.to_array().unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr[[1, 2]], 5.0);
    }

    #[test]
    fn test_tensor_allclose() {
        let a = Tensor::from_vec(vec![2], vec![1.0, 2.0]).unwrap();
        let b = Tensor::from_vec(vec![2], vec![1.0 + 1e-7, 2.0]).unwrap();
        let c = Tensor::from_vec(vec![2], vec![1.5, 2.0]).unwrap();
        assert!(a.allclose(&b, 1e-5));
        assert!(!a.allclose(&c, 1e-5));
    }

    #[test]
    fn test_allclose_shape_mismatch() {
        let a = Tensor::from_vec(vec![2], vec![1.0, 2.0]).unwrap();
        let b = Tensor::from_vec(vec![2, 1], vec![1.0, 2.0]).unwrap();
        assert!(!a.allclose(&b, 1e-5));
    }

    #[test]
    fn test_archive_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.safetensors");

        let entries = vec![
            entry("conv1.weight", vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]),
            entry("conv1.bias", vec![2], vec![0.1, 0.2]),
        ];
        write_safetensors(&path, &entries, HashMap::new()).unwrap();

        let archive = WeightArchive::open(&path).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.names(), vec!["conv1.bias", "conv1.weight"]);

        let weight = archive.get("conv1.weight").unwrap();
        assert_eq!(weight.shape(), &[2, 2]);
        assert_eq!(weight.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(archive.get("missing").is_none());
    }

    #[test]
    fn test_archive_missing_file_is_io_error() {
        let err = WeightArchive::open("no/such/model.safetensors").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }

    #[test]
    fn test_archive_invalid_bytes_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.safetensors");
        std::fs::write(&path, b"not a safetensors file").unwrap();

        let err = WeightArchive::open(&path).unwrap_err();
        assert!(err.to_string().contains("Serialization"));
    }

    #[test]
    fn test_archive_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.safetensors");
        write_safetensors(&path, &[], HashMap::new()).unwrap();

        let archive = WeightArchive::open(&path).unwrap();
        assert!(archive.is_empty());
    }

    proptest! {
        #[test]
        fn prop_archive_preserves_values(
            data in proptest::collection::vec(-1e6f32..1e6, 1..64)
        ) {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("prop.safetensors");

            let entries = vec![entry("w", vec![data.len()], data.clone())];
            write_safetensors(&path, &entries, HashMap::new()).unwrap();

            let archive = WeightArchive::open(&path).unwrap();
            let loaded = archive.get("w").unwrap();
            prop_assert_eq!(loaded.values(), data.as_slice());
        }
    }
}
