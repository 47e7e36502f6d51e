//! Loading classifiers, datasets and instance sets

use super::format::FileFormat;
use super::model::{bias_name, weight_name, ModelMetadata, ModelState, ParameterInfo};
use super::save::{InstanceFile, CLUSTER_LABELS_TENSOR, INSTANCES_TENSOR};
use crate::data::{ClusterData, Instance};
use crate::model::{Mlp, OutputHead};
use crate::{Error, Result};
use safetensors::tensor::Dtype;
use safetensors::SafeTensors;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

/// Load a classifier, format detected from the extension
///
/// # Example
///
/// ```no_run
/// use fedig::io::load_model;
/// use fedig::model::Classifier;
///
/// let model = load_model("census.safetensors").unwrap();
/// println!("model takes {} inputs", model.num_inputs());
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<Mlp> {
    load_model_state(path)?.to_mlp()
}

/// Load the raw serialized state of a classifier
pub fn load_model_state(path: impl AsRef<Path>) -> Result<ModelState> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::SafeTensors => load_model_safetensors(path),
        format => read_text(path, format),
    }
}

fn read_text<T: DeserializeOwned>(path: &Path, format: FileFormat) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    match format {
        FileFormat::Json => serde_json::from_str(&content)
            .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}"))),
        FileFormat::Yaml => serde_yaml::from_str(&content)
            .map_err(|e| Error::Serialization(format!("YAML deserialization failed: {e}"))),
        FileFormat::SafeTensors => Err(Error::Serialization(
            "SafeTensors is not a text format".to_string(),
        )),
    }
}

fn read_metadata(data: &[u8]) -> Result<HashMap<String, String>> {
    let (_, st_metadata) = SafeTensors::read_metadata(data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
    Ok(st_metadata.metadata().clone().unwrap_or_default())
}

/// Read a named tensor, checking its dtype, and return its shape and bytes
fn read_tensor<'a>(st: &'a SafeTensors<'a>, name: &str, dtype: Dtype) -> Result<(Vec<usize>, &'a [u8])> {
    let view = st
        .tensor(name)
        .map_err(|e| Error::Serialization(format!("missing tensor {name}: {e}")))?;
    if view.dtype() != dtype {
        return Err(Error::Serialization(format!(
            "tensor {name} has dtype {:?}, expected {dtype:?}",
            view.dtype()
        )));
    }
    Ok((view.shape().to_vec(), view.data()))
}

fn load_model_safetensors(path: &Path) -> Result<ModelState> {
    let data = std::fs::read(path)?;
    let meta = read_metadata(&data)?;

    let head_name = meta
        .get("head")
        .ok_or_else(|| Error::Serialization("metadata has no head".to_string()))?;
    let head = OutputHead::parse(head_name)
        .ok_or_else(|| Error::Serialization(format!("unknown output head {head_name}")))?;
    let layer_sizes: Vec<usize> = meta
        .get("layer_sizes")
        .ok_or_else(|| Error::Serialization("metadata has no layer_sizes".to_string()))
        .and_then(|s| {
            serde_json::from_str(s)
                .map_err(|e| Error::Serialization(format!("bad layer_sizes {s}: {e}")))
        })?;

    let mut metadata = ModelMetadata::new(
        meta.get("name").cloned().unwrap_or_else(|| "unknown".to_string()),
        head,
        layer_sizes.clone(),
    );
    if let Some(version) = meta.get("version") {
        metadata.version = version.clone();
    }
    if let Some(class) = meta.get("gradient_class") {
        let class = class
            .parse()
            .map_err(|e| Error::Serialization(format!("bad gradient_class {class}: {e}")))?;
        metadata.gradient_class = Some(class);
    }

    let st = SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    let mut parameters = Vec::new();
    let mut values = Vec::new();
    for i in 0..layer_sizes.len().saturating_sub(1) {
        for name in [weight_name(i), bias_name(i)] {
            let (shape, bytes) = read_tensor(&st, &name, Dtype::F32)?;
            values.extend(bytemuck::pod_collect_to_vec::<u8, f32>(bytes));
            parameters.push(ParameterInfo { name, shape });
        }
    }

    Ok(ModelState {
        metadata,
        parameters,
        data: values,
    })
}

fn rows_from_flat(flat: Vec<f32>, shape: &[usize]) -> Result<Vec<Instance>> {
    let [rows, num_attrs] = shape else {
        return Err(Error::Serialization(format!(
            "instances tensor must be 2-D, got shape {shape:?}"
        )));
    };
    if *num_attrs == 0 {
        return (0..*rows).map(|_| Instance::new(Vec::new())).collect();
    }
    flat.chunks_exact(*num_attrs)
        .map(|row| Instance::new(row.to_vec()))
        .collect()
}

/// Load an instance set and its width
///
/// The width comes from the tensor shape (or the `num_attrs` field of text
/// files), so it survives an empty set.
pub fn load_instances(path: impl AsRef<Path>) -> Result<(Vec<Instance>, usize)> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::SafeTensors => {
            let data = std::fs::read(path)?;
            let st = SafeTensors::deserialize(&data)
                .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
            let (shape, bytes) = read_tensor(&st, INSTANCES_TENSOR, Dtype::F32)?;
            let rows = rows_from_flat(bytemuck::pod_collect_to_vec::<u8, f32>(bytes), &shape)?;
            Ok((rows, shape[1]))
        }
        format => {
            let file: InstanceFile = read_text(path, format)?;
            if let Some((row, x)) = file
                .instances
                .iter()
                .enumerate()
                .find(|(_, x)| x.len() != file.num_attrs)
            {
                return Err(Error::ShapeMismatch {
                    expected: vec![file.num_attrs],
                    got: vec![row, x.len()],
                });
            }
            Ok((file.instances, file.num_attrs))
        }
    }
}

/// Load a clustered dataset, format detected from the extension
pub fn load_cluster_data(path: impl AsRef<Path>) -> Result<ClusterData> {
    let path = path.as_ref();
    let data = match FileFormat::from_path(path)? {
        FileFormat::SafeTensors => {
            let bytes = std::fs::read(path)?;
            let st = SafeTensors::deserialize(&bytes)
                .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
            let (shape, raw) = read_tensor(&st, INSTANCES_TENSOR, Dtype::F32)?;
            let instances = rows_from_flat(bytemuck::pod_collect_to_vec::<u8, f32>(raw), &shape)?;
            let (_, raw) = read_tensor(&st, CLUSTER_LABELS_TENSOR, Dtype::U32)?;
            let cluster_labels = bytemuck::pod_collect_to_vec::<u8, u32>(raw)
                .into_iter()
                .map(|l| l as usize)
                .collect();
            ClusterData {
                instances,
                cluster_labels,
            }
        }
        format => read_text(path, format)?,
    };
    data.check_shape()?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.unknown");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(load_model(&path), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_model(dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_load_garbage_safetensors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.safetensors");
        std::fs::write(&path, b"not a safetensors file").unwrap();
        assert!(matches!(load_instances(&path), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_load_cluster_data_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.yaml");
        std::fs::write(
            &path,
            "instances:\n  - [1.0, 0.0]\n  - [2.0, 1.0]\ncluster_labels: [0, 1]\n",
        )
        .unwrap();
        let data = load_cluster_data(&path).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.cluster_labels, vec![0, 1]);
        assert_eq!(data.instances[1].values(), &[2.0, 1.0]);
    }

    #[test]
    fn test_load_cluster_data_label_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"{"instances": [[1.0]], "cluster_labels": [0, 0]}"#).unwrap();
        assert!(load_cluster_data(&path).is_err());
    }

    #[test]
    fn test_text_instances_width_checked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("idi.json");
        std::fs::write(&path, r#"{"num_attrs": 3, "instances": [[1.0, 2.0]]}"#).unwrap();
        assert!(matches!(load_instances(&path), Err(Error::ShapeMismatch { .. })));
    }
}
