//! Saving classifiers, datasets and discovered instances

use super::format::{FileFormat, SaveConfig};
use super::model::ModelState;
use crate::data::{ClusterData, Instance};
use crate::model::Mlp;
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Tensor name holding instance rows in SafeTensors files
pub const INSTANCES_TENSOR: &str = "instances";
/// Tensor name holding per-row cluster labels in SafeTensors files
pub const CLUSTER_LABELS_TENSOR: &str = "cluster_labels";

/// Text-format wrapper for an instance set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct InstanceFile {
    pub num_attrs: usize,
    pub instances: Vec<Instance>,
}

/// Save a classifier to a file
///
/// # Example
///
/// ```no_run
/// use fedig::io::{save_model, FileFormat, SaveConfig};
/// use fedig::model::{Mlp, OutputHead};
///
/// let mlp = Mlp::random(&[13, 8, 1], OutputHead::Sigmoid, 42).unwrap();
/// save_model(&mlp, "census", "census.json", &SaveConfig::new(FileFormat::Json)).unwrap();
/// ```
pub fn save_model(mlp: &Mlp, name: &str, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();
    let state = ModelState::from_mlp(name, mlp);

    match config.format {
        FileFormat::SafeTensors => save_model_safetensors(&state, path),
        FileFormat::Json | FileFormat::Yaml => write_text(&state, path, config.format, config.pretty),
    }
}

fn write_text<T: Serialize>(value: &T, path: &Path, format: FileFormat, pretty: bool) -> Result<()> {
    let data = match format {
        FileFormat::Json if pretty => serde_json::to_string_pretty(value)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        FileFormat::Json => serde_json::to_string(value)
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?,
        FileFormat::Yaml => serde_yaml::to_string(value)
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?,
        FileFormat::SafeTensors => {
            return Err(Error::Serialization(
                "SafeTensors is not a text format".to_string(),
            ))
        }
    };
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}

fn write_safetensors(
    tensors: &[(String, Dtype, Vec<usize>, Vec<u8>)],
    metadata: HashMap<String, String>,
    path: &Path,
) -> Result<()> {
    let views = tensors
        .iter()
        .map(|(name, dtype, shape, bytes)| {
            TensorView::new(*dtype, shape.clone(), bytes)
                .map(|view| (name.as_str(), view))
                .map_err(|e| Error::Serialization(format!("invalid tensor {name}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let bytes = safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn save_model_safetensors(state: &ModelState, path: &Path) -> Result<()> {
    let mut offset = 0;
    let tensors: Vec<_> = state
        .parameters
        .iter()
        .map(|info| {
            let size = info.numel();
            let values = &state.data[offset..offset + size];
            offset += size;
            (
                info.name.clone(),
                Dtype::F32,
                info.shape.clone(),
                bytemuck::cast_slice::<f32, u8>(values).to_vec(),
            )
        })
        .collect();

    let layer_sizes = serde_json::to_string(&state.metadata.layer_sizes)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    let mut metadata = HashMap::new();
    metadata.insert("name".to_string(), state.metadata.name.clone());
    metadata.insert("version".to_string(), state.metadata.version.clone());
    metadata.insert("head".to_string(), state.metadata.head.as_str().to_string());
    metadata.insert("layer_sizes".to_string(), layer_sizes);
    if let Some(class) = state.metadata.gradient_class {
        metadata.insert("gradient_class".to_string(), class.to_string());
    }

    write_safetensors(&tensors, metadata, path)
}

fn instance_tensor(instances: &[Instance], num_attrs: usize) -> Result<(String, Dtype, Vec<usize>, Vec<u8>)> {
    let mut flat = Vec::with_capacity(instances.len() * num_attrs);
    for (row, x) in instances.iter().enumerate() {
        if x.len() != num_attrs {
            return Err(Error::ShapeMismatch {
                expected: vec![num_attrs],
                got: vec![row, x.len()],
            });
        }
        flat.extend_from_slice(x);
    }
    Ok((
        INSTANCES_TENSOR.to_string(),
        Dtype::F32,
        vec![instances.len(), num_attrs],
        bytemuck::cast_slice::<f32, u8>(&flat).to_vec(),
    ))
}

/// Save discovered instances, format chosen by extension
///
/// SafeTensors files hold one `instances` F32 tensor of shape
/// `[rows, num_attrs]` plus a `num_attrs` metadata entry, so an empty set
/// still records its width. Values round-trip bit for bit.
pub fn save_instances(instances: &[Instance], num_attrs: usize, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match FileFormat::from_path(path)? {
        FileFormat::SafeTensors => {
            let tensor = instance_tensor(instances, num_attrs)?;
            let mut metadata = HashMap::new();
            metadata.insert("num_attrs".to_string(), num_attrs.to_string());
            write_safetensors(&[tensor], metadata, path)
        }
        format => {
            if let Some((row, x)) = instances.iter().enumerate().find(|(_, x)| x.len() != num_attrs) {
                return Err(Error::ShapeMismatch {
                    expected: vec![num_attrs],
                    got: vec![row, x.len()],
                });
            }
            let file = InstanceFile {
                num_attrs,
                instances: instances.to_vec(),
            };
            write_text(&file, path, format, true)
        }
    }
}

/// Save a clustered dataset, format chosen by extension
///
/// SafeTensors files carry `instances` (F32 `[rows, num_attrs]`) and
/// `cluster_labels` (U32 `[rows]`).
pub fn save_cluster_data(data: &ClusterData, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    data.check_shape()?;
    match FileFormat::from_path(path)? {
        FileFormat::SafeTensors => {
            let num_attrs = data.num_attrs().unwrap_or(0);
            let labels = data
                .cluster_labels
                .iter()
                .map(|&l| {
                    u32::try_from(l).map_err(|_| {
                        Error::Serialization(format!("cluster label {l} does not fit in u32"))
                    })
                })
                .collect::<Result<Vec<u32>>>()?;
            let tensors = [
                instance_tensor(&data.instances, num_attrs)?,
                (
                    CLUSTER_LABELS_TENSOR.to_string(),
                    Dtype::U32,
                    vec![labels.len()],
                    bytemuck::cast_slice::<u32, u8>(&labels).to_vec(),
                ),
            ];
            let mut metadata = HashMap::new();
            metadata.insert("num_attrs".to_string(), num_attrs.to_string());
            write_safetensors(&tensors, metadata, path)
        }
        format => write_text(data, path, format, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OutputHead;
    use tempfile::TempDir;

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_save_model_json_pretty_and_compact() {
        let dir = TempDir::new().unwrap();
        let mlp = Mlp::random(&[3, 1], OutputHead::Sigmoid, 3).unwrap();

        let pretty = dir.path().join("pretty.json");
        save_model(&mlp, "pretty-test", &pretty, &SaveConfig::new(FileFormat::Json)).unwrap();
        let content = std::fs::read_to_string(&pretty).unwrap();
        assert!(content.contains("pretty-test"));
        assert!(content.contains("sigmoid"));
        assert!(content.lines().count() > 1);

        let compact = dir.path().join("compact.json");
        save_model(
            &mlp,
            "compact",
            &compact,
            &SaveConfig::new(FileFormat::Json).with_pretty(false),
        )
        .unwrap();
        let content = std::fs::read_to_string(&compact).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_save_model_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.yaml");
        let mlp = Mlp::random(&[2, 2], OutputHead::Softmax, 3).unwrap();
        save_model(&mlp, "yaml-model", &path, &SaveConfig::new(FileFormat::Yaml)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("yaml-model"));
        assert!(content.contains("layer_sizes"));
    }

    #[test]
    fn test_save_instances_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let rows = vec![inst(&[1.0, 2.0]), inst(&[1.0])];
        for name in ["idi.safetensors", "idi.json"] {
            let result = save_instances(&rows, 2, dir.path().join(name));
            assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
        }
    }

    #[test]
    fn test_save_instances_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let result = save_instances(&[], 3, dir.path().join("idi.csv"));
        assert!(matches!(result, Err(Error::Serialization(_))));
    }
}
