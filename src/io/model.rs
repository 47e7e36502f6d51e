//! Serializable classifier state

use crate::model::{Dense, Mlp, OutputHead};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Architecture and provenance of a saved classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    pub version: String,

    /// Final-layer activation
    pub head: OutputHead,

    /// Input width followed by every layer's output width
    pub layer_sizes: Vec<usize>,

    /// Output the input gradient is taken from; `None` means the last one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_class: Option<usize>,

    /// Free-form fields (dataset, training notes)
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>, head: OutputHead, layer_sizes: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".to_string(),
            head,
            layer_sizes,
            gradient_class: None,
            custom: HashMap::new(),
        }
    }

    /// Add custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}

/// Information about a model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (`layer0.weight`, `layer0.bias`, ...)
    pub name: String,

    pub shape: Vec<usize>,
}

impl ParameterInfo {
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Serializable model state: metadata plus flattened parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    pub metadata: ModelMetadata,

    pub parameters: Vec<ParameterInfo>,

    /// Parameters concatenated in `parameters` order
    pub data: Vec<f32>,
}

pub(crate) fn weight_name(layer: usize) -> String {
    format!("layer{layer}.weight")
}

pub(crate) fn bias_name(layer: usize) -> String {
    format!("layer{layer}.bias")
}

impl ModelState {
    pub fn from_mlp(name: impl Into<String>, mlp: &Mlp) -> Self {
        let mut parameters = Vec::with_capacity(mlp.layers().len() * 2);
        let mut data = Vec::new();
        for (i, layer) in mlp.layers().iter().enumerate() {
            parameters.push(ParameterInfo {
                name: weight_name(i),
                shape: vec![layer.inputs(), layer.outputs()],
            });
            data.extend(layer.weight().iter().copied());
            parameters.push(ParameterInfo {
                name: bias_name(i),
                shape: vec![layer.outputs()],
            });
            data.extend(layer.bias().iter().copied());
        }
        let mut metadata = ModelMetadata::new(name, mlp.head(), mlp.layer_sizes());
        if mlp.gradient_class() + 1 != mlp.num_outputs() {
            metadata.gradient_class = Some(mlp.gradient_class());
        }
        Self {
            metadata,
            parameters,
            data,
        }
    }

    /// Look up a parameter's values by name
    pub fn parameter(&self, name: &str) -> Option<&[f32]> {
        let mut offset = 0;
        for info in &self.parameters {
            let size = info.numel();
            if info.name == name {
                return self.data.get(offset..offset + size);
            }
            offset += size;
        }
        None
    }

    /// Rebuild the network, checking every parameter against `layer_sizes`
    pub fn to_mlp(&self) -> Result<Mlp> {
        let total: usize = self.parameters.iter().map(ParameterInfo::numel).sum();
        if total != self.data.len() {
            return Err(Error::Serialization(format!(
                "parameters describe {total} values but {} are stored",
                self.data.len()
            )));
        }
        let sizes = &self.metadata.layer_sizes;
        if sizes.len() < 2 {
            return Err(Error::Serialization(format!(
                "layer_sizes must list at least two widths, got {sizes:?}"
            )));
        }
        let layers = sizes
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let weight = self.parameter(&weight_name(i)).ok_or_else(|| {
                    Error::Serialization(format!("missing parameter {}", weight_name(i)))
                })?;
                let bias = self.parameter(&bias_name(i)).ok_or_else(|| {
                    Error::Serialization(format!("missing parameter {}", bias_name(i)))
                })?;
                Dense::new(pair[0], pair[1], weight.to_vec(), bias.to_vec())
            })
            .collect::<Result<Vec<_>>>()?;
        let mlp = Mlp::new(layers, self.metadata.head)?;
        match self.metadata.gradient_class {
            Some(class) => mlp.with_gradient_class(class),
            None => Ok(mlp),
        }
    }
}
