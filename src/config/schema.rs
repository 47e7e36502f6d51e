//! YAML schema definitions for declarative search runs

use super::presets::Preset;
use crate::data::Constraint;
use crate::search::{FairnessConfig, SearchParams};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete run specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Protected attributes and attribute domains
    pub dataset: DatasetSpec,

    /// Classifier under test
    pub model: ModelRef,

    /// Seed rows and their cluster labels
    pub data: DataConfig,

    /// Search hyperparameters
    #[serde(default)]
    pub search: SearchParams,

    #[serde(default)]
    pub output: OutputSpec,
}

/// Dataset description: a preset, explicit fields, or a preset with overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,

    /// Overrides the preset's protected attributes when given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected_attrs: Option<Vec<usize>>,

    /// Overrides the preset's domains when given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Constraint>,
}

impl DatasetSpec {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            preset: Some(preset),
            ..Self::default()
        }
    }

    /// Merge preset and explicit fields into a checked fairness config
    pub fn resolve(&self) -> Result<FairnessConfig> {
        let (protected, constraint) = match self.preset {
            Some(preset) => (
                self.protected_attrs
                    .clone()
                    .unwrap_or_else(|| preset.protected_attrs().to_vec()),
                match &self.constraint {
                    Some(c) => c.clone(),
                    None => Constraint::from_ranges(preset.ranges())?,
                },
            ),
            None => match (&self.protected_attrs, &self.constraint) {
                (Some(p), Some(c)) => (p.clone(), c.clone()),
                _ => {
                    return Err(Error::ConfigError(
                        "dataset needs a preset or both protected_attrs and constraint".into(),
                    ))
                }
            },
        };
        FairnessConfig::new(protected, constraint)
    }
}

/// Model artifact reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Path to the classifier (JSON, YAML or SafeTensors)
    pub path: PathBuf,
}

/// Data configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the clustered dataset
    pub clusters: PathBuf,
}

/// Where discovered instances are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./idi.safetensors")
}
