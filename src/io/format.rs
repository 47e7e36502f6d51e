//! Serialization format definitions

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported on-disk formats for models, datasets and result sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    /// JSON format (human-readable, larger file size)
    Json,

    /// YAML format (human-readable, good for hand-written fixtures)
    Yaml,

    /// SafeTensors format (efficient binary, bit-exact floats)
    SafeTensors,
}

impl FileFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &str {
        match self {
            FileFormat::Json => "json",
            FileFormat::Yaml => "yaml",
            FileFormat::SafeTensors => "safetensors",
        }
    }

    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yaml" | "yml" => Some(FileFormat::Yaml),
            "safetensors" => Some(FileFormat::SafeTensors),
            _ => None,
        }
    }

    /// Detect format from a path's extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Serialization(format!("{} has no extension", path.display())))?;
        Self::from_extension(ext)
            .ok_or_else(|| Error::Serialization(format!("Unsupported file extension: {ext}")))
    }
}

/// Configuration for saving models
#[derive(Debug, Clone)]
pub struct SaveConfig {
    pub format: FileFormat,

    /// Whether to pretty-print (text formats only)
    pub pretty: bool,
}

impl SaveConfig {
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self::new(FileFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_extension() {
        assert_eq!(FileFormat::Json.extension(), "json");
        assert_eq!(FileFormat::Yaml.extension(), "yaml");
        assert_eq!(FileFormat::SafeTensors.extension(), "safetensors");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("JSON"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("yml"), Some(FileFormat::Yaml));
        assert_eq!(
            FileFormat::from_extension("SAFETENSORS"),
            Some(FileFormat::SafeTensors)
        );
        assert_eq!(FileFormat::from_extension("csv"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("out/idi.safetensors")).unwrap(),
            FileFormat::SafeTensors
        );
        assert!(FileFormat::from_path(Path::new("model")).is_err());
        assert!(FileFormat::from_path(Path::new("model.bin")).is_err());
    }

    #[test]
    fn test_save_config_builder() {
        let config = SaveConfig::new(FileFormat::Yaml).with_pretty(false);
        assert_eq!(config.format, FileFormat::Yaml);
        assert!(!config.pretty);
        assert!(SaveConfig::default().pretty);
    }
}
