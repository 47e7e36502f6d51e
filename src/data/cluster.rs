//! Dataset rows with their precomputed cluster membership

use super::Instance;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Dataset rows with one cluster label per row
///
/// Produced by an offline clustering pass; the search only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
    pub instances: Vec<Instance>,
    pub cluster_labels: Vec<usize>,
}

impl ClusterData {
    pub fn new(instances: Vec<Instance>, cluster_labels: Vec<usize>) -> Result<Self> {
        let data = Self {
            instances,
            cluster_labels,
        };
        data.check_shape()?;
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Width of the rows, `None` for an empty dataset
    pub fn num_attrs(&self) -> Option<usize> {
        self.instances.first().map(|x| x.len())
    }

    /// Check labels line up with rows and every row has the same width
    pub fn check_shape(&self) -> Result<()> {
        if self.instances.len() != self.cluster_labels.len() {
            return Err(Error::ConfigError(format!(
                "{} instances but {} cluster labels",
                self.instances.len(),
                self.cluster_labels.len()
            )));
        }
        if let Some(width) = self.num_attrs() {
            if let Some((row, x)) = self.instances.iter().enumerate().find(|(_, x)| x.len() != width) {
                return Err(Error::ShapeMismatch {
                    expected: vec![width],
                    got: vec![row, x.len()],
                });
            }
        }
        Ok(())
    }

    /// Number of distinct clusters referenced (highest label + 1)
    pub fn cluster_count(&self) -> usize {
        self.cluster_labels.iter().max().map_or(0, |max| max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(values: &[f32]) -> Instance {
        Instance::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_label_count_mismatch() {
        let result = ClusterData::new(vec![inst(&[1.0])], vec![0, 1]);
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_ragged_rows() {
        let result = ClusterData::new(vec![inst(&[1.0, 2.0]), inst(&[1.0])], vec![0, 0]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_cluster_count() {
        let data = ClusterData::new(
            vec![inst(&[1.0]), inst(&[2.0]), inst(&[3.0])],
            vec![0, 3, 1],
        )
        .unwrap();
        assert_eq!(data.cluster_count(), 4);
        assert_eq!(data.num_attrs(), Some(1));
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{"instances": [[1, 2], [3, 4]], "cluster_labels": [0, 1]}"#;
        let data: ClusterData = serde_json::from_str(json).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.instances[1].values(), &[3.0, 4.0]);
    }
}
