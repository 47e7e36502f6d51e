//! Model and data I/O
//!
//! Classifiers, clustered datasets and discovered instance sets can be
//! stored as JSON, YAML or SafeTensors; the format follows the file
//! extension.

mod format;
mod load;
mod model;
mod save;


pub use format::{FileFormat, SaveConfig};
pub use load::{load_cluster_data, load_instances, load_model, load_model_state};
pub use model::{ModelMetadata, ModelState, ParameterInfo};
pub use save::{save_cluster_data, save_instances, save_model, CLUSTER_LABELS_TENSOR, INSTANCES_TENSOR};
