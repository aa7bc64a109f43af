use std::collections::HashMap;

use crate::error::Result;
use crate::field::CommonField;

/// Metadata written in output file headers
#[derive(Debug, Clone)]
pub struct OutputMetadata {
    pub source: String,
    pub creation_time: String,
    pub global_attributes: HashMap<String, String>,
}

impl Default for OutputMetadata {
    fn default() -> Self {
        Self {
            source: "unknown".to_string(),
            creation_time: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            global_attributes: HashMap::new(),
        }
    }
}

/// Generic trait for writing fields to different formats
pub trait FieldWriter {
    /// Set global metadata and attributes
    fn set_metadata(&mut self, metadata: &OutputMetadata) -> Result<()>;

    /// Add custom global attribute
    fn add_global_attribute(&mut self, name: &str, value: &str) -> Result<()>;

    /// Queue a field for writing
    fn write_field(&mut self, field: &dyn CommonField) -> Result<()>;

    /// Finalize and close the output
    fn close(&mut self) -> Result<()>;

    /// Get the output file path
    fn get_output_path(&self) -> &str;
}
