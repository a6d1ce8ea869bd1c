//! Document reading utilities.
//!
//! Both YAML and JSON documents are accepted; JSON is parsed as YAML.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::ApiSpecification;

/// Reader for API specifications and blueprint templates.
pub struct DocumentReader;

impl DocumentReader {
    /// Read and parse an API specification from disk.
    pub fn read_spec(path: impl AsRef<Path>) -> SpecResult<ApiSpecification> {
        let path = path.as_ref();
        let content = Self::read_file(path)?;

        serde_yaml::from_str(&content).map_err(|e| SpecError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a generic document tree from disk.
    pub fn read_document(path: impl AsRef<Path>) -> SpecResult<serde_yaml::Value> {
        let path = path.as_ref();
        let content = Self::read_file(path)?;

        serde_yaml::from_str(&content).map_err(|e| SpecError::InvalidFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse an API specification from an in-memory string.
    pub fn parse_spec(content: &str) -> SpecResult<ApiSpecification> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse a generic document tree from an in-memory string.
    pub fn parse_document(content: &str) -> SpecResult<serde_yaml::Value> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn read_file(path: &Path) -> SpecResult<String> {
        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }

        debug!("Reading document from {:?}", path);
        Ok(fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_spec() {
        let content = r#"{
  "servers": [{"url": "https://api.example.com"}],
  "paths": {
    "/items/{id}": {
      "delete": {"operationId": "itemDelete", "responses": {"204": {"description": "ok"}}}
    }
  }
}"#;

        let spec = DocumentReader::parse_spec(content).unwrap();
        assert_eq!(spec.servers.len(), 1);
        let item = spec.path("/items/{id}").unwrap();
        assert_eq!(
            item.operation("delete").unwrap().trigger_identifier(),
            Some("itemDelete")
        );
    }

    #[test]
    fn test_read_missing_file() {
        let err = DocumentReader::read_spec("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, SpecError::NotFound(_)));
    }
}
