//! Document writing utilities.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::SpecResult;

/// Serialization format of an output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension. Anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// Writer for generated templates.
pub struct DocumentWriter;

impl DocumentWriter {
    /// Render a document to a string in the given format.
    pub fn render(document: &serde_yaml::Value, format: DocumentFormat) -> SpecResult<String> {
        let content = match format {
            DocumentFormat::Yaml => serde_yaml::to_string(document)?,
            DocumentFormat::Json => {
                let mut json = serde_json::to_string_pretty(document)?;
                json.push('\n');
                json
            }
        };
        Ok(content)
    }

    /// Write a document to disk, choosing the format from the file extension.
    pub fn write(path: impl AsRef<Path>, document: &serde_yaml::Value) -> SpecResult<()> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path);
        debug!("Writing {:?} document to {:?}", format, path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, Self::render(document, format)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("out/template.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("template.JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("template.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("template")), DocumentFormat::Yaml);
    }

    #[test]
    fn test_render_json_keeps_key_order() {
        let doc: serde_yaml::Value = serde_yaml::from_str("b: 1\na: 2\n").unwrap();
        let json = DocumentWriter::render(&doc, DocumentFormat::Json).unwrap();
        let b = json.find("\"b\"").unwrap();
        let a = json.find("\"a\"").unwrap();
        assert!(b < a);
    }
}
