//! Loading dataset definitions from strings, files and directories

use std::fs;
use std::path::Path;

use tracing::info;

use super::schema::{DatasetDefinition, DefinitionsFile};
use crate::core::DatasetRegistry;
use crate::error::{Result, SemqueryError};

/// Definitions file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Some(ConfigFormat::Yaml),
            Some("json") => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// Parse definitions from a string
pub fn load_from_string(content: &str, format: ConfigFormat) -> Result<Vec<DatasetDefinition>> {
    let file: DefinitionsFile = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| SemqueryError::Config(format!("invalid YAML definitions: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| SemqueryError::Config(format!("invalid JSON definitions: {e}")))?,
    };
    Ok(file.datasets)
}

/// Parse definitions from a single `.yml`, `.yaml` or `.json` file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Vec<DatasetDefinition>> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        SemqueryError::Config(format!(
            "unsupported definitions file '{}' (expected .yml, .yaml or .json)",
            path.display()
        ))
    })?;

    let content = fs::read_to_string(path).map_err(|e| {
        SemqueryError::Config(format!("failed to read '{}': {e}", path.display()))
    })?;

    let definitions = load_from_string(&content, format)
        .map_err(|e| SemqueryError::Config(format!("{}: {e}", path.display())))?;

    info!(
        path = %path.display(),
        datasets = definitions.len(),
        "Loaded dataset definitions"
    );
    Ok(definitions)
}

/// Parse every definitions file in a directory, in file name order
pub fn load_from_directory(dir: impl AsRef<Path>) -> Result<Vec<DatasetDefinition>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| {
        SemqueryError::Config(format!("failed to read directory '{}': {e}", dir.display()))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| SemqueryError::Config(format!("{}: {e}", dir.display())))?
            .path();
        if path.is_file() && ConfigFormat::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::new();
    for path in paths {
        definitions.extend(load_from_file(&path)?);
    }
    Ok(definitions)
}

/// Register every definition, stopping at the first invalid one
pub fn register_all(
    registry: &DatasetRegistry,
    definitions: Vec<DatasetDefinition>,
) -> Result<Vec<String>> {
    definitions
        .into_iter()
        .map(|definition| registry.register(definition.into_dataset()))
        .collect()
}
