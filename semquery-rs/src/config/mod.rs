//! Configuration loading for dataset definitions
//!
//! Definitions are YAML or JSON documents with a top-level `datasets` list.

mod loader;
mod schema;

pub use loader::{load_from_directory, load_from_file, load_from_string, register_all, ConfigFormat};
pub use schema::{DatasetDefinition, DefinitionsFile};
