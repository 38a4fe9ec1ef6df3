//! Serialization module for converting OpenAPI documents to YAML or JSON format.
//!
//! This module provides functions to serialize OpenAPI documents into standard formats
//! and write them to files or return them as strings.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// First line of every generated YAML document
pub const YAML_HEADER: &str = "# Generated with openapi-from-idl";

/// Serializes an OpenAPI document to YAML format.
///
/// The output starts with a comment line marking it as generated.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use openapi_from_idl::{generate, idl::IdlModel, serializer::serialize_yaml};
///
/// let result = generate(&IdlModel::default());
/// let yaml = serialize_yaml(&result.document).unwrap();
/// assert!(yaml.starts_with("# Generated with openapi-from-idl\n"));
/// ```
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    let body = serde_yaml::to_string(doc)
        .context("Failed to serialize OpenAPI document to YAML")?;
    Ok(format!("{}\n\n{}", YAML_HEADER, body))
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc)
        .context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
///
/// Overwrites the file if it exists.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
