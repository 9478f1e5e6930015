use std::collections::BTreeMap;
use std::fs::{File, Metadata};
use std::io::Read;
use std::path::Path;

use crate::config::SchemaConfig;
use crate::document::EndpointSchema;
use crate::error::{Result, SchemaError};

/// File name suffix recognized by [`load_directory`].
pub const ENDPOINT_SCHEMA_SUFFIX: &str = ".endpoint.json";

/// Load one endpoint document from a file.
pub fn load_file(path: &Path, config: &SchemaConfig) -> Result<EndpointSchema> {
    let file = File::open(path).map_err(|err| {
        SchemaError::LoadFailed(format!("failed opening schema {}: {err}", path.display()))
    })?;
    let content = read_limited(file, path, config.max_schema_file_size)?;
    EndpointSchema::from_json_with_config(&content, config)
}

/// Load every `*.endpoint.json` file in a directory, sorted by endpoint name.
///
/// Symlinked schema files are refused. Other files are skipped. Two files
/// declaring the same endpoint name are an error.
pub fn load_directory(path: &Path, config: &SchemaConfig) -> Result<Vec<EndpointSchema>> {
    let entries = std::fs::read_dir(path)
        .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

    let mut loaded: BTreeMap<String, EndpointSchema> = BTreeMap::new();
    let mut file_count = 0usize;

    for entry in entries {
        let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name
            .to_ascii_lowercase()
            .ends_with(ENDPOINT_SCHEMA_SUFFIX)
        {
            continue;
        }

        let entry_path = entry.path();
        let path_metadata = std::fs::symlink_metadata(&entry_path)
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        let file_type = path_metadata.file_type();

        if file_type.is_symlink() {
            return Err(SchemaError::LoadFailed(format!(
                "refusing to load schema symlink: {file_name}"
            )));
        }
        if !file_type.is_file() {
            continue;
        }

        file_count = file_count.saturating_add(1);
        if file_count > config.max_schemas_from_directory {
            return Err(SchemaError::LoadFailed(format!(
                "schema count exceeds configured max ({}): {file_count}",
                config.max_schemas_from_directory
            )));
        }

        let file = File::open(&entry_path).map_err(|err| {
            SchemaError::LoadFailed(format!(
                "failed opening schema {}: {err}",
                entry_path.display()
            ))
        })?;
        let opened_metadata = file
            .metadata()
            .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
        if !same_file_identity(&path_metadata, &opened_metadata) {
            return Err(SchemaError::LoadFailed(format!(
                "schema file changed during load: {file_name}"
            )));
        }

        let content = read_limited(file, &entry_path, config.max_schema_file_size)?;
        let schema = EndpointSchema::from_json_with_config(&content, config)?;

        if loaded.contains_key(schema.name()) {
            return Err(SchemaError::LoadFailed(format!(
                "endpoint {} declared more than once (again in {file_name})",
                schema.name()
            )));
        }
        tracing::debug!(endpoint = schema.name(), file = %file_name, "loaded endpoint schema");
        loaded.insert(schema.name().to_string(), schema);
    }

    Ok(loaded.into_values().collect())
}

fn read_limited(file: File, path: &Path, max_bytes: usize) -> Result<String> {
    let metadata = file
        .metadata()
        .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
    if metadata.len() > max_bytes as u64 {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large ({} bytes): {}",
            metadata.len(),
            path.display()
        )));
    }

    let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
    let mut content = String::new();
    file.take(read_limit)
        .read_to_string(&mut content)
        .map_err(|err| {
            SchemaError::LoadFailed(format!("failed reading schema {}: {err}", path.display()))
        })?;
    // The file may have grown between the metadata check and the read.
    if content.len() > max_bytes {
        return Err(SchemaError::LoadFailed(format!(
            "schema file too large while reading: {}",
            path.display()
        )));
    }

    Ok(content)
}

#[cfg(unix)]
fn same_file_identity(path_metadata: &Metadata, opened_metadata: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}

// Stable Windows file identity needs GetFileInformationByHandle; until then
// only the file type and length are compared.
#[cfg(not(unix))]
fn same_file_identity(path_metadata: &Metadata, opened_metadata: &Metadata) -> bool {
    path_metadata.is_file() == opened_metadata.is_file()
        && path_metadata.len() == opened_metadata.len()
}
