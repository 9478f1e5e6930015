/// Controls how endpoint schemas are compiled and loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaConfig {
    /// When true, object schemas reject properties they do not declare.
    pub strict_mode: bool,
    /// Maximum number of schema files loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file.
    pub max_schema_file_size: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}
