/// Errors that can occur while loading, compiling, or applying schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// A JSON Schema could not be compiled.
    #[error("failed to compile schema for {target}: {message}")]
    CompileFailed { target: String, message: String },

    /// A value failed schema validation.
    #[error("validation failed for {target}: {message}")]
    ValidationFailed { target: String, message: String },

    /// The input is not valid JSON, or does not have the endpoint document shape.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The endpoint document is well-formed JSON but semantically invalid.
    #[error("invalid endpoint document: {0}")]
    InvalidDocument(String),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
