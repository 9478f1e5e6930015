//! Endpoint schema documents for rpcprims.
//!
//! An endpoint schema names an endpoint, gives it an opaque routing path, and
//! declares its methods. Each method carries a [`MethodKind`] and compiled
//! JSON Schema validators for its input and result.
//!
//! Schemas are data only. Binding them to handlers happens in
//! `rpcprims-endpoint`.

pub mod config;
pub mod document;
pub mod error;
pub mod kind;
pub mod loader;
mod strict;
pub mod validator;

pub use config::SchemaConfig;
pub use document::{EndpointSchema, MethodSchema};
pub use error::{Result, SchemaError};
pub use kind::MethodKind;
pub use loader::{load_directory, load_file, ENDPOINT_SCHEMA_SUFFIX};
pub use validator::SchemaValidator;
