use rpcprims_schema::{MethodKind, SchemaError};

use crate::handler::{BoxError, CallShape};

/// Errors raised by endpoint construction, registration, and invocation.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The endpoint does not declare the requested method.
    #[error("endpoint {endpoint} has no method {method}")]
    UnknownMethod { endpoint: String, method: String },

    /// The method is declared but no handler was supplied for it.
    #[error("missing handler for method {method} on endpoint {endpoint}")]
    MissingHandler { endpoint: String, method: String },

    /// A handler or call does not fit the method's kind.
    #[error("method {method} is a {kind} method and cannot take a {shape} handler or call")]
    KindMismatch {
        method: String,
        kind: MethodKind,
        shape: CallShape,
    },

    /// An endpoint with the same name is already registered.
    #[error("endpoint {0} is already registered")]
    DuplicateEndpoint(String),

    /// Input or result failed its declared schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Error raised by a handler, passed through untouched.
    #[error(transparent)]
    Handler(BoxError),
}

impl EndpointError {
    /// The handler's own error, when this is a handler failure.
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            EndpointError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Take ownership of the handler's own error.
    pub fn into_handler_error(self) -> Option<BoxError> {
        match self {
            EndpointError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EndpointError>;
