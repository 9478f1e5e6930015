use std::collections::BTreeMap;
use std::fmt;

use rpcprims_schema::{MethodKind, SchemaValidator};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{EndpointError, Result};
use crate::handler::{BoxFuture, BoxStream, CallShape, Handler, HandlerResult};

/// One method of an [`Endpoint`]: kind and validators from the schema,
/// paired with the handler that executes it.
pub struct MethodDescriptor<C> {
    endpoint: String,
    name: String,
    kind: MethodKind,
    input: SchemaValidator,
    result: SchemaValidator,
    handler: Option<Handler<C>>,
}

impl<C> MethodDescriptor<C> {
    pub(crate) fn new(
        endpoint: &str,
        name: &str,
        kind: MethodKind,
        input: SchemaValidator,
        result: SchemaValidator,
        handler: Option<Handler<C>>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            name: name.to_string(),
            kind,
            input,
            result,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calling convention transports must use for this method.
    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn input_validator(&self) -> &SchemaValidator {
        &self.input
    }

    pub fn result_validator(&self) -> &SchemaValidator {
        &self.result
    }

    /// Handler bound to this method, if the implementation supplied one.
    pub fn handler(&self) -> Option<&Handler<C>> {
        self.handler.as_ref()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Check call parameters against the declared input schema.
    pub fn validate_input(&self, input: &Value) -> Result<()> {
        let target = format!("{}.{} input", self.endpoint, self.name);
        Ok(self.input.validate(&target, input)?)
    }

    /// Check one result (one element, for streams) against the declared result schema.
    pub fn validate_result(&self, result: &Value) -> Result<()> {
        let target = format!("{}.{} result", self.endpoint, self.name);
        Ok(self.result.validate(&target, result)?)
    }

    fn require_shape(&self, shape: CallShape) -> Result<&Handler<C>> {
        if CallShape::of(self.kind) != shape {
            return Err(self.shape_mismatch(shape));
        }

        self.handler
            .as_ref()
            .ok_or_else(|| EndpointError::MissingHandler {
                endpoint: self.endpoint.clone(),
                method: self.name.clone(),
            })
    }

    /// Start a Query or Mutation call. Parameters are not validated.
    pub fn execute_unary(&self, input: Value, ctx: C) -> Result<BoxFuture<HandlerResult>> {
        match self.require_shape(CallShape::Unary)? {
            Handler::Unary(call) => Ok(call(input, ctx)),
            Handler::Stream(_) => Err(self.shape_mismatch(CallShape::Stream)),
        }
    }

    /// Start a Stream call. Parameters are not validated.
    pub fn execute_stream(
        &self,
        input: Value,
        ctx: C,
        token: CancellationToken,
    ) -> Result<BoxStream<HandlerResult>> {
        match self.require_shape(CallShape::Stream)? {
            Handler::Stream(call) => Ok(call(input, ctx, token)),
            Handler::Unary(_) => Err(self.shape_mismatch(CallShape::Unary)),
        }
    }

    fn shape_mismatch(&self, shape: CallShape) -> EndpointError {
        EndpointError::KindMismatch {
            method: format!("{}.{}", self.endpoint, self.name),
            kind: self.kind,
            shape,
        }
    }
}

impl<C> PartialEq for MethodDescriptor<C> {
    fn eq(&self, other: &Self) -> bool {
        let same_handler = match (&self.handler, &other.handler) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        self.endpoint == other.endpoint
            && self.name == other.name
            && self.kind == other.kind
            && self.input == other.input
            && self.result == other.result
            && same_handler
    }
}

impl<C> fmt::Debug for MethodDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("input", &self.input)
            .field("result", &self.result)
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

/// A named, pathed set of executable methods.
///
/// Built once by [`build_endpoint`](crate::build_endpoint) and read-only
/// afterwards. Share it behind an `Arc`.
pub struct Endpoint<C> {
    name: String,
    path: String,
    methods: BTreeMap<String, MethodDescriptor<C>>,
}

impl<C> Endpoint<C> {
    pub(crate) fn from_parts(
        name: String,
        path: String,
        methods: BTreeMap<String, MethodDescriptor<C>>,
    ) -> Self {
        Self {
            name,
            path,
            methods,
        }
    }

    /// Unique endpoint name, the registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing hint for transports.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &BTreeMap<String, MethodDescriptor<C>> {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor<C>> {
        self.methods.get(name)
    }

    /// Like [`method`](Self::method), but a miss is an `UnknownMethod` error.
    pub fn require(&self, name: &str) -> Result<&MethodDescriptor<C>> {
        self.methods
            .get(name)
            .ok_or_else(|| EndpointError::UnknownMethod {
                endpoint: self.name.clone(),
                method: name.to_string(),
            })
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Declared methods that have no handler, sorted by name.
    pub fn missing_handlers(&self) -> Vec<&str> {
        self.methods
            .values()
            .filter(|method| !method.has_handler())
            .map(MethodDescriptor::name)
            .collect()
    }
}

impl<C> PartialEq for Endpoint<C> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.path == other.path && self.methods == other.methods
    }
}

impl<C> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .finish()
    }
}
