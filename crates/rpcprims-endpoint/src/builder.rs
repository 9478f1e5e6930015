use std::collections::{BTreeMap, HashMap};
use std::future::Future;

use futures_core::Stream;
use rpcprims_schema::EndpointSchema;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::endpoint::{Endpoint, MethodDescriptor};
use crate::error::{EndpointError, Result};
use crate::handler::{Handler, HandlerResult};

/// Handlers keyed by method name, to be bound to a schema.
pub struct Implementation<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C: 'static> Implementation<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Add or replace the handler for `method`.
    pub fn with_handler(mut self, method: impl Into<String>, handler: Handler<C>) -> Self {
        self.handlers.insert(method.into(), handler);
        self
    }

    /// Add an async unary handler for a Query or Mutation method.
    pub fn unary<F, Fut>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.with_handler(method, Handler::unary(handler))
    }

    /// Add a stream handler for a Stream method.
    pub fn stream<F, S>(self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, C, CancellationToken) -> S + Send + Sync + 'static,
        S: Stream<Item = HandlerResult> + Send + 'static,
    {
        self.with_handler(method, Handler::stream(handler))
    }

    pub fn handler(&self, method: &str) -> Option<&Handler<C>> {
        self.handlers.get(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C: 'static> Default for Implementation<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Bind `implementation` to `schema`.
///
/// Every schema method gets a descriptor carrying the schema's kind and
/// validators. Handlers for undeclared methods are ignored. A declared method
/// without a handler is allowed; calling it fails with
/// [`EndpointError::MissingHandler`]. A handler whose shape does not fit the
/// method kind is rejected with [`EndpointError::KindMismatch`].
pub fn build_endpoint<C>(
    schema: &EndpointSchema,
    implementation: &Implementation<C>,
) -> Result<Endpoint<C>> {
    let mut methods = BTreeMap::new();

    for (name, method) in schema.methods() {
        let handler = implementation.handlers.get(name).cloned();

        if let Some(handler) = &handler {
            if !handler.accepts(method.kind()) {
                return Err(EndpointError::KindMismatch {
                    method: format!("{}.{name}", schema.name()),
                    kind: method.kind(),
                    shape: handler.shape(),
                });
            }
        } else {
            tracing::warn!(
                endpoint = schema.name(),
                method = %name,
                "schema method has no handler; calls will fail"
            );
        }

        methods.insert(
            name.clone(),
            MethodDescriptor::new(
                schema.name(),
                name,
                method.kind(),
                method.input().clone(),
                method.result().clone(),
                handler,
            ),
        );
    }

    for name in implementation.handlers.keys() {
        if schema.method(name).is_none() {
            tracing::debug!(
                endpoint = schema.name(),
                method = %name,
                "ignoring handler for undeclared method"
            );
        }
    }

    tracing::debug!(
        endpoint = schema.name(),
        path = schema.path(),
        methods = methods.len(),
        "built endpoint"
    );

    Ok(Endpoint::from_parts(
        schema.name().to_string(),
        schema.path().to_string(),
        methods,
    ))
}

/// Like [`build_endpoint`], but every schema method must have a handler.
pub fn build_endpoint_strict<C>(
    schema: &EndpointSchema,
    implementation: &Implementation<C>,
) -> Result<Endpoint<C>> {
    if let Some(missing) = schema
        .methods()
        .keys()
        .find(|name| !implementation.handlers.contains_key(name.as_str()))
    {
        return Err(EndpointError::MissingHandler {
            endpoint: schema.name().to_string(),
            method: missing.clone(),
        });
    }

    build_endpoint(schema, implementation)
}

#[cfg(test)]
mod tests {
    use rpcprims_schema::{MethodKind, MethodSchema, SchemaValidator};
    use serde_json::json;

    use super::*;
    use crate::handler::{BoxError, CallShape};

    fn greeter_schema() -> EndpointSchema {
        EndpointSchema::from_json(
            r#"{
                "name": "greeter",
                "path": "/rpc/greeter",
                "methods": {
                    "hello": {
                        "kind": "query",
                        "input": { "type": "object", "required": ["message"] },
                        "result": { "type": "object", "required": ["response"] }
                    },
                    "rename": { "kind": "mutation" },
                    "count": { "kind": "stream" }
                }
            }"#,
        )
        .unwrap()
    }

    fn greeter_impl() -> Implementation<()> {
        Implementation::new()
            .unary("hello", |input, _ctx| async move {
                let message = input["message"].as_str().unwrap_or_default().to_string();
                Ok(json!({ "response": format!("Hello {message}") }))
            })
            .unary("rename", |_input, _ctx| async move { Ok(json!(null)) })
            .stream("count", |_input, _ctx, _token| {
                async_stream::stream! {
                    yield Ok::<Value, BoxError>(json!({ "number": 0 }));
                }
            })
    }

    #[test]
    fn descriptors_mirror_schema_and_implementation() {
        let schema = greeter_schema();
        let implementation = greeter_impl();
        let endpoint = build_endpoint(&schema, &implementation).unwrap();

        assert_eq!(endpoint.name(), "greeter");
        assert_eq!(endpoint.path(), "/rpc/greeter");
        assert_eq!(endpoint.method_names(), schema.method_names());

        for (name, declared) in schema.methods() {
            let built = endpoint.method(name).unwrap();
            assert_eq!(built.kind(), declared.kind());
            assert!(built.input_validator().ptr_eq(declared.input()));
            assert!(built.result_validator().ptr_eq(declared.result()));
            assert!(built
                .handler()
                .unwrap()
                .ptr_eq(implementation.handler(name).unwrap()));
        }
    }

    #[test]
    fn empty_schema_builds_empty_endpoint() {
        let schema = EndpointSchema::new("empty", "/empty");
        let endpoint = build_endpoint(&schema, &greeter_impl()).unwrap();

        assert!(endpoint.methods().is_empty());
    }

    #[test]
    fn extra_handlers_are_ignored() {
        let schema = EndpointSchema::new("greeter", "/rpc/greeter").with_method(
            "hello",
            MethodSchema::query(SchemaValidator::accept_all(), SchemaValidator::accept_all()),
        );
        let endpoint = build_endpoint(&schema, &greeter_impl()).unwrap();

        assert_eq!(endpoint.method_names(), vec!["hello"]);
        assert!(endpoint.method("count").is_none());
    }

    #[test]
    fn missing_handler_is_allowed_but_recorded() {
        let implementation = Implementation::new().unary("hello", |input, _ctx: ()| async move {
            Ok(input)
        });
        let endpoint = build_endpoint(&greeter_schema(), &implementation).unwrap();

        assert_eq!(endpoint.missing_handlers(), vec!["count", "rename"]);
        assert!(matches!(
            endpoint.require("rename").unwrap().execute_unary(json!({}), ()),
            Err(EndpointError::MissingHandler { ref method, .. }) if method == "rename"
        ));
    }

    #[test]
    fn strict_build_rejects_missing_handler() {
        let implementation = Implementation::new().unary("hello", |input, _ctx: ()| async move {
            Ok(input)
        });

        assert!(matches!(
            build_endpoint_strict(&greeter_schema(), &implementation),
            Err(EndpointError::MissingHandler { ref method, .. }) if method == "count"
        ));
        assert!(build_endpoint_strict(&greeter_schema(), &greeter_impl()).is_ok());
    }

    #[test]
    fn handler_shape_must_fit_kind() {
        let implementation = greeter_impl().unary("count", |input, _ctx| async move { Ok(input) });

        assert!(matches!(
            build_endpoint(&greeter_schema(), &implementation),
            Err(EndpointError::KindMismatch {
                kind: MethodKind::Stream,
                shape: CallShape::Unary,
                ..
            })
        ));
    }

    #[test]
    fn building_twice_gives_equal_endpoints() {
        let schema = greeter_schema();
        let implementation = greeter_impl();

        let first = build_endpoint(&schema, &implementation).unwrap();
        let second = build_endpoint(&schema, &implementation).unwrap();
        assert_eq!(first, second);
    }
}
