//! In-process calls against an [`Endpoint`].
//!
//! A [`LocalClient`] holds an endpoint and an execution context and exposes
//! each method as a callable. Parameters are handed to handlers as-is; schema
//! validation belongs to whatever transport sits in front of a real network
//! boundary. Handler errors come back untouched inside
//! [`EndpointError::Handler`].

use std::collections::BTreeMap;
use std::sync::Arc;

use rpcprims_schema::MethodKind;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::endpoint::Endpoint;
use crate::error::{EndpointError, Result};
use crate::registry::EndpointRegistry;
use crate::stream::LocalStream;

/// Direct, in-process caller for one endpoint.
pub struct LocalClient<C> {
    endpoint: Arc<Endpoint<C>>,
    context: C,
}

impl<C> LocalClient<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(endpoint: Arc<Endpoint<C>>, context: C) -> Self {
        Self { endpoint, context }
    }

    /// Client for a registered endpoint, or `None` if `name` is not registered.
    pub fn from_registry(registry: &EndpointRegistry<C>, name: &str, context: C) -> Option<Self> {
        registry
            .get(name)
            .map(|endpoint| Self::new(endpoint, context))
    }

    pub fn endpoint(&self) -> &Arc<Endpoint<C>> {
        &self.endpoint
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Call a Query or Mutation method and wait for its result.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        call_unary(&self.endpoint, method, params, self.context.clone()).await
    }

    /// Start a Stream method.
    ///
    /// With `cancel` set to `None` the stream gets a fresh token that nobody
    /// else holds, so it runs until the handler finishes.
    pub fn stream(
        &self,
        method: &str,
        params: Value,
        cancel: Option<CancellationToken>,
    ) -> Result<LocalStream> {
        start_stream(
            &self.endpoint,
            method,
            params,
            self.context.clone(),
            cancel,
        )
    }

    /// Callable for one method, shaped by its kind.
    pub fn method(&self, name: &str) -> Option<LocalMethod<C>> {
        let descriptor = self.endpoint.method(name)?;
        Some(LocalMethod::new(
            descriptor.kind(),
            Arc::clone(&self.endpoint),
            name.to_string(),
            self.context.clone(),
        ))
    }

    /// Callables for every declared method, keyed by method name.
    pub fn methods(&self) -> BTreeMap<String, LocalMethod<C>> {
        self.endpoint
            .methods()
            .iter()
            .map(|(name, descriptor)| {
                let method = LocalMethod::new(
                    descriptor.kind(),
                    Arc::clone(&self.endpoint),
                    name.clone(),
                    self.context.clone(),
                );
                (name.clone(), method)
            })
            .collect()
    }
}

impl<C: Clone> Clone for LocalClient<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: Arc::clone(&self.endpoint),
            context: self.context.clone(),
        }
    }
}

/// One endpoint method bound to a context, ready to call.
pub enum LocalMethod<C> {
    Query(UnaryCall<C>),
    Mutation(UnaryCall<C>),
    Stream(StreamCall<C>),
}

impl<C> LocalMethod<C> {
    fn new(kind: MethodKind, endpoint: Arc<Endpoint<C>>, method: String, context: C) -> Self {
        match kind {
            MethodKind::Query => LocalMethod::Query(UnaryCall {
                endpoint,
                method,
                context,
            }),
            MethodKind::Mutation => LocalMethod::Mutation(UnaryCall {
                endpoint,
                method,
                context,
            }),
            MethodKind::Stream => LocalMethod::Stream(StreamCall {
                endpoint,
                method,
                context,
            }),
        }
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            LocalMethod::Query(_) => MethodKind::Query,
            LocalMethod::Mutation(_) => MethodKind::Mutation,
            LocalMethod::Stream(_) => MethodKind::Stream,
        }
    }

    /// The unary callable, for Query and Mutation methods.
    pub fn as_unary(&self) -> Option<&UnaryCall<C>> {
        match self {
            LocalMethod::Query(call) | LocalMethod::Mutation(call) => Some(call),
            LocalMethod::Stream(_) => None,
        }
    }

    /// The stream callable, for Stream methods.
    pub fn as_stream(&self) -> Option<&StreamCall<C>> {
        match self {
            LocalMethod::Stream(call) => Some(call),
            LocalMethod::Query(_) | LocalMethod::Mutation(_) => None,
        }
    }
}

/// `(params) -> result` for a Query or Mutation method.
pub struct UnaryCall<C> {
    endpoint: Arc<Endpoint<C>>,
    method: String,
    context: C,
}

impl<C> UnaryCall<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn method(&self) -> &str {
        &self.method
    }

    pub async fn invoke(&self, params: Value) -> Result<Value> {
        call_unary(&self.endpoint, &self.method, params, self.context.clone()).await
    }
}

/// `(params, token) -> results` for a Stream method.
pub struct StreamCall<C> {
    endpoint: Arc<Endpoint<C>>,
    method: String,
    context: C,
}

impl<C> StreamCall<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn invoke(&self, params: Value, cancel: Option<CancellationToken>) -> Result<LocalStream> {
        start_stream(
            &self.endpoint,
            &self.method,
            params,
            self.context.clone(),
            cancel,
        )
    }
}

async fn call_unary<C>(
    endpoint: &Endpoint<C>,
    method: &str,
    params: Value,
    context: C,
) -> Result<Value> {
    tracing::trace!(endpoint = endpoint.name(), method, "local call");
    let pending = endpoint.require(method)?.execute_unary(params, context)?;
    pending.await.map_err(EndpointError::Handler)
}

fn start_stream<C>(
    endpoint: &Endpoint<C>,
    method: &str,
    params: Value,
    context: C,
    cancel: Option<CancellationToken>,
) -> Result<LocalStream> {
    tracing::trace!(endpoint = endpoint.name(), method, "local stream");
    let token = cancel.unwrap_or_default();
    let inner = endpoint
        .require(method)?
        .execute_stream(params, context, token.clone())?;
    Ok(LocalStream::new(
        inner,
        token,
        format!("{}.{method}", endpoint.name()),
    ))
}
