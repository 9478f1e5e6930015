//! Schema-bound RPC endpoints for in-process and transport use.
//!
//! An [`Endpoint`] pairs each method of an [`EndpointSchema`] with a handler.
//! Endpoints are stored in an [`EndpointRegistry`] and can be called directly
//! through a [`LocalClient`], which adapts stream methods to a cancellable
//! [`LocalStream`].
//!
//! [`EndpointSchema`]: rpcprims_schema::EndpointSchema

pub mod builder;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod registry;
pub mod stream;

pub use builder::{build_endpoint, build_endpoint_strict, Implementation};
pub use client::{LocalClient, LocalMethod, StreamCall, UnaryCall};
pub use config::{DuplicatePolicy, RegistryConfig};
pub use endpoint::{Endpoint, MethodDescriptor};
pub use error::{EndpointError, Result};
pub use handler::{BoxError, BoxFuture, BoxStream, CallShape, Handler, HandlerResult};
pub use registry::EndpointRegistry;
pub use stream::LocalStream;

pub use rpcprims_schema::MethodKind;
pub use tokio_util::sync::CancellationToken;
