//! Schema-bound RPC endpoints with an in-process client.
//!
//! rpcprims describes RPC endpoints as JSON documents, binds them to handler
//! implementations, keeps them in a registry, and calls them directly in the
//! same process, streams included.
//!
//! # Crate Structure
//!
//! - [`schema`]: endpoint documents, method kinds, compiled JSON Schema validators
//! - [`endpoint`]: endpoint builder, registry, local client, cancellable streams

/// Re-export schema types.
pub mod schema {
    pub use rpcprims_schema::*;
}

/// Re-export endpoint types.
pub mod endpoint {
    pub use rpcprims_endpoint::*;
}
