use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use rpcprims_schema::MethodKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Error type handlers return. Passed to callers without translation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Boxed future produced by unary handlers.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Boxed stream produced by stream handlers.
pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Outcome of one handler call, or one stream element.
pub type HandlerResult = std::result::Result<Value, BoxError>;

type UnaryFn<C> = dyn Fn(Value, C) -> BoxFuture<HandlerResult> + Send + Sync;
type StreamFn<C> = dyn Fn(Value, C, CancellationToken) -> BoxStream<HandlerResult> + Send + Sync;

/// Calling convention a handler or call site uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// One request, one response. Used by Query and Mutation.
    Unary,
    /// One request, a sequence of responses. Used by Stream.
    Stream,
}

impl CallShape {
    /// Calling convention a method kind requires.
    pub fn of(kind: MethodKind) -> Self {
        match kind {
            MethodKind::Query | MethodKind::Mutation => CallShape::Unary,
            MethodKind::Stream => CallShape::Stream,
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallShape::Unary => f.write_str("unary"),
            CallShape::Stream => f.write_str("stream"),
        }
    }
}

/// Executable body of an endpoint method.
///
/// `C` is the host's execution context. It is cloned into every call and
/// never inspected here.
pub enum Handler<C> {
    /// `(input, ctx) -> result`, for Query and Mutation methods.
    Unary(Arc<UnaryFn<C>>),
    /// `(input, ctx, token) -> results`, for Stream methods. The stream should
    /// end on its own once it sees `token` cancelled.
    Stream(Arc<StreamFn<C>>),
}

impl<C: 'static> Handler<C> {
    /// Wrap an async function as a unary handler.
    pub fn unary<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let call = move |input: Value, ctx: C| -> BoxFuture<HandlerResult> {
            Box::pin(handler(input, ctx))
        };
        Handler::Unary(Arc::new(call))
    }

    /// Wrap an async function over typed input and output as a unary handler.
    ///
    /// Input that does not deserialize into `T` is reported as the handler's
    /// own error.
    pub fn typed_unary<T, R, E, F, Fut>(handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<BoxError> + 'static,
        F: Fn(T, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
    {
        Self::unary(move |input: Value, ctx: C| {
            let pending = serde_json::from_value::<T>(input).map(|parsed| handler(parsed, ctx));
            async move {
                let output = pending?.await.map_err(|err| -> BoxError { err.into() })?;
                Ok::<Value, BoxError>(serde_json::to_value(output)?)
            }
        })
    }

    /// Wrap a stream-producing function as a stream handler.
    pub fn stream<F, S>(handler: F) -> Self
    where
        F: Fn(Value, C, CancellationToken) -> S + Send + Sync + 'static,
        S: Stream<Item = HandlerResult> + Send + 'static,
    {
        let call = move |input: Value,
                         ctx: C,
                         token: CancellationToken|
              -> BoxStream<HandlerResult> { Box::pin(handler(input, ctx, token)) };
        Handler::Stream(Arc::new(call))
    }
}

impl<C> Handler<C> {
    pub fn shape(&self) -> CallShape {
        match self {
            Handler::Unary(_) => CallShape::Unary,
            Handler::Stream(_) => CallShape::Stream,
        }
    }

    /// True when this handler can serve a method of `kind`.
    pub fn accepts(&self, kind: MethodKind) -> bool {
        self.shape() == CallShape::of(kind)
    }

    /// True when both values refer to the same handler function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Handler::Unary(a), Handler::Unary(b)) => Arc::ptr_eq(a, b),
            (Handler::Stream(a), Handler::Stream(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        match self {
            Handler::Unary(call) => Handler::Unary(Arc::clone(call)),
            Handler::Stream(call) => Handler::Stream(Arc::clone(call)),
        }
    }
}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.shape()).finish()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct HelloInput {
        message: String,
    }

    #[derive(Serialize)]
    struct HelloOutput {
        response: String,
    }

    #[test]
    fn shape_follows_kind() {
        assert_eq!(CallShape::of(MethodKind::Query), CallShape::Unary);
        assert_eq!(CallShape::of(MethodKind::Mutation), CallShape::Unary);
        assert_eq!(CallShape::of(MethodKind::Stream), CallShape::Stream);

        let unary = Handler::<()>::unary(|input, _ctx| async move { Ok(input) });
        assert!(unary.accepts(MethodKind::Query));
        assert!(unary.accepts(MethodKind::Mutation));
        assert!(!unary.accepts(MethodKind::Stream));
    }

    #[test]
    fn clones_keep_identity() {
        let handler = Handler::<()>::unary(|input, _ctx| async move { Ok(input) });
        let other = Handler::<()>::unary(|input, _ctx| async move { Ok(input) });

        assert!(handler.ptr_eq(&handler.clone()));
        assert!(!handler.ptr_eq(&other));
    }

    #[tokio::test]
    async fn unary_handler_receives_context() {
        let handler = Handler::<String>::unary(|input, ctx| async move {
            Ok(json!({ "echo": input, "ctx": ctx }))
        });
        let Handler::Unary(call) = handler else {
            panic!("expected unary handler");
        };

        let out = call(json!(1), "host".to_string()).await.unwrap();
        assert_eq!(out, json!({ "echo": 1, "ctx": "host" }));
    }

    #[tokio::test]
    async fn typed_unary_round_trips_through_serde() {
        let handler = Handler::<()>::typed_unary(|input: HelloInput, _ctx| async move {
            Ok::<_, BoxError>(HelloOutput {
                response: format!("Hello {}", input.message),
            })
        });
        let Handler::Unary(call) = handler else {
            panic!("expected unary handler");
        };

        let out = call(json!({ "message": "world" }), ()).await.unwrap();
        assert_eq!(out, json!({ "response": "Hello world" }));

        let err = call(json!({ "wrong": true }), ()).await.unwrap_err();
        assert!(err.downcast_ref::<serde_json::Error>().is_some());
    }

    #[tokio::test]
    async fn stream_handler_yields_in_order() {
        let handler = Handler::<()>::stream(|input, _ctx, _token| {
            let count = input["count"].as_u64().unwrap_or(0);
            async_stream::stream! {
                for number in 0..count {
                    yield Ok::<Value, BoxError>(json!({ "number": number }));
                }
            }
        });
        let Handler::Stream(call) = handler else {
            panic!("expected stream handler");
        };

        let items: Vec<Value> = call(json!({ "count": 3 }), (), CancellationToken::new())
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(
            items,
            vec![json!({"number": 0}), json!({"number": 1}), json!({"number": 2})]
        );
    }
}
