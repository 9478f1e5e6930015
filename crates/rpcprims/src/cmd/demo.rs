use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rpcprims_endpoint::{
    build_endpoint_strict, BoxError, CancellationToken, Endpoint, EndpointRegistry,
    Implementation, LocalClient,
};
use rpcprims_schema::EndpointSchema;
use serde_json::{json, Value};

use crate::cmd::{parse_duration, CountArgs, DemoCommand, HelloArgs};
use crate::exit::{endpoint_error, schema_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_value, OutputFormat};

const GREETER: &str = "greeter";

const GREETER_SCHEMA: &str = r#"{
    "name": "greeter",
    "path": "/rpc/greeter",
    "methods": {
        "hello": {
            "kind": "query",
            "input": {
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            },
            "result": {
                "type": "object",
                "properties": { "response": { "type": "string" } },
                "required": ["response"]
            }
        },
        "count": {
            "kind": "stream",
            "input": {
                "type": "object",
                "properties": {
                    "count": { "type": "integer", "minimum": 0 },
                    "interval_ms": { "type": "integer", "minimum": 0 }
                },
                "required": ["count"]
            },
            "result": {
                "type": "object",
                "properties": { "number": { "type": "integer" } },
                "required": ["number"]
            }
        }
    }
}"#;

#[derive(Clone)]
struct DemoContext {
    greeting: Arc<str>,
}

impl Default for DemoContext {
    fn default() -> Self {
        Self {
            greeting: Arc::from("Hello"),
        }
    }
}

pub fn run(command: DemoCommand, format: OutputFormat) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;

    let registry = EndpointRegistry::new();
    registry
        .register(greeter()?)
        .map_err(|err| endpoint_error("register failed", err))?;
    let client = LocalClient::from_registry(&registry, GREETER, DemoContext::default())
        .ok_or_else(|| CliError::new(INTERNAL, "greeter endpoint is not registered"))?;

    match command {
        DemoCommand::Hello(args) => runtime.block_on(hello(&client, args, format)),
        DemoCommand::Count(args) => runtime.block_on(count(&client, args, format)),
    }
}

fn greeter() -> CliResult<Arc<Endpoint<DemoContext>>> {
    let schema = EndpointSchema::from_json(GREETER_SCHEMA)
        .map_err(|err| schema_error("greeter schema", err))?;

    let implementation = Implementation::new()
        .unary("hello", |input: Value, ctx: DemoContext| async move {
            let message = input
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(json!({ "response": format!("{} {message}", ctx.greeting) }))
        })
        .stream(
            "count",
            |input: Value, _ctx: DemoContext, token: CancellationToken| {
                let count = input.get("count").and_then(Value::as_u64).unwrap_or(0);
                let interval = Duration::from_millis(
                    input.get("interval_ms").and_then(Value::as_u64).unwrap_or(0),
                );
                async_stream::stream! {
                    for number in 0..count {
                        if number > 0 && !interval.is_zero() {
                            tokio::select! {
                                _ = token.cancelled() => break,
                                _ = tokio::time::sleep(interval) => {}
                            }
                        }
                        if token.is_cancelled() {
                            break;
                        }
                        yield Ok::<Value, BoxError>(json!({ "number": number }));
                    }
                }
            },
        );

    let endpoint = build_endpoint_strict(&schema, &implementation)
        .map_err(|err| endpoint_error("greeter build failed", err))?;
    Ok(Arc::new(endpoint))
}

async fn hello(
    client: &LocalClient<DemoContext>,
    args: HelloArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let params = json!({ "message": args.message });
    check_input(client, "hello", &params)?;

    let result = client
        .call("hello", params)
        .await
        .map_err(|err| endpoint_error("hello failed", err))?;
    print_value("greeter.hello", &result, format);
    Ok(SUCCESS)
}

async fn count(
    client: &LocalClient<DemoContext>,
    args: CountArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let interval = parse_duration(&args.interval)?;
    let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    let params = json!({ "count": args.count, "interval_ms": interval_ms });
    check_input(client, "count", &params)?;

    let token = CancellationToken::new();
    install_ctrlc_handler(token.clone())?;

    let mut stream = client
        .stream("count", params, Some(token.clone()))
        .map_err(|err| endpoint_error("count failed", err))?;

    let mut received = 0usize;
    loop {
        if args.cancel_after.is_some_and(|limit| received >= limit) {
            token.cancel();
        }
        let Some(item) = stream.next().await else {
            break;
        };
        let value = item.map_err(|err| endpoint_error("count failed", err))?;
        print_value("greeter.count", &value, format);
        received = received.saturating_add(1);
    }

    if token.is_cancelled() {
        tracing::info!(received, "stream cancelled");
    }
    Ok(SUCCESS)
}

fn check_input(client: &LocalClient<DemoContext>, method: &str, params: &Value) -> CliResult<()> {
    client
        .endpoint()
        .require(method)
        .and_then(|descriptor| descriptor.validate_input(params))
        .map_err(|err| endpoint_error("invalid params", err))
}

fn install_ctrlc_handler(token: CancellationToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        token.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::DATA_INVALID;

    fn client() -> LocalClient<DemoContext> {
        LocalClient::new(greeter().unwrap(), DemoContext::default())
    }

    #[tokio::test]
    async fn hello_greets_with_context() {
        let out = client()
            .call("hello", json!({ "message": "world" }))
            .await
            .unwrap();
        assert_eq!(out, json!({ "response": "Hello world" }));

        let custom = LocalClient::new(
            greeter().unwrap(),
            DemoContext {
                greeting: Arc::from("Hi"),
            },
        );
        let out = custom.call("hello", json!({ "message": "there" })).await.unwrap();
        assert_eq!(out, json!({ "response": "Hi there" }));
    }

    #[tokio::test]
    async fn count_results_match_declared_schema() {
        let client = client();
        let descriptor = client.endpoint().require("count").unwrap();
        let items: Vec<Value> = client
            .stream("count", json!({ "count": 3 }), None)
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(items.len(), 3);
        for item in &items {
            assert!(descriptor.validate_result(item).is_ok());
        }
    }

    #[tokio::test]
    async fn count_interval_wakes_on_cancel() {
        let token = CancellationToken::new();
        let mut stream = client()
            .stream(
                "count",
                json!({ "count": 5, "interval_ms": 60_000 }),
                Some(token.clone()),
            )
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), json!({ "number": 0 }));
        token.cancel();
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn bad_params_are_data_invalid() {
        let err = check_input(&client(), "hello", &json!({})).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
