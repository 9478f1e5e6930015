use rpcprims_schema::{load_file, SchemaConfig};
use serde_json::Value;

use crate::cmd::ValidateArgs;
use crate::exit::{schema_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_validation, OutputFormat, ValidationReport};

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SchemaConfig {
        strict_mode: args.strict,
        ..SchemaConfig::default()
    };
    let schema = load_file(&args.file, &config).map_err(|err| schema_error("load failed", err))?;

    let method = schema.method(&args.method).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!(
                "endpoint {} has no method {}",
                schema.name(),
                args.method
            ),
        )
    })?;

    let payload: Value = serde_json::from_str(&args.json)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid JSON payload: {err}")))?;

    let (label, validator) = if args.result {
        ("result", method.result())
    } else {
        ("input", method.input())
    };
    let target = format!("{}.{} {label}", schema.name(), args.method);
    validator
        .validate(&target, &payload)
        .map_err(|err| schema_error("payload rejected", err))?;

    let report = ValidationReport {
        endpoint: schema.name(),
        method: &args.method,
        target: label,
        valid: true,
    };
    print_validation(&report, format);
    Ok(SUCCESS)
}
