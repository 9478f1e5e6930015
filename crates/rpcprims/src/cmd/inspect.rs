use rpcprims_schema::{load_directory, load_file, SchemaConfig};

use crate::cmd::InspectArgs;
use crate::exit::{io_error, schema_error, CliResult, SUCCESS};
use crate::output::{print_endpoints, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SchemaConfig {
        strict_mode: args.strict,
        ..SchemaConfig::default()
    };

    let metadata = std::fs::metadata(&args.path)
        .map_err(|err| io_error(&format!("cannot read {}", args.path.display()), err))?;

    let schemas = if metadata.is_dir() {
        load_directory(&args.path, &config).map_err(|err| schema_error("load failed", err))?
    } else {
        vec![load_file(&args.path, &config).map_err(|err| schema_error("load failed", err))?]
    };

    tracing::debug!(
        path = %args.path.display(),
        endpoints = schemas.len(),
        "loaded endpoint schemas"
    );

    print_endpoints(&schemas, format);
    Ok(SUCCESS)
}
