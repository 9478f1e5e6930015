use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod demo;
pub mod inspect;
pub mod validate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List endpoints and methods from a schema file or directory.
    Inspect(InspectArgs),
    /// Validate a JSON payload against a method schema.
    Validate(ValidateArgs),
    /// Call the built-in greeter endpoint through the local client.
    #[command(subcommand)]
    Demo(DemoCommand),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Inspect(args) => inspect::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Demo(command) => demo::run(command, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Endpoint schema file, or directory of *.endpoint.json files.
    pub path: PathBuf,
    /// Reject unknown properties in object schemas.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Endpoint schema file.
    pub file: PathBuf,
    /// Method whose schema to validate against.
    #[arg(long, short = 'm')]
    pub method: String,
    /// JSON payload.
    #[arg(long)]
    pub json: String,
    /// Validate against the result schema instead of the input schema.
    #[arg(long)]
    pub result: bool,
    /// Reject unknown properties in object schemas.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Subcommand, Debug)]
pub enum DemoCommand {
    /// Query: greet someone.
    Hello(HelloArgs),
    /// Stream: count upwards; Ctrl-C cancels.
    Count(CountArgs),
}

#[derive(Args, Debug)]
pub struct HelloArgs {
    /// Who to greet.
    #[arg(long, default_value = "world")]
    pub message: String,
}

#[derive(Args, Debug)]
pub struct CountArgs {
    /// Number of elements to stream.
    #[arg(long, default_value = "5")]
    pub count: u64,
    /// Delay between elements (e.g. 1s, 100ms).
    #[arg(long, default_value = "100ms")]
    pub interval: String,
    /// Cancel the stream after receiving N elements.
    #[arg(long, value_name = "N")]
    pub cancel_after: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `5s`, `500ms`, or a bare number of seconds. Zero is allowed.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
    }

    #[test]
    fn rejects_bad_durations() {
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("fast").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("-1s").unwrap_err().code, USAGE);
    }
}
