use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rpcprims_schema::EndpointSchema;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MethodOutput<'a> {
    name: &'a str,
    kind: &'static str,
}

#[derive(Serialize)]
struct EndpointOutput<'a> {
    name: &'a str,
    path: &'a str,
    methods: Vec<MethodOutput<'a>>,
}

impl<'a> From<&'a EndpointSchema> for EndpointOutput<'a> {
    fn from(schema: &'a EndpointSchema) -> Self {
        Self {
            name: schema.name(),
            path: schema.path(),
            methods: schema
                .methods()
                .iter()
                .map(|(name, method)| MethodOutput {
                    name,
                    kind: method.kind().as_str(),
                })
                .collect(),
        }
    }
}

pub fn print_endpoints(schemas: &[EndpointSchema], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<EndpointOutput<'_>> = schemas.iter().map(EndpointOutput::from).collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "PATH", "METHOD", "KIND"]);
            for schema in schemas {
                if schema.methods().is_empty() {
                    table.add_row(vec![schema.name(), schema.path(), "-", "-"]);
                }
                for (name, method) in schema.methods() {
                    table.add_row(vec![
                        schema.name(),
                        schema.path(),
                        name.as_str(),
                        method.kind().as_str(),
                    ]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for schema in schemas {
                println!("{} {}", schema.name(), schema.path());
                for (name, method) in schema.methods() {
                    println!("  {name} ({})", method.kind());
                }
            }
        }
    }
}

#[derive(Serialize)]
pub struct ValidationReport<'a> {
    pub endpoint: &'a str,
    pub method: &'a str,
    pub target: &'static str,
    pub valid: bool,
}

pub fn print_validation(report: &ValidationReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ENDPOINT", "METHOD", "TARGET", "VALID"])
                .add_row(vec![
                    report.endpoint.to_string(),
                    report.method.to_string(),
                    report.target.to_string(),
                    report.valid.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}.{} {}: {}",
                report.endpoint,
                report.method,
                report.target,
                if report.valid { "valid" } else { "invalid" }
            );
        }
    }
}

/// Print one call result, or one stream element.
pub fn print_value(method: &str, value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "RESULT"])
                .add_row(vec![method.to_string(), value.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{method} -> {value}");
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
