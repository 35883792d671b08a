//! hxenc CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: load the optional JSON config file and layer
//!    command line flags over it (see [`config`]).
//! 2. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` and either human-readable or JSON output on stderr.
//! 3. **Construct the host**: register the `json-enc` extension, build the
//!    HTTP transport and inject both into [`host::Host`].
//! 4. **Run the command**: `encode` assembles a request and prints it;
//!    `send` issues it and prints the decoded response.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use host::{ExtensionName, ExtensionRegistry, Host, HttpVerb, OutgoingRequest, Parameters, SourceElement};
use json_enc::{JsonEncExtension, NumberCoercion};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transport::HttpTransport;

use crate::config::{FileConfig, Overrides, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "hxenc",
    version,
    about = "Assemble and send hypermedia requests with JSON-encoded parameters",
    after_help = r#"EXAMPLES
  $ hxenc encode --param id=123 --param name=Alice --param score=99.5
  $ hxenc send --base-url http://127.0.0.1:9005/ --path /sets --param name=Chest
  $ hxenc --coercion leading-decimal encode --param score=99.5"#
)]
struct Cli {
    #[arg(long, global = true, help = "JSON config file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Base URL request paths are resolved against")]
    base_url: Option<String>,

    #[arg(
        long,
        global = true,
        help = "Numeric coercion: leading-integer (default) or leading-decimal"
    )]
    coercion: Option<NumberCoercion>,

    #[arg(
        long = "ext",
        global = true,
        value_name = "NAME",
        value_parser = parse_extension,
        help = "Active extension, replacing the configured set (repeatable; default json-enc)"
    )]
    extensions: Vec<ExtensionName>,

    #[arg(long, global = true, help = "Request timeout in seconds")]
    timeout_secs: Option<u64>,

    #[arg(long, global = true, value_enum, default_value = "text", help = "Log output format")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the configuration and encoding hooks and print the assembled request.
    Encode(RequestArgs),
    /// Assemble the request, send it and print the decoded response.
    Send(RequestArgs),
}

#[derive(Args, Debug)]
struct RequestArgs {
    #[arg(long, default_value = "post", help = "HTTP verb: get|post|put|patch|delete")]
    method: HttpVerb,

    #[arg(long, default_value = "/", help = "Request path, relative to the base URL")]
    path: String,

    #[arg(
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_param,
        help = "Request parameter (repeatable)"
    )]
    params: Vec<(String, String)>,

    #[arg(long, help = "Id of the triggering element, sent as HX-Trigger")]
    element_id: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, _)) if key.is_empty() => Err(format!("parameter '{raw}' has an empty key")),
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("parameter '{raw}' must be KEY=VALUE")),
    }
}

fn parse_extension(raw: &str) -> Result<ExtensionName, String> {
    ExtensionName::new(raw).ok_or_else(|| "extension name must not be empty".to_string())
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

fn build_host(settings: &Settings) -> Result<Host> {
    let mut registry = ExtensionRegistry::new();
    json_enc::register(&mut registry, JsonEncExtension::new(settings.coercion));
    let transport = HttpTransport::new(settings.timeout).context("building HTTP transport")?;
    Ok(Host::new(registry, Arc::new(transport), settings.host.clone()))
}

fn outgoing(args: RequestArgs) -> OutgoingRequest {
    let mut element = SourceElement::new("form");
    if let Some(id) = args.element_id {
        element = element.with_id(id);
    }
    OutgoingRequest::new(args.method, args.path, Parameters::from_pairs(args.params)).with_element(element)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let overrides = Overrides {
        base_url: cli.base_url,
        extensions: cli.extensions,
        coercion: cli.coercion,
        timeout_secs: cli.timeout_secs,
    };
    let settings = Settings::resolve(file, overrides)?;
    let host = build_host(&settings)?;
    info!(
        base_url = %settings.host.base_url,
        coercion = %settings.coercion,
        extensions = ?host.registry().names(),
        "Host ready"
    );

    match cli.command {
        Command::Encode(args) => {
            let prepared = host.prepare(outgoing(args))?;
            println!("{}", serde_json::to_string_pretty(&prepared)?);
        }
        Command::Send(args) => {
            let response = host.issue(outgoing(args)).await?;
            let output = json!({
                "request_id": response.request_id,
                "status": response.status,
                "headers": response.headers,
                "body": response.body,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
