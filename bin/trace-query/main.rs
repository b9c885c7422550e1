//! trace-query CLI
//!
//! Fetches traces and prompts from the observability backend and prints the
//! result as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use trace_query::{HttpTraceBackend, PromptService, QueryConfig, TraceQueryEngine, TraceRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "trace-query")]
#[command(about = "Query traces and prompts from an LLM observability backend")]
struct Args {
    /// TOML config file (defaults to environment variables)
    #[arg(short, long, env = "TRACE_QUERY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get a trace, or a single observation within it
    Get {
        trace_id: String,

        /// Observation index (takes priority over --name)
        #[arg(long, allow_negative_numbers = true)]
        index: Option<i64>,

        /// Exact observation name
        #[arg(long)]
        name: Option<String>,

        /// Ignore the cached snapshot and re-fetch
        #[arg(long)]
        refresh: bool,
    },
    /// Fetch a prompt and compile it with the given variables
    Prompt {
        name: String,

        #[arg(long)]
        version: Option<u32>,

        #[arg(long)]
        label: Option<String>,

        /// Template variable, as key=value (repeatable)
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,trace_query=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => QueryConfig::from_toml_file(path)?,
        None => QueryConfig::from_env(),
    };
    let backend = Arc::new(
        HttpTraceBackend::new(config.backend.clone()).context("Failed to create backend client")?,
    );

    match args.command {
        Command::Get {
            trace_id,
            index,
            name,
            refresh,
        } => {
            let cache = config.cache.open()?;
            info!(
                "Cache: {:?} at {:?}",
                config.cache.kind,
                config.cache.resolved_path()
            );
            let engine = TraceQueryEngine::new(backend, cache);
            let request = TraceRequest::from_parts(trace_id, index, name).with_refresh(refresh);
            let view = engine.handle(&request).await;
            println!("{}", serde_json::to_string_pretty(&view)?);
            if view.is_error() {
                std::process::exit(1);
            }
        }
        Command::Prompt {
            name,
            version,
            label,
            vars,
        } => {
            let values: HashMap<String, String> = vars.into_iter().collect();
            let service = PromptService::new(backend);
            let compiled = service
                .compile_prompt(&name, version, label.as_deref(), &values)
                .await?;
            println!("{}", serde_json::to_string_pretty(&compiled)?);
        }
    }

    Ok(())
}
