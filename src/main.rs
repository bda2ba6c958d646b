use anyhow::{bail, Context, Result};
use archgraph::backend::BackendKind;
use archgraph::config::{load_config, load_config_file};
use archgraph::graph::analyze_project;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ARCHGRAPH_LOG";

#[derive(Debug, Parser)]
#[command(name = "archgraph")]
#[command(version)]
#[command(about = "Static dependency graph for Java, TypeScript/JavaScript and Go projects")]
struct Cli {
    /// Project root (a cloned repository)
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Config file to use instead of <ROOT>/.archgraph.json
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print only the graph, without backend statuses and diagnostics
    #[arg(long)]
    graph_only: bool,

    /// Disable a backend (java, script, go). Repeatable.
    #[arg(long, value_name = "BACKEND", value_parser = parse_backend)]
    skip: Vec<BackendKind>,
}

fn parse_backend(s: &str) -> std::result::Result<BackendKind, String> {
    BackendKind::parse(s).ok_or_else(|| format!("unknown backend `{s}` (expected java, script or go)"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cfg = match cli.config.as_ref() {
        Some(path) => {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            load_config_file(path)
        }
        None => load_config(&cli.root),
    };

    let report = analyze_project(&cli.root, &cfg, &cli.skip)
        .with_context(|| format!("Failed to analyze {}", cli.root.display()))?;

    if report.is_partial() {
        for b in report.backends.iter().filter(|b| b.reason.is_some()) {
            tracing::warn!("partial result: {} backend failed", b.name);
        }
    }

    let out = match (cli.graph_only, cli.pretty) {
        (true, true) => serde_json::to_string_pretty(&report.graph)?,
        (true, false) => serde_json::to_string(&report.graph)?,
        (false, true) => serde_json::to_string_pretty(&report)?,
        (false, false) => serde_json::to_string(&report)?,
    };
    println!("{out}");
    Ok(())
}
