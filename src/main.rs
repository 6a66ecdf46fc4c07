use anyhow::{Context, Result};
use clap::Parser;
use execgraph::cli::{Cli, OutputFormat};
use execgraph::config::{Containment, GraphConfig};
use execgraph::json_output::JsonOutput;
use execgraph::{dot_output, pipeline, trace_source};
use std::fs;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Configuration file (if any) with command-line overrides applied
fn load_config(args: &Cli) -> Result<GraphConfig> {
    let mut config = match &args.config {
        Some(path) => GraphConfig::from_toml(path)?,
        None => GraphConfig::default(),
    };
    if args.inclusive {
        config.containment = Containment::Inclusive;
    }
    if args.keep_degenerate {
        config.collapse_degenerate_pairs = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let events = trace_source::load_events(&args.trace)?;
    let output = pipeline::build_execution_graph(events, &config)
        .with_context(|| format!("Failed to reconstruct graph from {}", args.trace.display()))?;

    let rendered = match args.format {
        OutputFormat::Summary => output.summary(),
        OutputFormat::Dot => dot_output::to_dot(&output.graph),
        OutputFormat::Json => JsonOutput::from_pipeline(&output).to_json()?,
    };

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}
