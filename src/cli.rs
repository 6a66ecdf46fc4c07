//! CLI argument parsing for execgraph

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the reconstructed graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Chunk, vertex, edge and task counts (default)
    Summary,
    /// Graphviz DOT
    Dot,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "execgraph")]
#[command(version)]
#[command(about = "Reconstruct the execution graph of a parallel program from its region/task trace", long_about = None)]
pub struct Cli {
    /// Trace file (JSON Lines region definitions and events)
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "summary")]
    pub format: OutputFormat,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Load graph configuration from a TOML file
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Count tasks created or finished exactly at a synchronisation point as pending
    #[arg(long = "inclusive")]
    pub inclusive: bool,

    /// Keep enter/leave pairs with nothing between them as two vertices
    #[arg(long = "keep-degenerate")]
    pub keep_degenerate: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
