use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use infrastructure::config::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "rulewall-agent",
    about = "rulewall ordered IPv4 packet filter",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "RULEWALL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level override (takes precedence over config file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format override: json or text
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format for rule listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Table,
    /// JSON
    Json,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Display version and build information
    Version,

    /// Validate the configuration and print the seeded rules
    Check,

    /// Run the interactive administrative console (default)
    Console,
}

pub fn parse() -> Cli {
    Cli::parse()
}
