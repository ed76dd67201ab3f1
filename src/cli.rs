use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show critical errors
    Quiet,
    /// Show standard information
    #[default]
    Normal,
    /// Show detailed information
    Verbose,
}

impl VerbosityLevel {
    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub fn default_log_filter(self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Status and markers for a terminal
    Human,
    /// Machine-readable pass report
    Json,
}

/// Marker color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    /// Detect from the environment
    Auto,
    Light,
    Dark,
}

/// Validate TRDP device configurations against their XSD
#[derive(Parser, Debug, Clone)]
#[command(name = "trdp-xml-validate")]
#[command(
    about = "Validate a TRDP XML configuration against its schema and check identifier integrity"
)]
#[command(version)]
pub struct Cli {
    /// Instance document; defaults to the configured example
    #[arg(help = "TRDP configuration document to validate")]
    pub instance: Option<PathBuf>,

    /// Schema document; defaults to the configured example
    #[arg(short = 's', long = "schema", help = "XSD to validate against")]
    pub schema: Option<PathBuf>,

    /// Rewrite a valid document into canonical form
    #[arg(short = 'n', long = "normalize")]
    pub normalize: bool,

    /// Write the normalized document back to the instance file
    #[arg(short = 'w', long = "write", requires = "normalize")]
    pub write: bool,

    /// Marker color scheme
    #[arg(long = "theme", value_enum)]
    pub theme: Option<ThemeChoice>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Maximum number of compiled schemas kept in memory
    #[arg(long = "max-schemas")]
    pub max_schemas: Option<u64>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(instance) = &self.instance
            && !instance.exists()
        {
            return Err(format!("Path does not exist: {}", instance.display()));
        }
        if let Some(schema) = &self.schema
            && !schema.exists()
        {
            return Err(format!("Path does not exist: {}", schema.display()));
        }
        if self.max_schemas == Some(0) {
            return Err("Schema cache capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}
