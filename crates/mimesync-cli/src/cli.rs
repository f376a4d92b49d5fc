//! # CLI Structure and Argument Parsing
//!
//! The `mimesync` command exposes the registry to shell scripts:
//!
//! ```bash
//! # Look up the MIME types for one or more files
//! mimesync get report.pdf photo.JPG
//!
//! # Dump the registry
//! mimesync list --format json
//!
//! # Register a custom mapping
//! mimesync append application/x-notes note notes
//!
//! # Pull every feed once, or keep pulling on an interval
//! mimesync refresh
//! mimesync watch --interval-ms 3600000
//! ```
//!
//! Configuration comes from `config.toml` (see `MIMESYNC_CONFIG_DIR`) and the
//! `MIMESYNC_*` environment variables.

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Main CLI structure for the `mimesync` command
#[derive(Parser, Clone, Debug)]
#[command(name = "mimesync")]
#[command(version)]
#[command(about = "mimesync - Self-refreshing MIME type registry", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Look up MIME types for file paths
    Get {
        /// File names or paths
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List every registered MIME type and its extensions
    List {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Register extensions for a MIME type
    Append {
        /// MIME type in `type/subtype` form
        mime: String,

        /// One or more extensions, with or without a leading dot
        #[arg(required = true)]
        extensions: Vec<String>,
    },

    /// Run one refresh cycle over every feed
    Refresh {
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Refresh now and then on an interval until interrupted
    Watch {
        /// Milliseconds between cycles; negative runs a single cycle
        #[arg(long, allow_hyphen_values = true)]
        interval_ms: Option<i64>,
    },
}

impl Cli {
    /// Output format of the selected command, if it has one.
    pub const fn format(&self) -> Option<OutputFormat> {
        match &self.command {
            Commands::Get { format, .. }
            | Commands::List { format }
            | Commands::Refresh { format } => Some(*format),
            Commands::Append { .. } | Commands::Watch { .. } => None,
        }
    }
}
