//! Output format selection shared by the commands.

use clap::ValueEnum;

/// Output format options supported by the CLI
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty text output (default)
    #[default]
    Text,
    /// Single JSON document
    Json,
}

impl OutputFormat {
    /// Whether the format is meant for other programs.
    pub const fn is_machine(self) -> bool {
        matches!(self, Self::Json)
    }
}
