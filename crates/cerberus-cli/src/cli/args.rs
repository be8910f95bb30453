//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Run binaries through the Cerberus analysis engine
///
/// Every analysis runs in its own scratch directory and, when it succeeds,
/// lands in a local history that can be searched and exported later.
#[derive(Parser, Debug)]
#[command(name = "cerberusctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Analysis engine executable (or set CERBERUS_ENGINE)
    #[arg(short, long, env = "CERBERUS_ENGINE", global = true)]
    pub engine: Option<PathBuf>,

    /// History file (or set CERBERUS_HISTORY)
    #[arg(long, env = "CERBERUS_HISTORY", global = true)]
    pub history: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyse one or more binaries
    Analyze(AnalyzeArgs),

    /// Browse past analyses
    History(HistoryArgs),

    /// Verify that the engine can be run
    Check,

    /// Manage CLI configuration
    Config(ConfigArgs),
}

// ============================================================================
// Analyze command
// ============================================================================

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Files to analyse
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Analyse string references (`--include-strings=false` to turn off)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_strings: Option<bool>,

    /// Run full disassembly (`--disassemble=false` to turn off)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub disassemble: Option<bool>,

    /// Engine log level
    #[arg(long)]
    pub log_level: Option<String>,

    /// Engine time budget in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Maximum number of files analysed at once (0 = no limit)
    #[arg(short, long, default_value = "0")]
    pub jobs: usize,
}

// ============================================================================
// History command
// ============================================================================

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List past analyses, most recent first
    List {
        /// Only show files whose name contains this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Show at most this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show one analysis in detail
    Show {
        /// Job ID
        id: String,
    },

    /// Write an analysis report to <name>-analysis.json
    Export {
        /// Job ID
        id: String,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Totals across all analyses
    Stats,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Key to set (e.g., engine_path, timeout_secs)
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}
