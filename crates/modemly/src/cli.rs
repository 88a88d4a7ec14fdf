//! Clap derive structures for the `modemly` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// modemly -- cable modem diagnostics collector
#[derive(Debug, Parser)]
#[command(
    name = "modemly",
    version,
    about = "Collect cable modem signal levels and event logs",
    long_about = "Polls a Motorola/Arris cable modem over its HNAP interface and\n\
        records downstream/upstream channel levels and the device event log.\n\n\
        `ingest` runs the collector; `levels`, `logs`, and `dump` inspect the\n\
        modem directly.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "MODEMLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Modem hostname or URL (overrides config)
    #[arg(long, short = 'H', global = true)]
    pub host: Option<String>,

    /// Modem login username (overrides config)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Accept the modem's self-signed certificate even if [modem].tls
    /// says otherwise
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MODEMLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one record per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the modem and write readings and new log entries to the sink
    #[command(alias = "run")]
    Ingest(IngestArgs),

    /// Show downstream and upstream channel levels
    #[command(alias = "signal")]
    Levels,

    /// Show the modem event log, oldest first
    #[command(alias = "log")]
    Logs(LogsArgs),

    /// Print the raw HNAP responses for every status action
    Dump,

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Ingest ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    /// Seconds between cycles (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Run one cycle into memory and print the batch; nothing is written
    /// and the cursor is left alone
    #[arg(long)]
    pub dry_run: bool,
}

// ── Logs ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Only entries whose message or severity contains TEXT
    /// (case-insensitive)
    #[arg(long, short = 'g', value_name = "TEXT")]
    pub grep: Option<String>,
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the resolved configuration (secrets redacted)
    Show,
}

// ── Completions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
