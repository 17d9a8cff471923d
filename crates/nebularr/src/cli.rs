//! Clap derive structures for the `nebularr` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nebularr -- declarative configuration for the Servarr family
#[derive(Debug, Parser)]
#[command(
    name = "nebularr",
    version,
    about = "Reconcile Radarr, Sonarr, Lidarr and Prowlarr against declared state",
    long_about = "Reads instance profiles and desired-state files, compares them with\n\
        what each service reports, and applies the difference to resources\n\
        Nebularr owns. Hand-made resources are never touched.",
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
    #[arg(long, env = "NEBULARR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NEBULARR_OUTPUT",
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

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile instances once, or keep them reconciled with --watch
    #[command(alias = "r")]
    Reconcile(ReconcileArgs),

    /// Show the changes a reconcile would make, without applying them
    Diff(InstanceArgs),

    /// Print the drift fingerprint of an instance's desired state
    Fingerprint(InstanceArgs),

    /// Show the health checks an instance reports
    Health(InstanceArgs),

    /// Show recorded reconcile status
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Instances to reconcile (all configured instances when omitted)
    pub instances: Vec<String>,

    /// Keep running and reconcile instances as they become due
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Seconds between due-checks in watch mode
    #[arg(long, default_value = "15", requires = "watch")]
    pub tick: u64,
}

#[derive(Debug, Args)]
pub struct InstanceArgs {
    /// Instance name from the config file
    pub instance: String,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Instance name (all configured instances when omitted)
    pub instance: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
