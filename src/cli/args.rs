//! CLI argument definitions
//!
//! All Clap derive structs for `revealgate` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::MAX_DURATION;
use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Timed disclosure funnel simulator.
#[derive(Parser, Debug)]
#[command(name = "revealgate", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "REVEALGATE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "REVEALGATE_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Host one funnel session driven from stdin.
    Run(RunArgs),

    /// Validate configuration files without starting a session.
    Validate(ValidateArgs),

    /// Show whether the seen flag is set.
    Status(StatusArgs),
}

/// Arguments for `run`.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "REVEALGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seen-flag store file (overrides `storage.path`).
    #[arg(long, env = "REVEALGATE_STORE")]
    pub store: Option<PathBuf>,

    /// Random seed (overrides `seed`).
    #[arg(long, env = "REVEALGATE_SEED")]
    pub seed: Option<u64>,

    /// Reveal delay, e.g. `90s` or `5m` (overrides `reveal.delay`).
    #[arg(long, value_parser = parse_bounded_duration, env = "REVEALGATE_REVEAL_DELAY")]
    pub reveal_delay: Option<Duration>,

    /// Skip the geolocation request and show the fallback city.
    #[arg(long)]
    pub offline: bool,

    /// Write the event stream to this file instead of stdout.
    #[arg(long, env = "REVEALGATE_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// End the session after this long, e.g. `30s`.
    #[arg(long, value_parser = parse_bounded_duration)]
    pub duration: Option<Duration>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, env = "REVEALGATE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

/// Parses a humantime duration no longer than [`MAX_DURATION`].
fn parse_bounded_duration(raw: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if duration > MAX_DURATION {
        return Err(format!(
            "must be at most {} days",
            MAX_DURATION.as_secs() / 86_400
        ));
    }
    Ok(duration)
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for `status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Seen-flag store file.
    #[arg(long, env = "REVEALGATE_STORE")]
    pub store: Option<PathBuf>,

    /// Configuration file whose `storage.path` locates the store.
    #[arg(short, long, env = "REVEALGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for informational commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Human,
    /// JSON object.
    Json,
}
