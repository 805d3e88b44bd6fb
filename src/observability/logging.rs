//! Diagnostic logging
//!
//! Logs go to stderr; stdout belongs to the event stream. Verbosity flags
//! raise the level of this crate's own targets, while the HTTP stack behind
//! the geolocation lookup stays at `warn` until `-vvv`. `REVEALGATE_LOG_LEVEL`
//! replaces the computed filter entirely, and `--quiet` silences everything.

use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, ColorChoice};

/// Environment variable that overrides the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "REVEALGATE_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines with optional ANSI colors.
    #[default]
    Human,
    /// One JSON object per line.
    Json,
}

/// Level for this crate's own targets at a given `-v` count.
#[must_use]
pub const fn crate_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Logging options taken from the global CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogSettings {
    /// Output format
    pub format: LogFormat,
    /// `-v` count
    pub verbosity: u8,
    /// `--quiet`
    pub quiet: bool,
    /// `--color`
    pub color: ColorChoice,
}

impl LogSettings {
    /// Collects the logging flags from a parsed command line.
    #[must_use]
    pub const fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.log_format,
            verbosity: cli.verbose,
            quiet: cli.quiet,
            color: cli.color,
        }
    }

    /// Filter directive implied by the flags alone.
    #[must_use]
    pub fn directive(&self) -> String {
        if self.quiet {
            return "off".to_owned();
        }
        let dependencies = if self.verbosity >= 3 { "debug" } else { "warn" };
        format!(
            "{dependencies},{crate_name}={level}",
            crate_name = env!("CARGO_CRATE_NAME"),
            level = crate_level(self.verbosity),
        )
    }

    /// Filter to install: the environment override unless quiet, otherwise
    /// [`directive`](Self::directive).
    fn filter(&self) -> EnvFilter {
        if self.quiet {
            return EnvFilter::new("off");
        }
        EnvFilter::try_from_env(LOG_LEVEL_ENV).unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }

    /// Whether human output should carry ANSI colors. `NO_COLOR` only
    /// matters in `auto` mode.
    #[must_use]
    pub fn use_ansi(&self) -> bool {
        match self.color {
            ColorChoice::Auto => {
                std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(settings: &LogSettings) {
    let filter = settings.filter();
    // Module paths only help once someone is debugging.
    let show_target = settings.verbosity >= 2;

    match settings.format {
        LogFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(settings.use_ansi())
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_target(show_target)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
