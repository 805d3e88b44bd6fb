//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod run;
pub mod status;
pub mod validate;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::config::FunnelConfig;
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::error::RevealGateError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `cancel` is fired by the process signal handler; long-running commands
/// tear down when it does.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), RevealGateError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cancel).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Status(args) => status::run(&args),
    }
}

/// Loads `path` (or the defaults when `None`), logging any warnings.
pub(crate) fn load_config(
    path: Option<&std::path::Path>,
) -> Result<FunnelConfig, RevealGateError> {
    let Some(path) = path else {
        tracing::debug!("no configuration file; using defaults");
        return Ok(FunnelConfig::default());
    };

    tracing::info!(config = %path.display(), "loading configuration");
    let loader = ConfigLoader::new(LoaderOptions::default());
    let load_result = loader.load(path)?;

    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    Ok(load_result.config)
}
