//! `validate` command
//!
//! Loads each file through the full loader pipeline and reports the first
//! failure.

use crate::cli::args::ValidateArgs;
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::error::RevealGateError;

/// Validate configuration files without starting a session.
///
/// # Errors
///
/// Returns a config error for the first file that fails to load or validate.
pub fn run(args: &ValidateArgs) -> Result<(), RevealGateError> {
    let loader = ConfigLoader::new(LoaderOptions::default());

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let load_result = loader.load(path)?;

        for warning in &load_result.warnings {
            let location = warning.location.as_deref().unwrap_or("<unknown>");
            tracing::warn!(file = %path.display(), location, "{}", warning.message);
            eprintln!("warning: {}: {location}: {}", path.display(), warning.message);
        }

        println!("{}: ok", path.display());
    }

    Ok(())
}
