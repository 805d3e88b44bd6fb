//! `status` command

use std::path::PathBuf;

use crate::cli::args::{OutputFormat, StatusArgs};
use crate::error::RevealGateError;
use crate::storage::{FileFlagStore, read_seen_flag};

use super::load_config;

/// Print whether the seen flag is set in the resolved store.
///
/// The store is `--store` if given, otherwise `storage.path` from `--config`,
/// otherwise the default location.
///
/// # Errors
///
/// Returns a config error if `--config` fails to load, or a storage error if
/// the store exists but cannot be read.
pub fn run(args: &StatusArgs) -> Result<(), RevealGateError> {
    let path: PathBuf = match &args.store {
        Some(path) => path.clone(),
        None => load_config(args.config.as_deref())?.storage.path,
    };

    let store = FileFlagStore::new(path.clone());
    let seen = read_seen_flag(&store)?;
    tracing::debug!(store = %path.display(), seen, "read seen flag");

    match args.format {
        OutputFormat::Human => {
            let state = if seen { "seen" } else { "not seen" };
            println!("{state} ({})", path.display());
        }
        OutputFormat::Json => {
            let body = serde_json::json!({
                "seen": seen,
                "store": path.display().to_string(),
            });
            println!("{body}");
        }
    }

    Ok(())
}
