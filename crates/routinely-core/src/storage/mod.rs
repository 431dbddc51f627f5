mod config;
pub mod database;
mod kv;
pub mod migrations;

pub use config::{CompanionConfig, Config, SelectionConfig};
pub use database::{Database, ResponseCount};
pub use kv::{KeyValueStore, MemoryStore};

use std::path::PathBuf;

use crate::error::CoreError;

/// Environment variable selecting the data directory flavour.
pub const ENV_VAR: &str = "ROUTINELY_ENV";

/// Returns `~/.config/routinely[-dev]/` based on ROUTINELY_ENV.
///
/// Set ROUTINELY_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("routinely-dev")
    } else {
        base_dir.join("routinely")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
