//! Service settings loading from config.toml
//!
//! Every section and key is optional; anything left out falls back to the defaults
//! below. A missing settings file is not an error, a malformed one is.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the settings file location.
pub const CONFIG_PATH_VAR: &str = "CAMPAIGN_CODES_CONFIG";

/// Top-level structure of config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP listener settings
    pub server: ServerSettings,
    /// Connection pool settings
    pub database: DatabaseSettings,
    /// Code generation tuning
    pub generation: GenerationSettings,
    /// Read-side listing settings
    pub listing: ListingSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the HTTP server binds to
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Connection pool settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Upper bound on pooled connections. Use 1 for `sqlite::memory:` URLs, since every
    /// in-memory connection opens its own empty database.
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { max_connections: 4 }
    }
}

/// Code generation tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Candidates drawn for a single token before failing with `GenerationExhausted`
    pub max_attempts: u32,
    /// Code rows per bulk INSERT statement
    pub insert_batch_size: usize,
    /// Rounds of re-checking resampled tokens against existing rows
    pub max_reconcile_rounds: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            insert_batch_size: 500,
            max_reconcile_rounds: 16,
        }
    }
}

/// Read-side listing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingSettings {
    /// Codes per page in the campaign detail view
    pub page_size: u64,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self { page_size: 50 }
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read settings file {}: {e}", path_ref.display()),
    })?;

    parse_settings(&contents)
}

/// Parses settings from TOML text and checks the values are usable.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings: {e}"),
    })?;

    if settings.database.max_connections == 0 {
        return Err(Error::Config {
            message: "database.max_connections must be at least 1".to_string(),
        });
    }
    if settings.generation.max_attempts == 0 {
        return Err(Error::Config {
            message: "generation.max_attempts must be at least 1".to_string(),
        });
    }
    if settings.generation.insert_batch_size == 0 {
        return Err(Error::Config {
            message: "generation.insert_batch_size must be at least 1".to_string(),
        });
    }
    if settings.listing.page_size == 0 {
        return Err(Error::Config {
            message: "listing.page_size must be at least 1".to_string(),
        });
    }

    Ok(settings)
}

/// Loads settings from `$CAMPAIGN_CODES_CONFIG`, or ./config.toml when unset.
/// Falls back to defaults if the file does not exist.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_settings(&path)
    } else {
        tracing::info!("No settings file at {}, using defaults", path);
        Ok(Settings::default())
    }
}
