/// Database configuration and connection management
pub mod database;

/// Service settings loading from config.toml
pub mod settings;
