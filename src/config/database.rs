//! Database configuration module.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::config::settings::DatabaseSettings;
use crate::entities::{Campaign, UniqueCode};
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/campaign_codes.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, or the default
/// local `SQLite` file if it is not set.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection pool to the database named by [`get_database_url`].
pub async fn create_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection> {
    connect(&get_database_url(), settings.max_connections).await
}

/// Opens a pool of at most `max_connections` connections to `database_url`.
///
/// The pool size is always set explicitly: left unset, `SeaORM` quietly caps `SQLite`
/// pools at a single connection.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection> {
    tracing::debug!(
        "Connecting to database at {} with up to {} connections",
        database_url,
        max_connections
    );
    let mut options = ConnectOptions::new(database_url);
    options.max_connections(max_connections);
    Database::connect(options).await.map_err(Into::into)
}

/// Creates the `campaigns` and `unique_codes` tables if they do not exist yet.
///
/// Campaigns are created first so the foreign key on `unique_codes.campaign_id`
/// has a target.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut campaign_table = schema.create_table_from_entity(Campaign);
    let mut unique_code_table = schema.create_table_from_entity(UniqueCode);

    campaign_table.if_not_exists();
    unique_code_table.if_not_exists();

    db.execute(builder.build(&campaign_table)).await?;
    db.execute(builder.build(&unique_code_table)).await?;

    Ok(())
}
