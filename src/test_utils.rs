//! Shared test utilities.
//!
//! This module provides common helpers for setting up test databases, sample campaign
//! specs, deterministic RNGs for exercising collision handling, and an HTTP test driver.

#![allow(clippy::expect_used)]

use crate::{
    config::settings::GenerationSettings,
    core::campaign::{self, CampaignSpec, CreatedCampaign},
    entities::{UniqueCode, unique_code},
    errors::Result,
};
use chrono::{TimeZone, Utc};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database in a fresh temp directory, pooled over
/// `max_connections` connections, with all tables initialized.
///
/// Unlike `sqlite::memory:`, concurrent tasks really run on separate connections here.
/// Keep the returned `TempDir` alive for as long as the database is used.
pub async fn setup_file_db(
    max_connections: u32,
) -> Result<(tempfile::TempDir, DatabaseConnection)> {
    let dir = tempfile::TempDir::new()?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("codes.sqlite").display());
    let db = crate::config::database::connect(&url, max_connections).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((dir, db))
}

/// A valid campaign spec with `max_codes` codes.
///
/// # Defaults
/// * `name`: "Spring Drive"
/// * `start_date`: 2025-03-01 UTC, no end date
/// * `target_amount`: 1000
/// * `code_amount`: 25.50
#[must_use]
pub fn sample_spec(max_codes: i64) -> CampaignSpec {
    CampaignSpec {
        name: "Spring Drive".to_string(),
        start_date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).single(),
        end_date: None,
        target_amount: Decimal::from(1000),
        code_amount: Decimal::new(2550, 2),
        max_codes,
    }
}

/// Generation settings with small insert and lookup chunks, so multi-chunk paths run
/// even for tiny campaigns.
#[must_use]
pub fn small_batches() -> GenerationSettings {
    GenerationSettings {
        insert_batch_size: 7,
        ..GenerationSettings::default()
    }
}

/// Returns the tokens of a campaign in insertion order.
pub async fn codes_for(db: &DatabaseConnection, campaign_id: i64) -> Result<Vec<String>> {
    Ok(UniqueCode::find()
        .select_only()
        .column(unique_code::Column::UniqueCode)
        .filter(unique_code::Column::CampaignId.eq(campaign_id))
        .order_by_asc(unique_code::Column::Id)
        .into_tuple()
        .all(db)
        .await?)
}

/// Sets up a database holding one sample campaign with `max_codes` codes.
/// Returns (db, created campaign, its tokens).
pub async fn setup_with_campaign(
    max_codes: i64,
) -> Result<(DatabaseConnection, CreatedCampaign, Vec<String>)> {
    let db = setup_test_db().await?;
    let created = campaign::create_campaign(&db, &sample_spec(max_codes), &small_batches()).await?;
    let codes = codes_for(&db, created.campaign_id).await?;
    Ok((db, created, codes))
}

/// An RNG that yields zero bits for a number of draws, then defers to a seeded `StdRng`.
///
/// Every zero draw maps to the lowest token, which makes collisions reproducible.
pub struct ScriptedRng {
    zero_draws: Option<usize>,
    inner: StdRng,
}

impl ScriptedRng {
    /// Only ever yields zero bits.
    #[must_use]
    pub fn stuck() -> Self {
        Self {
            zero_draws: None,
            inner: StdRng::seed_from_u64(0),
        }
    }

    /// Yields zero bits for `zero_draws` draws, then random ones.
    #[must_use]
    pub fn zeros_then_random(zero_draws: usize, seed: u64) -> Self {
        Self {
            zero_draws: Some(zero_draws),
            inner: StdRng::seed_from_u64(seed),
        }
    }

    fn take_zero(&mut self) -> bool {
        match &mut self.zero_draws {
            None => true,
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
        }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        if self.take_zero() {
            0
        } else {
            self.inner.next_u32()
        }
    }

    fn next_u64(&mut self) -> u64 {
        if self.take_zero() {
            0
        } else {
            self.inner.next_u64()
        }
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if self.take_zero() {
            dest.fill(0);
        } else {
            self.inner.fill_bytes(dest);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Builds the HTTP router over a fresh in-memory database with default settings.
/// Returns (router, db) so tests can seed or inspect the store directly.
pub async fn test_app() -> Result<(axum::Router, DatabaseConnection)> {
    let db = setup_test_db().await?;
    let state = crate::api::AppState::new(
        db.clone(),
        std::sync::Arc::new(crate::config::settings::Settings::default()),
    );
    Ok((crate::api::router(state), db))
}

/// Sends a request with an optional JSON body and decodes the JSON response.
/// A non-JSON or empty response body decodes as `Value::Null`.
pub async fn send_json(
    app: &axum::Router,
    method: axum::http::Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    send_raw(app, method, uri, &payload).await
}

/// Sends a request with a raw body labelled as JSON.
pub async fn send_raw(
    app: &axum::Router,
    method: axum::http::Method,
    uri: &str,
    payload: &str,
) -> (axum::http::StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    let request = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(payload.to_string()))
        .expect("request should build");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}
