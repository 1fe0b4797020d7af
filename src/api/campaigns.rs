//! Campaign endpoints - create a campaign with its codes, and the read-side listings.

use crate::{
    api::{AppState, DataResponse},
    core::{
        campaign::{self, CampaignSpec, CreatedCampaign},
        report::{self, CampaignDetail, CampaignSummary, CodeFilter},
    },
    entities::unique_code,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

/// Body of `POST /api/generate`.
///
/// Every field is optional at the wire level so that missing values are reported as
/// validation failures naming the field instead of as a decoding error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateCampaignRequest {
    /// Campaign name
    pub name: String,
    /// Start date, RFC 3339 or `YYYY-MM-DD[THH:MM[:SS]]` in UTC
    pub start_date: Option<String>,
    /// Optional end date, same formats as `start_date`
    pub end_date: Option<String>,
    /// Fundraising goal
    pub target_amount: Option<Decimal>,
    /// Reward per code
    pub code_amount: Option<Decimal>,
    /// Number of codes to generate
    pub max_codes: Option<i64>,
}

impl CreateCampaignRequest {
    /// Converts the request into a [`CampaignSpec`], parsing the dates.
    ///
    /// Blank dates count as absent; unparsable dates fail naming the field.
    pub fn into_spec(self) -> Result<CampaignSpec> {
        let start_date = parse_optional_date("startDate", self.start_date.as_deref())?;
        let end_date = parse_optional_date("endDate", self.end_date.as_deref())?;

        Ok(CampaignSpec {
            name: self.name,
            start_date,
            end_date,
            target_amount: self.target_amount.unwrap_or_default(),
            code_amount: self.code_amount.unwrap_or_default(),
            max_codes: self.max_codes.unwrap_or_default(),
        })
    }
}

/// Query string of `GET /api/campaigns/:id`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DetailQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// `all`, `used` or `unused`
    pub filter: CodeFilter,
}

/// `POST /api/generate` - creates a campaign and its whole code batch.
pub async fn create_campaign(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<CreatedCampaign>>)> {
    let Json(request) = body.map_err(|rejection| Error::Validation {
        fields: Vec::new(),
        message: rejection.body_text(),
    })?;
    let spec = request.into_spec()?;

    info!(
        "Creating campaign '{}' with {} codes",
        spec.name.trim(),
        spec.max_codes
    );
    let created =
        campaign::create_campaign(&state.database, &spec, &state.settings.generation).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// `GET /api/generate` - every code in the store, newest first.
pub async fn list_codes(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<unique_code::Model>>>> {
    let codes = report::list_all_codes(&state.database).await?;
    Ok(Json(DataResponse { data: codes }))
}

/// `GET /api/campaigns` - every campaign with its redemption totals.
pub async fn list_campaigns(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<CampaignSummary>>>> {
    let summaries = report::list_campaign_summaries(&state.database).await?;
    Ok(Json(DataResponse { data: summaries }))
}

/// `GET /api/campaigns/:id` - one campaign with a page of its codes.
pub async fn campaign_detail(
    State(state): State<AppState>,
    Path(campaign_id): Path<i64>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<DataResponse<CampaignDetail>>> {
    let detail = report::get_campaign_detail(
        &state.database,
        campaign_id,
        query.page.unwrap_or(1),
        query.filter,
        state.settings.listing.page_size,
    )
    .await?;
    Ok(Json(DataResponse { data: detail }))
}

fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| Error::invalid_field(field, format!("{field} is not a valid date"))),
    }
}

/// Parses RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC), or a bare date
/// (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
