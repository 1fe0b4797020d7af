//! Redemption endpoint.

use crate::{
    api::AppState,
    core::redemption::{self, Redemption},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/validate`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RedeemRequest {
    /// The token to redeem
    pub unique_code: Option<String>,
}

/// Successful redemption response.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// Always true
    pub success: bool,
    /// Human-readable confirmation
    pub message: &'static str,
    /// Amount, campaign name and timestamp of the redemption
    pub data: Redemption,
}

/// `POST /api/validate` - redeems one code exactly once.
pub async fn redeem(
    State(state): State<AppState>,
    body: std::result::Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Json<RedeemResponse>> {
    let Json(request) = body.map_err(|rejection| Error::Validation {
        fields: vec!["unique_code".to_string()],
        message: rejection.body_text(),
    })?;
    let code = request.unique_code.unwrap_or_default();

    let redemption = redemption::redeem_code(&state.database, &code).await?;

    Ok(Json(RedeemResponse {
        success: true,
        message: "Code validated successfully",
        data: redemption,
    }))
}
