//! Mapping of service errors onto HTTP status codes and JSON bodies.
//!
//! Business-rule failures carry their precise message. Infrastructure failures are
//! reduced to a fixed message; the details were already logged where they happened.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation { fields, message } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "fields": fields }),
            ),
            Self::AlreadyRedeemed => (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() })),
            Self::CodeNotFound | Self::CampaignNotFound { .. } => {
                (StatusCode::NOT_FOUND, json!({ "error": self.to_string() }))
            }
            Self::TransactionFailed { .. } | Self::GenerationExhausted { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error creating campaign and generating codes" }),
            ),
            Self::Database(e) => {
                tracing::error!("Read query failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            Self::Internal { .. } | Self::Config { .. } | Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
