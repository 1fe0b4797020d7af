//! Unified error type for campaign creation, redemption, and the service around them.
//!
//! Business-rule outcomes (`Validation`, `CodeNotFound`, `AlreadyRedeemed`) are surfaced
//! to callers verbatim. Store failures inside a unit of work are logged and collapsed into
//! `TransactionFailed` (campaign creation) or `Internal` (redemption).

use sea_orm::DbErr;
use thiserror::Error;

/// Errors produced by the campaign code service.
#[derive(Debug, Error)]
pub enum Error {
    /// Input failed shape or range checks. Raised before the store is touched.
    #[error("Validation failed for {}: {message}", .fields.join(", "))]
    Validation {
        /// The offending request fields, in their wire (camelCase) spelling
        fields: Vec<String>,
        /// Human-readable summary of every violation
        message: String,
    },

    /// No unused token could be drawn within the configured number of attempts.
    #[error("Code generation exhausted after {attempts} attempts")]
    GenerationExhausted {
        /// How many candidates were drawn before giving up
        attempts: u32,
    },

    /// The campaign-plus-codes unit of work failed and was rolled back.
    #[error("Transaction failed: {message}")]
    TransactionFailed {
        /// Short description of the failed step (never the raw store error)
        message: String,
    },

    /// No code row matches the submitted token.
    #[error("Invalid code")]
    CodeNotFound,

    /// The code exists but was already redeemed.
    #[error("Code has already been used")]
    AlreadyRedeemed,

    /// Unexpected store or connectivity failure during redemption.
    #[error("Internal error: {message}")]
    Internal {
        /// Short description of the failed step (never the raw store error)
        message: String,
    },

    /// Campaign lookup by id found nothing.
    #[error("Campaign not found: {id}")]
    CampaignNotFound {
        /// The id that was requested
        id: i64,
    },

    /// Settings could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Store error outside of the two guarded units of work (setup, read views).
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Socket or file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a `Validation` error for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![field.to_string()],
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
