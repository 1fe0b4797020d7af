//! Campaign creation - Inserts a campaign and its full batch of redemption codes.
//!
//! The campaign row and every code row are written in one database transaction. Either the
//! whole batch commits or nothing does, so a campaign without its codes is never visible.
//! Tokens are unique across the whole `unique_codes` table: candidates are made distinct
//! in memory first, then reconciled against existing rows inside the same transaction.

use crate::{
    config::settings::GenerationSettings,
    core::codegen,
    entities::{Campaign, UniqueCode, campaign, unique_code},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use sea_orm::{DatabaseTransaction, DbErr, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Hard cap on the number of codes a single campaign may generate.
pub const MAX_CODES: i64 = 25_000;

/// Everything needed to create a campaign and its code batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSpec {
    /// Campaign name, must not be blank
    pub name: String,
    /// Required start of the campaign
    pub start_date: Option<DateTime<Utc>>,
    /// Optional end, None for open-ended campaigns
    pub end_date: Option<DateTime<Utc>>,
    /// Fundraising goal, must be positive
    pub target_amount: Decimal,
    /// Reward carried by every generated code, must be positive
    pub code_amount: Decimal,
    /// How many codes to generate, `1..=MAX_CODES`
    pub max_codes: i64,
}

impl CampaignSpec {
    /// Checks every field and reports all violations at once.
    ///
    /// Field names use the request's camelCase spelling.
    pub fn validate(&self) -> Result<()> {
        let mut violations: Vec<(&str, String)> = Vec::new();

        if self.name.trim().is_empty() {
            violations.push(("name", "name is required".to_string()));
        }
        if self.start_date.is_none() {
            violations.push(("startDate", "startDate is required".to_string()));
        }
        if self.target_amount <= Decimal::ZERO {
            violations.push((
                "targetAmount",
                "targetAmount must be greater than zero".to_string(),
            ));
        }
        if self.code_amount <= Decimal::ZERO {
            violations.push((
                "codeAmount",
                "codeAmount must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_CODES).contains(&self.max_codes) {
            violations.push((
                "maxCodes",
                format!("maxCodes must be between 1 and {MAX_CODES}"),
            ));
        }

        if violations.is_empty() {
            return Ok(());
        }

        Err(Error::Validation {
            fields: violations.iter().map(|(f, _)| (*f).to_string()).collect(),
            message: violations
                .into_iter()
                .map(|(_, m)| m)
                .collect::<Vec<_>>()
                .join("; "),
        })
    }
}

/// Outcome of a successful campaign creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCampaign {
    /// Id assigned to the new campaign
    pub campaign_id: i64,
    /// Campaign name as stored
    pub name: String,
    /// Number of code rows written
    pub codes_generated: usize,
}

/// Creates a campaign with `spec.max_codes` fresh codes, seeding the RNG from the OS.
pub async fn create_campaign(
    db: &DatabaseConnection,
    spec: &CampaignSpec,
    settings: &GenerationSettings,
) -> Result<CreatedCampaign> {
    let mut rng = StdRng::from_entropy();
    create_campaign_with_rng(db, spec, settings, &mut rng).await
}

/// Creates a campaign drawing tokens from the given RNG.
///
/// Validation runs before any store access. Store failures roll the whole unit back and
/// surface as `TransactionFailed`; a pathological run of collisions surfaces as
/// `GenerationExhausted`, also after rollback. Retrying after a failure creates a new,
/// independent campaign.
pub async fn create_campaign_with_rng<R>(
    db: &DatabaseConnection,
    spec: &CampaignSpec,
    settings: &GenerationSettings,
    rng: &mut R,
) -> Result<CreatedCampaign>
where
    R: Rng + Send + ?Sized,
{
    spec.validate()?;

    let txn = db
        .begin()
        .await
        .map_err(|e| transaction_failed("begin transaction", &e))?;

    match insert_campaign_batch(&txn, spec, settings, rng).await {
        Ok(created) => {
            txn.commit()
                .await
                .map_err(|e| transaction_failed("commit", &e))?;
            info!(
                "Created campaign {} '{}' with {} codes",
                created.campaign_id, created.name, created.codes_generated
            );
            Ok(created)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!("Rollback of campaign '{}' failed: {}", spec.name, rollback_err);
            }
            error!("Campaign '{}' rolled back: {}", spec.name, e);
            Err(e)
        }
    }
}

/// Looks up a campaign by id.
pub async fn get_campaign_by_id(
    db: &DatabaseConnection,
    campaign_id: i64,
) -> Result<Option<campaign::Model>> {
    Campaign::find_by_id(campaign_id)
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_campaign_batch<R>(
    txn: &DatabaseTransaction,
    spec: &CampaignSpec,
    settings: &GenerationSettings,
    rng: &mut R,
) -> Result<CreatedCampaign>
where
    R: Rng + Send + ?Sized,
{
    let start_date = spec
        .start_date
        .ok_or_else(|| Error::invalid_field("startDate", "startDate is required"))?;
    let max_codes = i32::try_from(spec.max_codes)
        .map_err(|_| Error::invalid_field("maxCodes", "maxCodes is out of range"))?;
    let count = usize::try_from(spec.max_codes)
        .map_err(|_| Error::invalid_field("maxCodes", "maxCodes is out of range"))?;
    let now = Utc::now();

    let campaign = campaign::ActiveModel {
        name: Set(spec.name.trim().to_string()),
        start_date: Set(start_date),
        end_date: Set(spec.end_date),
        target_amount: Set(spec.target_amount),
        current_amount: Set(Decimal::ZERO),
        max_codes: Set(max_codes),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(|e| transaction_failed("insert campaign", &e))?;

    let mut codes = codegen::generate_batch(&mut *rng, count, settings.max_attempts)?;
    reconcile_with_store(txn, &mut codes, rng, settings).await?;

    let chunk_size = settings.insert_batch_size.max(1);
    let mut written = 0;
    for chunk in codes.chunks(chunk_size) {
        let rows = chunk.iter().map(|code| unique_code::ActiveModel {
            campaign_id: Set(campaign.id),
            unique_code: Set(code.clone()),
            amount: Set(spec.code_amount),
            used: Set(false),
            used_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        });

        UniqueCode::insert_many(rows)
            .exec_without_returning(txn)
            .await
            .map_err(|e| transaction_failed("insert codes", &e))?;
        written += chunk.len();
    }

    Ok(CreatedCampaign {
        campaign_id: campaign.id,
        name: campaign.name,
        codes_generated: written,
    })
}

/// Replaces any token that already exists in the store and re-checks the replacements.
async fn reconcile_with_store<R>(
    txn: &DatabaseTransaction,
    codes: &mut [String],
    rng: &mut R,
    settings: &GenerationSettings,
) -> Result<()>
where
    R: Rng + Send + ?Sized,
{
    let chunk_size = settings.insert_batch_size.max(1);
    let mut taken: HashSet<String> = codes.iter().cloned().collect();
    let mut pending: Vec<usize> = (0..codes.len()).collect();
    let mut rounds = 0;

    loop {
        let mut collisions = HashSet::new();
        for chunk in pending.chunks(chunk_size) {
            let candidates: Vec<String> = chunk.iter().map(|&i| codes[i].clone()).collect();
            collisions.extend(
                existing_codes(txn, candidates)
                    .await
                    .map_err(|e| transaction_failed("check existing codes", &e))?,
            );
        }

        if collisions.is_empty() {
            return Ok(());
        }
        if rounds == settings.max_reconcile_rounds {
            warn!(
                "Still {} stored collisions after {} rounds",
                collisions.len(),
                rounds
            );
            return Err(Error::GenerationExhausted { attempts: rounds });
        }
        rounds += 1;

        warn!(
            "{} generated codes already exist in the store, resampling",
            collisions.len()
        );
        taken.extend(collisions.iter().cloned());

        let mut replaced = Vec::with_capacity(collisions.len());
        for &i in &pending {
            if collisions.contains(&codes[i]) {
                let fresh = codegen::generate_code(&mut *rng, &taken, settings.max_attempts)?;
                taken.insert(fresh.clone());
                codes[i] = fresh;
                replaced.push(i);
            }
        }
        pending = replaced;
    }
}

async fn existing_codes(
    txn: &DatabaseTransaction,
    candidates: Vec<String>,
) -> std::result::Result<Vec<String>, DbErr> {
    UniqueCode::find()
        .select_only()
        .column(unique_code::Column::UniqueCode)
        .filter(unique_code::Column::UniqueCode.is_in(candidates))
        .into_tuple::<String>()
        .all(txn)
        .await
}

fn transaction_failed(step: &str, err: &DbErr) -> Error {
    error!("Campaign creation failed to {}: {}", step, err);
    Error::TransactionFailed {
        message: format!("failed to {step}"),
    }
}
