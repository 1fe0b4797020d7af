//! Code redemption - Flips a code from unused to used exactly once.
//!
//! Each call runs in its own database transaction whose first statement is the
//! conditional update `SET used = true WHERE unique_code = ? AND used = false`. The write
//! lock is therefore taken before anything is read: concurrent attempts on the same code
//! queue on the lock instead of failing to upgrade a read, and exactly one of them
//! matches the unused row. The row is read back afterwards only to tell a miss from a
//! repeat and to fetch the amount and campaign name.

use crate::{
    entities::{Campaign, UniqueCode, unique_code},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, DbErr, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{error, info, warn};

/// Outcome of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// Reward carried by the code
    pub amount: Decimal,
    /// Name of the campaign that issued the code
    pub campaign_name: String,
    /// Timestamp written to `used_at`
    pub validated_at: DateTime<Utc>,
}

/// Redeems `code`, returning its amount and campaign name.
///
/// Any string is accepted; tokens that do not match a stored row (including ones that
/// do not look like generated codes) yield `CodeNotFound`. Store failures roll back and
/// yield `Internal`, so callers can tell "bad code" apart from "try again later".
pub async fn redeem_code(db: &DatabaseConnection, code: &str) -> Result<Redemption> {
    if code.is_empty() {
        return Err(Error::invalid_field("unique_code", "Unique code is required"));
    }

    let txn = db
        .begin()
        .await
        .map_err(|e| internal("begin transaction", &e))?;

    match redeem_in_transaction(&txn, code).await {
        Ok(redemption) => {
            txn.commit().await.map_err(|e| internal("commit", &e))?;
            info!(
                "Redeemed code for {} from campaign '{}'",
                redemption.amount, redemption.campaign_name
            );
            Ok(redemption)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!("Rollback of redemption failed: {}", rollback_err);
            }
            match &e {
                Error::CodeNotFound | Error::AlreadyRedeemed => {
                    warn!("Redemption rejected: {}", e);
                }
                _ => error!("Redemption rolled back: {}", e),
            }
            Err(e)
        }
    }
}

async fn redeem_in_transaction(txn: &DatabaseTransaction, code: &str) -> Result<Redemption> {
    let now = Utc::now();
    let updated = UniqueCode::update_many()
        .col_expr(unique_code::Column::Used, Expr::value(true))
        .col_expr(unique_code::Column::UsedAt, Expr::value(now))
        .filter(unique_code::Column::UniqueCode.eq(code))
        .filter(unique_code::Column::Used.eq(false))
        .exec(txn)
        .await
        .map_err(|e| internal("mark code used", &e))?;

    let found = UniqueCode::find()
        .filter(unique_code::Column::UniqueCode.eq(code))
        .inner_join(Campaign)
        .select_also(Campaign)
        .one(txn)
        .await
        .map_err(|e| internal("look up code", &e))?;

    match (updated.rows_affected, found) {
        (0, None) => Err(Error::CodeNotFound),
        (0, Some(_)) => Err(Error::AlreadyRedeemed),
        (_, Some((row, Some(campaign)))) => Ok(Redemption {
            amount: row.amount,
            campaign_name: campaign.name,
            validated_at: now,
        }),
        // Flipped a row the join cannot see; the rollback undoes the flip
        _ => {
            error!("Redeemed code {} has no campaign", code);
            Err(Error::Internal {
                message: "code has no campaign".to_string(),
            })
        }
    }
}

fn internal(step: &str, err: &DbErr) -> Error {
    error!("Redemption failed to {}: {}", step, err);
    Error::Internal {
        message: format!("failed to {step}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::campaign::create_campaign, test_utils::*};
    use sea_orm::PaginatorTrait;
    use tokio::task::JoinSet;

    async fn used_count(db: &DatabaseConnection) -> Result<u64> {
        Ok(UniqueCode::find()
            .filter(unique_code::Column::Used.eq(true))
            .count(db)
            .await?)
    }

    #[tokio::test]
    async fn test_redeem_returns_amount_and_campaign() -> Result<()> {
        let (db, created, codes) = setup_with_campaign(5).await?;

        let redemption = redeem_code(&db, &codes[0]).await?;
        assert_eq!(redemption.amount, sample_spec(5).code_amount);
        assert_eq!(redemption.campaign_name, created.name);

        let row = UniqueCode::find()
            .filter(unique_code::Column::UniqueCode.eq(codes[0].as_str()))
            .one(&db)
            .await?
            .unwrap();
        assert!(row.used);
        assert!(row.used_at.is_some());
        assert_eq!(used_count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_redemption_is_rejected() -> Result<()> {
        let (db, _, codes) = setup_with_campaign(2).await?;

        redeem_code(&db, &codes[1]).await?;
        let before = UniqueCode::find()
            .filter(unique_code::Column::UniqueCode.eq(codes[1].as_str()))
            .one(&db)
            .await?
            .unwrap();

        let result = redeem_code(&db, &codes[1]).await;
        assert!(matches!(result, Err(Error::AlreadyRedeemed)));

        let after = UniqueCode::find()
            .filter(unique_code::Column::UniqueCode.eq(codes[1].as_str()))
            .one(&db)
            .await?
            .unwrap();
        assert_eq!(before.used_at, after.used_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_code_twice_mutates_nothing() -> Result<()> {
        let (db, _, _) = setup_with_campaign(3).await?;

        for _ in 0..2 {
            let result = redeem_code(&db, "999999999999x").await;
            assert!(matches!(result, Err(Error::CodeNotFound)));
        }
        assert_eq!(used_count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_arbitrary_strings_are_lookup_misses() -> Result<()> {
        let (db, _, _) = setup_with_campaign(1).await?;

        for input in ["abc", "12", "' OR 1=1 --", "0000000000000000"] {
            let result = redeem_code(&db, input).await;
            assert!(matches!(result, Err(Error::CodeNotFound)), "input {input}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_code_is_validation_error() -> Result<()> {
        let (db, _, _) = setup_with_campaign(2).await?;

        let result = redeem_code(&db, "").await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(used_count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_error() -> Result<()> {
        // No tables, so the very first statement fails
        let db = sea_orm::Database::connect("sqlite::memory:").await?;

        let result = redeem_code(&db, "123456789012").await;
        let Err(Error::Internal { message }) = result else {
            panic!("expected internal error, got {result:?}");
        };
        // Store details stay in the logs
        assert!(!message.contains("no such table"));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_of_one_code() -> Result<()> {
        const ATTEMPTS: usize = 16;
        let (db, _, codes) = setup_with_campaign(1).await?;

        let mut tasks = JoinSet::new();
        for _ in 0..ATTEMPTS {
            let db = db.clone();
            let code = codes[0].clone();
            tasks.spawn(async move { redeem_code(&db, &code).await });
        }

        let mut successes = 0;
        let mut already_redeemed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => successes += 1,
                Err(Error::AlreadyRedeemed) => already_redeemed += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(already_redeemed, ATTEMPTS - 1);
        assert_eq!(used_count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redemptions_across_pooled_connections() -> Result<()> {
        const ATTEMPTS: usize = 48;
        let (_dir, db) = setup_file_db(8).await?;
        let created = create_campaign(&db, &sample_spec(5), &small_batches()).await?;
        let codes = codes_for(&db, created.campaign_id).await?;

        for code in codes {
            let mut tasks = JoinSet::new();
            for _ in 0..ATTEMPTS {
                let db = db.clone();
                let code = code.clone();
                tasks.spawn(async move { redeem_code(&db, &code).await });
            }

            let mut successes = 0;
            let mut already_redeemed = 0;
            while let Some(joined) = tasks.join_next().await {
                match joined.unwrap() {
                    Ok(redemption) => {
                        assert_eq!(redemption.campaign_name, created.name);
                        successes += 1;
                    }
                    Err(Error::AlreadyRedeemed) => already_redeemed += 1,
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }

            assert_eq!(successes, 1);
            assert_eq!(already_redeemed, ATTEMPTS - 1);
        }
        assert_eq!(used_count(&db).await?, 5);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unknown_code_across_pooled_connections() -> Result<()> {
        let (_dir, db) = setup_file_db(4).await?;
        create_campaign(&db, &sample_spec(3), &small_batches()).await?;

        let mut tasks = JoinSet::new();
        for _ in 0..8 {
            let db = db.clone();
            tasks.spawn(async move { redeem_code(&db, "100000000000").await });
        }
        while let Some(joined) = tasks.join_next().await {
            assert!(matches!(joined.unwrap(), Err(Error::CodeNotFound)));
        }
        assert_eq!(used_count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_of_different_codes() -> Result<()> {
        let (db, _, codes) = setup_with_campaign(8).await?;

        let mut tasks = JoinSet::new();
        for code in codes {
            let db = db.clone();
            tasks.spawn(async move { redeem_code(&db, &code).await });
        }

        while let Some(joined) = tasks.join_next().await {
            assert!(joined.unwrap().is_ok());
        }
        assert_eq!(used_count(&db).await?, 8);
        Ok(())
    }
}
