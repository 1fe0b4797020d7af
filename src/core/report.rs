//! Read-side views over campaigns and codes.
//!
//! Nothing here writes. A campaign's raised amount is always recomputed from its used
//! codes rather than read from the cached `current_amount` column.

use crate::{
    entities::{Campaign, UniqueCode, campaign, unique_code},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Select, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which codes a campaign detail page shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeFilter {
    /// Every code
    #[default]
    All,
    /// Redeemed codes only
    Used,
    /// Unredeemed codes only
    Unused,
}

/// A campaign together with its derived redemption figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    /// Campaign id
    pub id: i64,
    /// Campaign name
    pub name: String,
    /// Start of the campaign
    pub start_date: DateTime<Utc>,
    /// End of the campaign, if any
    pub end_date: Option<DateTime<Utc>>,
    /// Fundraising goal
    pub target_amount: Decimal,
    /// Sum of the amounts of used codes
    pub current_amount: Decimal,
    /// `current_amount` as a percentage of the goal, capped at 100
    pub progress_percent: Decimal,
    /// Codes generated for the campaign
    pub max_codes: i32,
    /// Number of code rows
    pub total_codes: u64,
    /// Number of redeemed code rows
    pub used_codes: u64,
    /// When the campaign was created
    pub created_at: DateTime<Utc>,
}

/// One page of a campaign's codes.
///
/// The code rows keep their stored column names, as in the code listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetail {
    /// The campaign and its totals
    pub campaign: CampaignSummary,
    /// Codes on this page, newest first
    pub codes: Vec<unique_code::Model>,
    /// Filter the page was built with
    pub filter: CodeFilter,
    /// 1-based page number
    pub page: u64,
    /// Codes per page
    pub page_size: u64,
    /// Codes matching the filter
    pub matching_codes: u64,
    /// Pages available for the filter
    pub total_pages: u64,
}

/// Returns every code in the store, newest first.
pub async fn list_all_codes(db: &DatabaseConnection) -> Result<Vec<unique_code::Model>> {
    UniqueCode::find()
        .order_by_desc(unique_code::Column::CreatedAt)
        .order_by_desc(unique_code::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns every campaign with its redemption totals, newest first.
pub async fn list_campaign_summaries(db: &DatabaseConnection) -> Result<Vec<CampaignSummary>> {
    let campaigns = Campaign::find()
        .order_by_desc(campaign::Column::CreatedAt)
        .order_by_desc(campaign::Column::Id)
        .all(db)
        .await?;
    let mut totals = code_totals(db, None).await?;

    Ok(campaigns
        .into_iter()
        .map(|campaign| {
            let campaign_totals = totals.remove(&campaign.id).unwrap_or_default();
            build_summary(campaign, campaign_totals)
        })
        .collect())
}

/// Computes the redemption totals for one campaign.
pub async fn summarize_campaign(
    db: &DatabaseConnection,
    campaign: campaign::Model,
) -> Result<CampaignSummary> {
    let campaign_totals = code_totals(db, Some(campaign.id))
        .await?
        .remove(&campaign.id)
        .unwrap_or_default();
    Ok(build_summary(campaign, campaign_totals))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CodeTotals {
    total_codes: u64,
    used_codes: u64,
    current_amount: Decimal,
}

/// Per-campaign code counts and redeemed sums, from two grouped queries regardless of
/// how many campaigns there are. Campaigns without codes are absent from the map.
async fn code_totals(
    db: &DatabaseConnection,
    campaign_id: Option<i64>,
) -> Result<HashMap<i64, CodeTotals>> {
    let scoped = || -> Select<UniqueCode> {
        let query = UniqueCode::find();
        match campaign_id {
            Some(id) => query.filter(unique_code::Column::CampaignId.eq(id)),
            None => query,
        }
    };

    let counts: Vec<(i64, i64)> = scoped()
        .select_only()
        .column(unique_code::Column::CampaignId)
        .column_as(unique_code::Column::Id.count(), "total_codes")
        .group_by(unique_code::Column::CampaignId)
        .into_tuple()
        .all(db)
        .await?;

    // Only campaigns with used codes form a group here, so the sum is never NULL
    let redeemed: Vec<(i64, i64, Decimal)> = scoped()
        .select_only()
        .column(unique_code::Column::CampaignId)
        .column_as(unique_code::Column::Id.count(), "used_codes")
        .column_as(unique_code::Column::Amount.sum(), "current_amount")
        .filter(unique_code::Column::Used.eq(true))
        .group_by(unique_code::Column::CampaignId)
        .into_tuple()
        .all(db)
        .await?;

    let mut totals: HashMap<i64, CodeTotals> = HashMap::with_capacity(counts.len());
    for (id, total) in counts {
        totals.entry(id).or_default().total_codes = u64::try_from(total).unwrap_or_default();
    }
    for (id, used, amount) in redeemed {
        let entry = totals.entry(id).or_default();
        entry.used_codes = u64::try_from(used).unwrap_or_default();
        entry.current_amount = amount.normalize();
    }
    Ok(totals)
}

fn build_summary(campaign: campaign::Model, totals: CodeTotals) -> CampaignSummary {
    CampaignSummary {
        progress_percent: progress_percent(totals.current_amount, campaign.target_amount),
        id: campaign.id,
        name: campaign.name,
        start_date: campaign.start_date,
        end_date: campaign.end_date,
        target_amount: campaign.target_amount,
        current_amount: totals.current_amount,
        max_codes: campaign.max_codes,
        total_codes: totals.total_codes,
        used_codes: totals.used_codes,
        created_at: campaign.created_at,
    }
}

/// Loads a campaign with one page of its codes.
///
/// `page` is 1-based; zero is treated as the first page. Pages past the end come back
/// empty rather than failing.
pub async fn get_campaign_detail(
    db: &DatabaseConnection,
    campaign_id: i64,
    page: u64,
    filter: CodeFilter,
    page_size: u64,
) -> Result<CampaignDetail> {
    let campaign = Campaign::find_by_id(campaign_id)
        .one(db)
        .await?
        .ok_or(Error::CampaignNotFound { id: campaign_id })?;
    let summary = summarize_campaign(db, campaign).await?;

    let mut query = UniqueCode::find().filter(unique_code::Column::CampaignId.eq(campaign_id));
    query = match filter {
        CodeFilter::All => query,
        CodeFilter::Used => query.filter(unique_code::Column::Used.eq(true)),
        CodeFilter::Unused => query.filter(unique_code::Column::Used.eq(false)),
    };

    let page = page.max(1);
    let page_size = page_size.max(1);
    let paginator = query
        .order_by_desc(unique_code::Column::CreatedAt)
        .order_by_desc(unique_code::Column::Id)
        .paginate(db, page_size);

    let totals = paginator.num_items_and_pages().await?;
    let codes = paginator.fetch_page(page - 1).await?;

    Ok(CampaignDetail {
        campaign: summary,
        codes,
        filter,
        page,
        page_size,
        matching_codes: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Percentage of `target` reached by `current`, rounded to two places and capped at 100.
#[must_use]
pub fn progress_percent(current: Decimal, target: Decimal) -> Decimal {
    if target <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let hundred = Decimal::ONE_HUNDRED;
    (current / target * hundred).min(hundred).round_dp(2)
}
