//! Unique code entity - A single-use redemption token.
//!
//! Each row belongs to exactly one campaign. `used` flips from false to true at most
//! once, and `used_at` is set in the same statement. The token column carries a
//! store-level `UNIQUE` constraint, so a token identifies one row globally.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Unique code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "unique_codes")]
pub struct Model {
    /// Unique identifier assigned by the store
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning campaign
    pub campaign_id: i64,
    /// 12-digit redemption token
    #[sea_orm(unique)]
    pub unique_code: String,
    /// Reward amount, copied from the campaign's code amount at generation time
    pub amount: Decimal,
    /// Whether the code has been redeemed
    pub used: bool,
    /// When the code was redeemed, None while unused
    pub used_at: Option<DateTimeUtc>,
    /// When the code was generated
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `UniqueCode` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each code belongs to one campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id"
    )]
    Campaign,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
