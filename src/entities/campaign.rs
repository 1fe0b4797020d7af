//! Campaign entity - A fundraising campaign that owns one batch of redemption codes.
//!
//! A campaign is inserted once, in the same unit of work as its codes, and is never
//! mutated afterwards. `current_amount` is written as zero and kept only for schema
//! compatibility; read views recompute it from the used codes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    /// Unique identifier assigned by the store
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Campaign name shown to donors
    pub name: String,
    /// When the campaign starts
    pub start_date: DateTimeUtc,
    /// When the campaign ends, None for open-ended campaigns
    pub end_date: Option<DateTimeUtc>,
    /// Fundraising goal
    pub target_amount: Decimal,
    /// Cached raised amount, not authoritative
    pub current_amount: Decimal,
    /// Number of codes generated for this campaign
    pub max_codes: i32,
    /// When the campaign row was inserted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Campaign and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One campaign owns many codes
    #[sea_orm(has_many = "super::unique_code::Entity")]
    UniqueCodes,
}

impl Related<super::unique_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UniqueCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
