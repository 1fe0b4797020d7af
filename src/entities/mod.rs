//! Entity module - Contains the SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod campaign;
pub mod unique_code;

// Re-export specific types to avoid conflicts
pub use campaign::{Column as CampaignColumn, Entity as Campaign, Model as CampaignModel};
pub use unique_code::{
    Column as UniqueCodeColumn, Entity as UniqueCode, Model as UniqueCodeModel,
};
