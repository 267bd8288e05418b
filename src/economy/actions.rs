//! Player-initiated events and the reasons an event can be turned down.
//!
//! Every mutation a UI collaborator can request is an `Action`; the engine
//! applies them one at a time through `Engine::dispatch`.

use std::collections::BTreeMap;

use thiserror::Error;

use super::catalog::{AssetClass, BusinessDef, Improvement, ItemDef, MergerDef, PropertyDef};
use super::state::{EntryId, ItemCategory, Track};

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Tap,
    Upgrade,
    BuyBusiness {
        business: BusinessDef,
        size_type: String,
        custom_name: String,
    },
    SellBusiness {
        id: EntryId,
    },
    RenameBusiness {
        id: EntryId,
        custom_name: String,
    },
    MergeBusinesses {
        merger: MergerDef,
    },
    BuyAsset {
        class: AssetClass,
        asset_id: String,
        quantity: f64,
        price: f64,
    },
    SellAsset {
        class: AssetClass,
        asset_id: String,
        quantity: f64,
        price: f64,
    },
    BuyProperty {
        property: PropertyDef,
    },
    ImproveProperty {
        own_id: EntryId,
        improvement: Improvement,
    },
    SellProperty {
        own_id: EntryId,
    },
    BuyItem {
        item: ItemDef,
        total_price: u64,
        extra: BTreeMap<String, String>,
    },
    SellItem {
        category: ItemCategory,
        id: EntryId,
    },
    AwardBadge {
        badge_id: String,
    },
    StartAd {
        track: Track,
    },
    ClearOfflineEarnings,
}

/// What an accepted action produced, for callers that need more than
/// "it worked".
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Done,
    /// A new owned entry (business, property, item) was created.
    Created(EntryId),
    /// Currency credited by a sale.
    Credited(u64),
}

/// Expected, recoverable rejections. State is untouched whenever one of
/// these is returned.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Rejection {
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("no owned entry with id {0}")]
    UnknownId(EntryId),
    #[error("{0} is not in the catalog")]
    NotInCatalog(String),
    #[error("no holding of {0}")]
    UnknownAsset(String),
    #[error("unknown size {size_type} for business {business_id}")]
    UnknownSize {
        business_id: String,
        size_type: String,
    },
    #[error("quantity must be positive and finite")]
    InvalidQuantity,
    #[error("price must be positive and finite")]
    InvalidPrice,
    #[error("holding has {held}, cannot sell {requested}")]
    InsufficientHolding { held: f64, requested: f64 },
    #[error("merger {0} already applied")]
    AlreadyMerged(String),
    #[error("merger requirement unmet: need {needed} x {business_id}, own {owned}")]
    RequirementUnmet {
        business_id: String,
        needed: u32,
        owned: u32,
    },
    #[error("improvement {0} already installed")]
    AlreadyInstalled(String),
    #[error("badge {0} already earned")]
    AlreadyEarned(String),
    #[error("{0} boost is not idle")]
    BoostBusy(&'static str),
}
