//! Player state definitions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::catalog::{AssetClass, Improvement};
use crate::time::Millis;

/// Identifier of an owned business, property or item. Allocated from
/// `PlayerState::next_id`, unique across the whole state.
pub type EntryId = u64;

pub const DEFAULT_UPGRADE_COST: u64 = 100;

/// The two independent boost tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Track {
    /// Doubles per-tap earnings.
    Earnings,
    /// Doubles business income.
    Business,
}

impl Track {
    pub fn all() -> &'static [Track] {
        &[Track::Earnings, Track::Business]
    }

    pub fn name(self) -> &'static str {
        match self {
            Track::Earnings => "earnings",
            Track::Business => "business",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostStatus {
    #[default]
    Idle,
    Watching,
    Boosted,
}

/// Persisted state of one boost track. At most one of the two timestamps is
/// set at any time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostTrack {
    pub status: BoostStatus,
    pub boost_end_time: Option<Millis>,
    pub ad_watching_end_time: Option<Millis>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedBusiness {
    pub id: EntryId,
    pub business_id: String,
    pub size_type: String,
    pub income_per_hour: u64,
    pub purchase_cost: u64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub purchased_at: Millis,
}

/// A stock or crypto position. One per asset id, quantity always positive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub asset_id: String,
    pub quantity: f64,
    pub avg_buy_price: f64,
    #[serde(default)]
    pub purchased_at: Millis,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedProperty {
    pub own_id: EntryId,
    pub property_id: String,
    #[serde(default)]
    pub name: String,
    pub price: u64,
    pub rental_income_per_hour: u64,
    #[serde(default)]
    pub improvements: Vec<Improvement>,
    #[serde(default)]
    pub purchased_at: Millis,
}

impl OwnedProperty {
    /// Rent plus every installed improvement's bonus.
    pub fn income_per_hour(&self) -> u64 {
        self.improvements
            .iter()
            .fold(self.rental_income_per_hour, |acc, i| acc.saturating_add(i.bonus_income))
    }

    pub fn improvement_costs(&self) -> u64 {
        self.improvements
            .iter()
            .fold(0, |acc, i| acc.saturating_add(i.cost))
    }

    /// 70% of the price plus half of what went into improvements.
    pub fn sale_value(&self) -> u64 {
        // Widened so prices near u64::MAX do not overflow.
        let value = (14 * self.price as u128 + 10 * self.improvement_costs() as u128) / 20;
        u64::try_from(value).unwrap_or(u64::MAX)
    }

    pub fn has_improvement(&self, id: &str) -> bool {
        self.improvements.iter().any(|i| i.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Vehicle,
    Collectible,
    Nft,
    Island,
}

impl ItemCategory {
    pub fn all() -> &'static [ItemCategory] {
        &[
            ItemCategory::Vehicle,
            ItemCategory::Collectible,
            ItemCategory::Nft,
            ItemCategory::Island,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            ItemCategory::Vehicle => "vehicle",
            ItemCategory::Collectible => "collectible",
            ItemCategory::Nft => "nft",
            ItemCategory::Island => "island",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: EntryId,
    pub item_id: String,
    #[serde(default)]
    pub name: String,
    pub purchase_price: u64,
    #[serde(default)]
    pub purchased_at: Millis,
    /// Free-form purchase options (colour, engraving...).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl OwnedItem {
    pub fn resale_value(&self) -> u64 {
        (self.purchase_price as u128 * 7 / 10) as u64
    }
}

/// Collectible ownership and earned badges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    pub vehicles: Vec<OwnedItem>,
    pub collectibles: Vec<OwnedItem>,
    pub nfts: Vec<OwnedItem>,
    pub islands: Vec<OwnedItem>,
    pub earned_badges: BTreeSet<String>,
}

impl Inventory {
    pub fn list(&self, category: ItemCategory) -> &[OwnedItem] {
        match category {
            ItemCategory::Vehicle => &self.vehicles,
            ItemCategory::Collectible => &self.collectibles,
            ItemCategory::Nft => &self.nfts,
            ItemCategory::Island => &self.islands,
        }
    }

    pub fn list_mut(&mut self, category: ItemCategory) -> &mut Vec<OwnedItem> {
        match category {
            ItemCategory::Vehicle => &mut self.vehicles,
            ItemCategory::Collectible => &mut self.collectibles,
            ItemCategory::Nft => &mut self.nfts,
            ItemCategory::Island => &mut self.islands,
        }
    }

    pub fn all_items(&self) -> impl Iterator<Item = &OwnedItem> {
        ItemCategory::all().iter().flat_map(|c| self.list(*c).iter())
    }
}

/// Everything the engine owns and persists.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub balance: u64,
    pub level: u32,
    pub base_click_rate: u64,
    pub upgrade_cost: u64,
    pub total_clicks: u64,
    /// Unclaimed offline earnings, shown once and cleared on acknowledgement.
    /// Already included in `balance`.
    pub offline_earnings: u64,

    pub earnings_boost: BoostTrack,
    pub business_boost: BoostTrack,

    pub owned_businesses: Vec<OwnedBusiness>,
    pub merged_businesses: BTreeSet<String>,
    pub owned_stocks: Vec<Holding>,
    pub owned_crypto: Vec<Holding>,
    pub owned_properties: Vec<OwnedProperty>,

    pub stock_price_history: BTreeMap<String, f64>,
    pub crypto_price_history: BTreeMap<String, f64>,

    pub items: Inventory,

    pub last_saved: Option<Millis>,
    pub next_id: EntryId,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            balance: 0,
            level: 1,
            base_click_rate: 1,
            upgrade_cost: DEFAULT_UPGRADE_COST,
            total_clicks: 0,
            offline_earnings: 0,
            earnings_boost: BoostTrack::default(),
            business_boost: BoostTrack::default(),
            owned_businesses: Vec::new(),
            merged_businesses: BTreeSet::new(),
            owned_stocks: Vec::new(),
            owned_crypto: Vec::new(),
            owned_properties: Vec::new(),
            stock_price_history: BTreeMap::new(),
            crypto_price_history: BTreeMap::new(),
            items: Inventory::default(),
            last_saved: None,
            next_id: 1,
        }
    }

    pub fn boost(&self, track: Track) -> &BoostTrack {
        match track {
            Track::Earnings => &self.earnings_boost,
            Track::Business => &self.business_boost,
        }
    }

    pub fn boost_mut(&mut self, track: Track) -> &mut BoostTrack {
        match track {
            Track::Earnings => &mut self.earnings_boost,
            Track::Business => &mut self.business_boost,
        }
    }

    pub fn holdings(&self, class: AssetClass) -> &[Holding] {
        match class {
            AssetClass::Stock => &self.owned_stocks,
            AssetClass::Crypto => &self.owned_crypto,
        }
    }

    pub fn holdings_mut(&mut self, class: AssetClass) -> &mut Vec<Holding> {
        match class {
            AssetClass::Stock => &mut self.owned_stocks,
            AssetClass::Crypto => &mut self.owned_crypto,
        }
    }

    pub fn holding(&self, class: AssetClass, asset_id: &str) -> Option<&Holding> {
        self.holdings(class).iter().find(|h| h.asset_id == asset_id)
    }

    pub fn price_history(&self, class: AssetClass) -> &BTreeMap<String, f64> {
        match class {
            AssetClass::Stock => &self.stock_price_history,
            AssetClass::Crypto => &self.crypto_price_history,
        }
    }

    pub fn price_history_mut(&mut self, class: AssetClass) -> &mut BTreeMap<String, f64> {
        match class {
            AssetClass::Stock => &mut self.stock_price_history,
            AssetClass::Crypto => &mut self.crypto_price_history,
        }
    }

    /// Number of owned businesses of the given catalog id.
    pub fn owned_count(&self, business_id: &str) -> u32 {
        self.owned_businesses
            .iter()
            .filter(|b| b.business_id == business_id)
            .count() as u32
    }

    pub fn business(&self, id: EntryId) -> Option<&OwnedBusiness> {
        self.owned_businesses.iter().find(|b| b.id == id)
    }

    pub fn property(&self, own_id: EntryId) -> Option<&OwnedProperty> {
        self.owned_properties.iter().find(|p| p.own_id == own_id)
    }

    pub fn alloc_id(&mut self) -> EntryId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Move `next_id` past every id in use so loaded or hand-built states
    /// never hand out a duplicate.
    pub fn reseat_next_id(&mut self) {
        let max_in_use = self
            .owned_businesses
            .iter()
            .map(|b| b.id)
            .chain(self.owned_properties.iter().map(|p| p.own_id))
            .chain(self.items.all_items().map(|i| i.id))
            .max()
            .unwrap_or(0);
        self.next_id = self.next_id.max(max_in_use.saturating_add(1));
    }
}
