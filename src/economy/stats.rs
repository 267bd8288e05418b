//! Derived values shown on the dashboard and profile screens. Nothing here
//! mutates state.

use super::catalog::{AssetClass, Catalog};
use super::income;
use super::logic;
use super::market;
use super::state::{ItemCategory, PlayerState};

/// Current value of every stock and crypto holding. Holdings whose asset is
/// unknown to the catalog and has no recorded price fall back to the buy
/// price.
pub fn portfolio_value(state: &PlayerState, catalog: &Catalog) -> f64 {
    [AssetClass::Stock, AssetClass::Crypto]
        .into_iter()
        .flat_map(|class| {
            state.holdings(class).iter().map(move |h| {
                let price = market::current_price(state, catalog, class, &h.asset_id)
                    .unwrap_or(h.avg_buy_price);
                h.quantity * price
            })
        })
        .sum()
}

pub fn business_sale_value(state: &PlayerState, catalog: &Catalog) -> u64 {
    state
        .owned_businesses
        .iter()
        .map(|b| logic::business_sell_price(catalog, b))
        .fold(0, u64::saturating_add)
}

pub fn property_sale_value(state: &PlayerState) -> u64 {
    state
        .owned_properties
        .iter()
        .map(|p| p.sale_value())
        .fold(0, u64::saturating_add)
}

pub fn item_resale_value(state: &PlayerState) -> u64 {
    state
        .items
        .all_items()
        .map(|i| i.resale_value())
        .fold(0, u64::saturating_add)
}

/// What the player would have after liquidating everything.
pub fn net_worth(state: &PlayerState, catalog: &Catalog) -> u64 {
    [
        business_sale_value(state, catalog),
        property_sale_value(state),
        item_resale_value(state),
        portfolio_value(state, catalog).floor() as u64,
    ]
    .into_iter()
    .fold(state.balance, u64::saturating_add)
}

/// Counters for the profile screen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub level: u32,
    pub total_clicks: u64,
    pub per_click: u64,
    pub hourly_income: u64,
    pub businesses: usize,
    pub mergers: usize,
    pub properties: usize,
    pub stock_positions: usize,
    pub crypto_positions: usize,
    pub items: usize,
    pub badges: usize,
    pub net_worth: u64,
}

pub fn summary(state: &PlayerState, catalog: &Catalog) -> Summary {
    Summary {
        level: state.level,
        total_clicks: state.total_clicks,
        per_click: logic::per_click(state),
        hourly_income: income::hourly_rate(state, catalog),
        businesses: state.owned_businesses.len(),
        mergers: state.merged_businesses.len(),
        properties: state.owned_properties.len(),
        stock_positions: state.owned_stocks.len(),
        crypto_positions: state.owned_crypto.len(),
        items: ItemCategory::all()
            .iter()
            .map(|c| state.items.list(*c).len())
            .sum(),
        badges: state.items.earned_badges.len(),
        net_worth: net_worth(state, catalog),
    }
}
