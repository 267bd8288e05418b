//! Transaction operations: pure functions over `PlayerState`.
//!
//! Each operation validates everything up front and only then mutates, so a
//! rejection leaves the state exactly as it was. `apply` is the reducer that
//! routes an `Action` to the matching operation.

use super::actions::{Action, Outcome, Rejection};
use super::boost::{self, BoostConfig};
use super::catalog::{AssetClass, BusinessDef, Catalog, Improvement, MergerDef, PropertyDef};
use super::items;
use super::state::{EntryId, Holding, OwnedBusiness, OwnedProperty, PlayerState, Track};
use crate::time::Millis;

/// Quantities at or below this are treated as zero when selling.
const QUANTITY_EPSILON: f64 = 1e-9;

/// Everything besides the state that the reducer reads.
pub struct Ctx<'a> {
    pub catalog: &'a Catalog,
    pub now: Millis,
    pub earnings_boost: &'a BoostConfig,
    pub business_boost: &'a BoostConfig,
}

impl Ctx<'_> {
    fn boost_config(&self, track: Track) -> &BoostConfig {
        match track {
            Track::Earnings => self.earnings_boost,
            Track::Business => self.business_boost,
        }
    }
}

/// Apply one action. On `Err` the state is unchanged.
pub fn apply(state: &mut PlayerState, ctx: &Ctx, action: Action) -> Result<Outcome, Rejection> {
    match action {
        Action::Tap => {
            tap(state);
            Ok(Outcome::Done)
        }
        Action::Upgrade => upgrade(state).map(|_| Outcome::Done),
        Action::BuyBusiness {
            business,
            size_type,
            custom_name,
        } => buy_business(state, &business, &size_type, custom_name, ctx.now).map(Outcome::Created),
        Action::SellBusiness { id } => sell_business(state, ctx.catalog, id).map(Outcome::Credited),
        Action::RenameBusiness { id, custom_name } => {
            rename_business(state, id, custom_name).map(|_| Outcome::Done)
        }
        Action::MergeBusinesses { merger } => {
            merge_businesses(state, &merger).map(|_| Outcome::Done)
        }
        Action::BuyAsset {
            class,
            asset_id,
            quantity,
            price,
        } => buy_asset(state, class, &asset_id, quantity, price, ctx.now).map(|_| Outcome::Done),
        Action::SellAsset {
            class,
            asset_id,
            quantity,
            price,
        } => sell_asset(state, class, &asset_id, quantity, price).map(Outcome::Credited),
        Action::BuyProperty { property } => {
            buy_property(state, &property, ctx.now).map(Outcome::Created)
        }
        Action::ImproveProperty {
            own_id,
            improvement,
        } => improve_property(state, own_id, &improvement).map(|_| Outcome::Done),
        Action::SellProperty { own_id } => sell_property(state, own_id).map(Outcome::Credited),
        Action::BuyItem {
            item,
            total_price,
            extra,
        } => items::buy_item(state, &item, total_price, extra, ctx.now).map(Outcome::Created),
        Action::SellItem { category, id } => {
            items::sell_item(state, category, id).map(Outcome::Credited)
        }
        Action::AwardBadge { badge_id } => {
            items::award_badge(state, &badge_id).map(|_| Outcome::Done)
        }
        Action::StartAd { track } => {
            let cfg = ctx.boost_config(track);
            if boost::start_ad(state.boost_mut(track), cfg, ctx.now) {
                Ok(Outcome::Done)
            } else {
                Err(Rejection::BoostBusy(track.name()))
            }
        }
        Action::ClearOfflineEarnings => {
            state.offline_earnings = 0;
            Ok(Outcome::Done)
        }
    }
}

/// Deduct `cost` or reject without touching the balance.
pub(crate) fn debit(state: &mut PlayerState, cost: u64) -> Result<(), Rejection> {
    if state.balance < cost {
        return Err(Rejection::InsufficientFunds {
            needed: cost,
            available: state.balance,
        });
    }
    state.balance -= cost;
    Ok(())
}

pub(crate) fn credit(state: &mut PlayerState, amount: u64) {
    state.balance = state.balance.saturating_add(amount);
}

/// Currency per tap, doubled while the earnings boost runs.
pub fn per_click(state: &PlayerState) -> u64 {
    let multiplier = if boost::is_active(&state.earnings_boost) {
        2
    } else {
        1
    };
    state.base_click_rate.saturating_mul(multiplier)
}

/// Tap for currency. Never rejected. Returns the amount earned.
pub fn tap(state: &mut PlayerState) -> u64 {
    let earned = per_click(state);
    credit(state, earned);
    state.total_clicks = state.total_clicks.saturating_add(1);
    earned
}

pub fn upgrade(state: &mut PlayerState) -> Result<(), Rejection> {
    let cost = state.upgrade_cost;
    debit(state, cost)?;
    state.level = state.level.saturating_add(1);
    state.base_click_rate = state.base_click_rate.saturating_add(2);
    state.upgrade_cost = (state.upgrade_cost as f64 * 2.5).floor() as u64;
    Ok(())
}

pub fn buy_business(
    state: &mut PlayerState,
    business: &BusinessDef,
    size_type: &str,
    custom_name: String,
    now: Millis,
) -> Result<EntryId, Rejection> {
    let size = business
        .size(size_type)
        .ok_or_else(|| Rejection::UnknownSize {
            business_id: business.id.clone(),
            size_type: size_type.to_string(),
        })?;
    debit(state, size.cost)?;
    let id = state.alloc_id();
    state.owned_businesses.push(OwnedBusiness {
        id,
        business_id: business.id.clone(),
        size_type: size.size_type.clone(),
        income_per_hour: size.income_per_hour,
        purchase_cost: size.cost,
        custom_name,
        purchased_at: now,
    });
    Ok(id)
}

/// Catalog sell price for an owned business; 60% of what was paid when the
/// catalog no longer lists it.
pub fn business_sell_price(catalog: &Catalog, business: &OwnedBusiness) -> u64 {
    catalog
        .business(&business.business_id)
        .and_then(|def| def.size(&business.size_type))
        .map(|size| size.sell_price)
        .unwrap_or((business.purchase_cost as u128 * 6 / 10) as u64)
}

pub fn sell_business(
    state: &mut PlayerState,
    catalog: &Catalog,
    id: EntryId,
) -> Result<u64, Rejection> {
    let idx = state
        .owned_businesses
        .iter()
        .position(|b| b.id == id)
        .ok_or(Rejection::UnknownId(id))?;
    let sold = state.owned_businesses.remove(idx);
    let price = business_sell_price(catalog, &sold);
    credit(state, price);
    Ok(price)
}

pub fn rename_business(
    state: &mut PlayerState,
    id: EntryId,
    custom_name: String,
) -> Result<(), Rejection> {
    let business = state
        .owned_businesses
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or(Rejection::UnknownId(id))?;
    business.custom_name = custom_name;
    Ok(())
}

pub fn merge_businesses(state: &mut PlayerState, merger: &MergerDef) -> Result<(), Rejection> {
    if state.merged_businesses.contains(&merger.id) {
        return Err(Rejection::AlreadyMerged(merger.id.clone()));
    }
    for req in &merger.requirements {
        let owned = state.owned_count(&req.business_id);
        if owned < req.min_count {
            return Err(Rejection::RequirementUnmet {
                business_id: req.business_id.clone(),
                needed: req.min_count,
                owned,
            });
        }
    }
    state.merged_businesses.insert(merger.id.clone());
    Ok(())
}

fn validate_trade(quantity: f64, price: f64) -> Result<(), Rejection> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(Rejection::InvalidQuantity);
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(Rejection::InvalidPrice);
    }
    Ok(())
}

/// Buy `quantity` units at `price`. The cost is rounded up to whole
/// currency. Repeat buys fold into one holding at the weighted average.
pub fn buy_asset(
    state: &mut PlayerState,
    class: AssetClass,
    asset_id: &str,
    quantity: f64,
    price: f64,
    now: Millis,
) -> Result<u64, Rejection> {
    validate_trade(quantity, price)?;
    let cost = (quantity * price).ceil() as u64;
    debit(state, cost)?;

    let holdings = state.holdings_mut(class);
    match holdings.iter_mut().find(|h| h.asset_id == asset_id) {
        Some(h) => {
            let total = h.quantity + quantity;
            h.avg_buy_price = (h.avg_buy_price * h.quantity + price * quantity) / total;
            h.quantity = total;
        }
        None => holdings.push(Holding {
            asset_id: asset_id.to_string(),
            quantity,
            avg_buy_price: price,
            purchased_at: now,
        }),
    }
    Ok(cost)
}

/// Sell `quantity` units at `price`; proceeds are rounded down. Selling the
/// whole position removes it.
pub fn sell_asset(
    state: &mut PlayerState,
    class: AssetClass,
    asset_id: &str,
    quantity: f64,
    price: f64,
) -> Result<u64, Rejection> {
    validate_trade(quantity, price)?;
    let holdings = state.holdings_mut(class);
    let idx = holdings
        .iter()
        .position(|h| h.asset_id == asset_id)
        .ok_or_else(|| Rejection::UnknownAsset(asset_id.to_string()))?;
    let held = holdings[idx].quantity;
    if held + QUANTITY_EPSILON < quantity {
        return Err(Rejection::InsufficientHolding {
            held,
            requested: quantity,
        });
    }
    let remaining = held - quantity;
    if remaining <= QUANTITY_EPSILON {
        holdings.remove(idx);
    } else {
        holdings[idx].quantity = remaining;
    }
    let proceeds = (quantity * price).floor() as u64;
    credit(state, proceeds);
    Ok(proceeds)
}

pub fn buy_property(
    state: &mut PlayerState,
    property: &PropertyDef,
    now: Millis,
) -> Result<EntryId, Rejection> {
    debit(state, property.price)?;
    let own_id = state.alloc_id();
    state.owned_properties.push(OwnedProperty {
        own_id,
        property_id: property.id.clone(),
        name: property.name.clone(),
        price: property.price,
        rental_income_per_hour: property.rental_income_per_hour,
        improvements: Vec::new(),
        purchased_at: now,
    });
    Ok(own_id)
}

pub fn improve_property(
    state: &mut PlayerState,
    own_id: EntryId,
    improvement: &Improvement,
) -> Result<(), Rejection> {
    let idx = state
        .owned_properties
        .iter()
        .position(|p| p.own_id == own_id)
        .ok_or(Rejection::UnknownId(own_id))?;
    if state.owned_properties[idx].has_improvement(&improvement.id) {
        return Err(Rejection::AlreadyInstalled(improvement.id.clone()));
    }
    debit(state, improvement.cost)?;
    state.owned_properties[idx]
        .improvements
        .push(improvement.clone());
    Ok(())
}

pub fn sell_property(state: &mut PlayerState, own_id: EntryId) -> Result<u64, Rejection> {
    let idx = state
        .owned_properties
        .iter()
        .position(|p| p.own_id == own_id)
        .ok_or(Rejection::UnknownId(own_id))?;
    let sold = state.owned_properties.remove(idx);
    let value = sold.sale_value();
    credit(state, value);
    Ok(value)
}
