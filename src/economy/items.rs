//! Collectible items (vehicles, collectibles, NFTs, islands) and badges.
//!
//! Purchases and sales are single atomic steps: the balance changes in the
//! same call that adds or removes the item.

use std::collections::BTreeMap;

use super::actions::Rejection;
use super::catalog::ItemDef;
use super::logic::{credit, debit};
use super::state::{EntryId, Inventory, ItemCategory, OwnedItem, PlayerState};
use crate::time::Millis;

/// Buy an item for `total_price` (which may include options priced by the
/// caller). Returns the id of the new owned item.
pub fn buy_item(
    state: &mut PlayerState,
    item: &ItemDef,
    total_price: u64,
    extra: BTreeMap<String, String>,
    now: Millis,
) -> Result<EntryId, Rejection> {
    debit(state, total_price)?;
    let id = state.alloc_id();
    state.items.list_mut(item.category).push(OwnedItem {
        id,
        item_id: item.id.clone(),
        name: item.name.clone(),
        purchase_price: total_price,
        purchased_at: now,
        extra,
    });
    Ok(id)
}

/// Sell an owned item for 70% of what was paid, credited immediately.
pub fn sell_item(
    state: &mut PlayerState,
    category: ItemCategory,
    id: EntryId,
) -> Result<u64, Rejection> {
    let list = state.items.list_mut(category);
    let idx = list
        .iter()
        .position(|i| i.id == id)
        .ok_or(Rejection::UnknownId(id))?;
    let sold = list.remove(idx);
    let value = sold.resale_value();
    credit(state, value);
    Ok(value)
}

pub fn award_badge(state: &mut PlayerState, badge_id: &str) -> Result<(), Rejection> {
    if !state.items.earned_badges.insert(badge_id.to_string()) {
        return Err(Rejection::AlreadyEarned(badge_id.to_string()));
    }
    Ok(())
}

pub fn owns_item(state: &PlayerState, item_id: &str) -> bool {
    state.items.all_items().any(|i| i.item_id == item_id)
}

/// Drop every owned item and badge. The rest of the game is untouched.
pub fn reset_items(state: &mut PlayerState) {
    state.items = Inventory::default();
}
