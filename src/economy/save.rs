//! Persistence of the player state.
//!
//! ## Versioning
//!
//! - `SAVE_VERSION`: current document format. Bump it whenever a field is added.
//! - `MIN_COMPATIBLE_VERSION`: oldest document that can still be loaded. Only
//!   raise it for breaking changes (a field changing meaning or disappearing);
//!   added fields simply fall back to their defaults.
//!
//! ## v2 changes
//! - The item inventory moved into the same document as the game (`items`
//!   section). v1 documents load with an empty inventory.
//! - `next_id` is persisted.
//!
//! Decoding is tolerant field by field: a wrong-typed field takes its default,
//! a malformed list entry is dropped, and the `game` and `items` sections fail
//! independently. Only a document that is not a JSON object at all (or is too
//! old) is discarded as a whole.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::state::{
    BoostTrack, Holding, Inventory, OwnedBusiness, OwnedItem, OwnedProperty, PlayerState,
};
use crate::console;
use crate::time::{Debounce, Millis};

const SAVE_VERSION: u32 = 2;

const MIN_COMPATIBLE_VERSION: u32 = 1;

pub const DEFAULT_STORAGE_KEY: &str = "idle_tycoon_save";

pub const DEFAULT_DEBOUNCE_MS: Millis = 2_000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize save: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("save data is not a JSON object: {0}")]
    Corrupt(String),
    #[error("save version too old (saved={saved}, min_compatible={min})")]
    Incompatible { saved: u32, min: u32 },
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Key/value backend for the save document.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Browser `localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StoreError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Backend(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Backend(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Backend(format!("{e:?}")))
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: BTreeMap<String, String>,
    writes: usize,
    fail_writes: bool,
}

/// In-memory backend. Clones share the same entries, so a test can keep a
/// handle while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Seed a value without counting it as a write.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.inner
            .borrow_mut()
            .entries
            .insert(key.to_string(), value.to_string());
    }

    /// Make every following `set` fail, like a full quota.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.borrow_mut().fail_writes = fail;
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_writes {
            return Err(StoreError::Backend("quota exceeded".into()));
        }
        inner.entries.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.inner.borrow_mut().entries.remove(key);
        Ok(())
    }
}

// ── Document layout ──────────────────────────────────────────

#[derive(Serialize)]
struct SaveDoc<'a> {
    version: u32,
    game: GameSave<'a>,
    items: ItemsSave<'a>,
}

#[derive(Serialize)]
struct GameSave<'a> {
    balance: u64,
    level: u32,
    base_click_rate: u64,
    upgrade_cost: u64,
    total_clicks: u64,
    offline_earnings: u64,
    earnings_boost: &'a BoostTrack,
    business_boost: &'a BoostTrack,
    owned_businesses: &'a [OwnedBusiness],
    merged_businesses: &'a BTreeSet<String>,
    owned_stocks: &'a [Holding],
    owned_crypto: &'a [Holding],
    owned_properties: &'a [OwnedProperty],
    stock_price_history: &'a BTreeMap<String, f64>,
    crypto_price_history: &'a BTreeMap<String, f64>,
    last_saved: Option<Millis>,
    next_id: u64,
}

#[derive(Serialize)]
struct ItemsSave<'a> {
    vehicles: &'a [OwnedItem],
    collectibles: &'a [OwnedItem],
    nfts: &'a [OwnedItem],
    islands: &'a [OwnedItem],
    earned_badges: &'a BTreeSet<String>,
}

/// Serialize `state` as it would be saved at `now`.
pub fn encode(state: &PlayerState, now: Millis) -> Result<String, StoreError> {
    let doc = SaveDoc {
        version: SAVE_VERSION,
        game: GameSave {
            balance: state.balance,
            level: state.level,
            base_click_rate: state.base_click_rate,
            upgrade_cost: state.upgrade_cost,
            total_clicks: state.total_clicks,
            offline_earnings: state.offline_earnings,
            earnings_boost: &state.earnings_boost,
            business_boost: &state.business_boost,
            owned_businesses: &state.owned_businesses,
            merged_businesses: &state.merged_businesses,
            owned_stocks: &state.owned_stocks,
            owned_crypto: &state.owned_crypto,
            owned_properties: &state.owned_properties,
            stock_price_history: &state.stock_price_history,
            crypto_price_history: &state.crypto_price_history,
            last_saved: Some(now),
            next_id: state.next_id,
        },
        items: ItemsSave {
            vehicles: &state.items.vehicles,
            collectibles: &state.items.collectibles,
            nfts: &state.items.nfts,
            islands: &state.items.islands,
            earned_badges: &state.items.earned_badges,
        },
    };
    serde_json::to_string(&doc).map_err(StoreError::Serialize)
}

// ── Tolerant decoding ────────────────────────────────────────

fn field<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key).and_then(|v| T::deserialize(v).ok())
}

fn field_or<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str, default: T) -> T {
    field(obj, key).unwrap_or(default)
}

/// Decode a list entry by entry, skipping entries that do not fit.
fn list<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Vec<T> {
    match obj.get(key) {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|e| T::deserialize(e).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn finite_positive_prices(obj: &Map<String, Value>, key: &str) -> BTreeMap<String, f64> {
    let Some(Value::Object(prices)) = obj.get(key) else {
        return BTreeMap::new();
    };
    prices
        .iter()
        .filter_map(|(id, v)| v.as_f64().map(|p| (id.clone(), p)))
        .filter(|(_, p)| p.is_finite() && *p > 0.0)
        .collect()
}

fn clean_holdings(holdings: Vec<Holding>) -> Vec<Holding> {
    let mut seen = BTreeSet::new();
    holdings
        .into_iter()
        .filter(|h| h.quantity.is_finite() && h.quantity > 0.0 && h.avg_buy_price.is_finite())
        .filter(|h| seen.insert(h.asset_id.clone()))
        .collect()
}

fn apply_game(state: &mut PlayerState, game: &Map<String, Value>) {
    let d = PlayerState::new();
    state.balance = field_or(game, "balance", d.balance);
    state.level = field_or(game, "level", d.level);
    state.base_click_rate = field_or(game, "base_click_rate", d.base_click_rate);
    state.upgrade_cost = field_or(game, "upgrade_cost", d.upgrade_cost);
    state.total_clicks = field_or(game, "total_clicks", d.total_clicks);
    state.offline_earnings = field_or(game, "offline_earnings", d.offline_earnings);
    state.earnings_boost = field_or(game, "earnings_boost", d.earnings_boost);
    state.business_boost = field_or(game, "business_boost", d.business_boost);
    state.owned_businesses = list(game, "owned_businesses");
    state.merged_businesses = field_or(game, "merged_businesses", d.merged_businesses);
    state.owned_stocks = clean_holdings(list(game, "owned_stocks"));
    state.owned_crypto = clean_holdings(list(game, "owned_crypto"));
    state.owned_properties = list(game, "owned_properties");
    state.stock_price_history = finite_positive_prices(game, "stock_price_history");
    state.crypto_price_history = finite_positive_prices(game, "crypto_price_history");
    state.last_saved = field(game, "last_saved");
    state.next_id = field_or(game, "next_id", d.next_id);
}

fn apply_items(state: &mut PlayerState, items: &Map<String, Value>) {
    state.items = Inventory {
        vehicles: list(items, "vehicles"),
        collectibles: list(items, "collectibles"),
        nfts: list(items, "nfts"),
        islands: list(items, "islands"),
        earned_badges: field_or(items, "earned_badges", BTreeSet::new()),
    };
}

/// Drop entries whose id is already taken. Ids are unique across
/// businesses, properties and items; the first occurrence wins.
fn dedupe_ids(state: &mut PlayerState) {
    let mut seen = BTreeSet::new();
    state.owned_businesses.retain(|b| seen.insert(b.id));
    state.owned_properties.retain(|p| seen.insert(p.own_id));
    state.items.vehicles.retain(|i| seen.insert(i.id));
    state.items.collectibles.retain(|i| seen.insert(i.id));
    state.items.nfts.retain(|i| seen.insert(i.id));
    state.items.islands.retain(|i| seen.insert(i.id));
}

/// Decode a save document. Fails only when the document as a whole is
/// unusable; individual fields and sections fall back to defaults.
pub fn decode(json: &str) -> Result<PlayerState, StoreError> {
    let root: Value =
        serde_json::from_str(json).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let Value::Object(root) = root else {
        return Err(StoreError::Corrupt("top level is not an object".into()));
    };

    let version = field_or(&root, "version", MIN_COMPATIBLE_VERSION);
    if version < MIN_COMPATIBLE_VERSION {
        return Err(StoreError::Incompatible {
            saved: version,
            min: MIN_COMPATIBLE_VERSION,
        });
    }
    if version < SAVE_VERSION {
        console::info(&format!(
            "migrating save data (saved={version}, current={SAVE_VERSION})"
        ));
    }

    let mut state = PlayerState::new();
    match root.get("game") {
        Some(Value::Object(game)) => apply_game(&mut state, game),
        Some(_) => console::warn("game section is corrupt, starting it from defaults"),
        None => {}
    }
    match root.get("items") {
        Some(Value::Object(items)) => apply_items(&mut state, items),
        Some(_) => console::warn("items section is corrupt, starting it from defaults"),
        None => {}
    }

    dedupe_ids(&mut state);
    state.reseat_next_id();
    Ok(state)
}

/// Debounced writer in front of a `Storage` backend.
pub struct Store {
    backend: Box<dyn Storage>,
    key: String,
    debounce: Debounce,
}

impl Store {
    pub fn new(backend: Box<dyn Storage>, key: impl Into<String>, debounce_ms: Millis) -> Self {
        Self {
            backend,
            key: key.into(),
            debounce: Debounce::new(debounce_ms),
        }
    }

    /// Load the saved state. Absent, corrupt and incompatible documents all
    /// yield `None`; the latter two are logged and removed.
    pub fn load(&mut self) -> Option<PlayerState> {
        let json = match self.backend.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                console::error(&format!("failed to read save: {e}"));
                return None;
            }
        };
        match decode(&json) {
            Ok(state) => Some(state),
            Err(e) => {
                console::warn(&format!("discarding save data: {e}"));
                if let Err(e) = self.backend.remove(&self.key) {
                    console::warn(&format!("failed to remove save: {e}"));
                }
                None
            }
        }
    }

    /// Mark the state dirty. Repeated calls inside the window coalesce into
    /// one write.
    pub fn schedule(&mut self, now: Millis) {
        self.debounce.schedule(now);
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Write if the debounce window has passed. A failed write stays
    /// scheduled and is retried after another window.
    pub fn pump(&mut self, state: &mut PlayerState, now: Millis) -> bool {
        if !self.debounce.poll(now) {
            return false;
        }
        match self.save(state, now) {
            Ok(()) => true,
            Err(e) => {
                console::warn(&format!("save failed: {e}"));
                self.debounce.schedule(now);
                false
            }
        }
    }

    /// Write immediately, dropping any pending debounced write.
    pub fn flush(&mut self, state: &mut PlayerState, now: Millis) -> Result<(), StoreError> {
        self.debounce.cancel();
        self.save(state, now)
    }

    fn save(&mut self, state: &mut PlayerState, now: Millis) -> Result<(), StoreError> {
        let json = encode(state, now)?;
        self.backend.set(&self.key, &json)?;
        state.last_saved = Some(now);
        Ok(())
    }

    /// Remove the saved document and any pending write.
    pub fn clear(&mut self) {
        self.debounce.cancel();
        if let Err(e) = self.backend.remove(&self.key) {
            console::warn(&format!("failed to remove save: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::catalog::Improvement;
    use crate::economy::state::{BoostStatus, ItemCategory};

    const KEY: &str = DEFAULT_STORAGE_KEY;

    fn store(mem: &MemoryStorage) -> Store {
        Store::new(Box::new(mem.clone()), KEY, DEFAULT_DEBOUNCE_MS)
    }

    fn business(id: u64) -> OwnedBusiness {
        OwnedBusiness {
            id,
            business_id: "shop".into(),
            size_type: "small".into(),
            income_per_hour: 50,
            purchase_cost: 4_000,
            custom_name: "Corner".into(),
            purchased_at: 7,
        }
    }

    fn rich_state() -> PlayerState {
        let mut s = PlayerState::new();
        s.balance = 12_345;
        s.level = 3;
        s.base_click_rate = 5;
        s.upgrade_cost = 625;
        s.total_clicks = 99;
        s.business_boost = BoostTrack {
            status: BoostStatus::Boosted,
            boost_end_time: Some(60_000),
            ad_watching_end_time: None,
        };
        s.owned_businesses.push(business(1));
        s.merged_businesses.insert("retail_empire".into());
        s.owned_stocks.push(Holding {
            asset_id: "TECH".into(),
            quantity: 2.5,
            avg_buy_price: 101.25,
            purchased_at: 3,
        });
        s.owned_properties.push(OwnedProperty {
            own_id: 2,
            property_id: "studio".into(),
            name: "Studio".into(),
            price: 50_000,
            rental_income_per_hour: 40,
            improvements: vec![Improvement {
                id: "kitchen".into(),
                name: "Kitchen".into(),
                cost: 5_000,
                bonus_income: 10,
            }],
            purchased_at: 4,
        });
        s.stock_price_history.insert("TECH".into(), 104.5);
        s.items.islands.push(OwnedItem {
            id: 3,
            item_id: "atoll".into(),
            name: "Atoll".into(),
            purchase_price: 1_000_000,
            purchased_at: 5,
            extra: BTreeMap::new(),
        });
        s.items.earned_badges.insert("first_million".into());
        s.next_id = 4;
        s
    }

    #[test]
    fn encode_then_decode_keeps_everything() {
        let original = rich_state();
        let restored = decode(&encode(&original, 1_000).unwrap()).unwrap();
        let mut expected = original;
        expected.last_saved = Some(1_000);
        assert_eq!(restored, expected);
    }

    #[test]
    fn non_object_documents_are_corrupt() {
        for json in ["not json", "[1,2,3]", "42", "null"] {
            assert!(matches!(decode(json), Err(StoreError::Corrupt(_))), "{json}");
        }
    }

    #[test]
    fn version_below_min_compatible_is_rejected() {
        let json = r#"{"version":0,"game":{"balance":5}}"#;
        assert!(matches!(
            decode(json),
            Err(StoreError::Incompatible { saved: 0, min: MIN_COMPATIBLE_VERSION })
        ));
    }

    #[test]
    fn v1_document_migrates_with_empty_inventory() {
        let json = r#"{"version":1,"game":{"balance":500,"level":2}}"#;
        let s = decode(json).unwrap();
        assert_eq!(s.balance, 500);
        assert_eq!(s.level, 2);
        assert_eq!(s.items, Inventory::default());
        assert_eq!(s.upgrade_cost, PlayerState::new().upgrade_cost);
    }

    #[test]
    fn wrong_typed_fields_fall_back_individually() {
        let json = r#"{"version":2,"game":{
            "balance":"lots",
            "level":4,
            "total_clicks":-3,
            "business_boost":17,
            "merged_businesses":["m1"]
        }}"#;
        let s = decode(json).unwrap();
        assert_eq!(s.balance, 0);
        assert_eq!(s.level, 4);
        assert_eq!(s.total_clicks, 0);
        assert_eq!(s.business_boost, BoostTrack::default());
        assert!(s.merged_businesses.contains("m1"));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let json = r#"{"version":9,"theme":"dark","game":{"balance":8,"future_field":true}}"#;
        assert_eq!(decode(json).unwrap().balance, 8);
    }

    #[test]
    fn malformed_list_entries_are_dropped() {
        let good = serde_json::to_value(business(5)).unwrap();
        let json = serde_json::json!({
            "version": 2,
            "game": { "owned_businesses": [good, {"id": "x"}, 3] }
        });
        let s = decode(&json.to_string()).unwrap();
        assert_eq!(s.owned_businesses.len(), 1);
        assert_eq!(s.owned_businesses[0].id, 5);
        assert_eq!(s.next_id, 6);
    }

    #[test]
    fn extreme_numbers_decode_and_reseat_ids() {
        let mut biz = serde_json::to_value(business(u64::MAX)).unwrap();
        biz["income_per_hour"] = u64::MAX.into();
        biz["purchase_cost"] = u64::MAX.into();
        let json = serde_json::json!({
            "version": 2,
            "game": {
                "balance": u64::MAX,
                "base_click_rate": u64::MAX,
                "owned_businesses": [biz]
            }
        });
        let s = decode(&json.to_string()).unwrap();
        assert_eq!(s.balance, u64::MAX);
        assert_eq!(s.owned_businesses[0].id, u64::MAX);
        assert_eq!(s.next_id, u64::MAX);
    }

    #[test]
    fn duplicate_ids_and_empty_holdings_are_dropped() {
        let json = serde_json::json!({
            "version": 2,
            "game": {
                "owned_businesses": [business(1), business(1)],
                "owned_stocks": [
                    {"asset_id": "A", "quantity": 0.0, "avg_buy_price": 1.0},
                    {"asset_id": "B", "quantity": 2.0, "avg_buy_price": 1.0},
                    {"asset_id": "B", "quantity": 9.0, "avg_buy_price": 1.0}
                ],
                "stock_price_history": {"A": 10.0, "B": -1.0, "C": "x"}
            },
            "items": {
                "vehicles": [{"id": 1, "item_id": "car", "purchase_price": 10}]
            }
        });
        let s = decode(&json.to_string()).unwrap();
        assert_eq!(s.owned_businesses.len(), 1);
        assert_eq!(s.owned_stocks.len(), 1);
        assert_eq!(s.owned_stocks[0].quantity, 2.0);
        assert_eq!(s.stock_price_history.len(), 1);
        assert!(s.items.list(ItemCategory::Vehicle).is_empty());
    }

    #[test]
    fn sections_fail_independently() {
        let json = r#"{"version":2,"game":"garbage","items":{"earned_badges":["b"]}}"#;
        let s = decode(json).unwrap();
        assert_eq!(s.balance, 0);
        assert!(s.items.earned_badges.contains("b"));

        let json = r#"{"version":2,"game":{"balance":77},"items":[]}"#;
        let s = decode(json).unwrap();
        assert_eq!(s.balance, 77);
        assert_eq!(s.items, Inventory::default());
    }

    #[test]
    fn load_absent_is_none() {
        let mem = MemoryStorage::new();
        assert!(store(&mem).load().is_none());
    }

    #[test]
    fn load_corrupt_removes_entry() {
        let mem = MemoryStorage::new();
        mem.insert_raw(KEY, "{broken");
        assert!(store(&mem).load().is_none());
        assert!(mem.raw(KEY).is_none());
    }

    #[test]
    fn debounce_coalesces_into_one_write() {
        let mem = MemoryStorage::new();
        let mut st = store(&mem);
        let mut state = PlayerState::new();
        for t in 0..5 {
            state.balance = t;
            st.schedule(t * 100);
            assert!(!st.pump(&mut state, t * 100));
        }
        assert_eq!(mem.writes(), 0);
        assert!(!st.pump(&mut state, 2_399));
        assert!(st.pump(&mut state, 2_400));
        assert_eq!(mem.writes(), 1);
        assert_eq!(state.last_saved, Some(2_400));

        let saved = decode(&mem.raw(KEY).unwrap()).unwrap();
        assert_eq!(saved.balance, 4);
        assert!(!st.pump(&mut state, 10_000));
        assert_eq!(mem.writes(), 1);
    }

    #[test]
    fn flush_writes_now_and_cancels_pending() {
        let mem = MemoryStorage::new();
        let mut st = store(&mem);
        let mut state = PlayerState::new();
        st.schedule(0);
        st.flush(&mut state, 500).unwrap();
        assert_eq!(mem.writes(), 1);
        assert!(!st.is_pending());
        assert!(!st.pump(&mut state, 5_000));
        assert_eq!(mem.writes(), 1);
    }

    #[test]
    fn failed_write_is_retried() {
        let mem = MemoryStorage::new();
        let mut st = store(&mem);
        let mut state = PlayerState::new();
        mem.set_fail_writes(true);
        st.schedule(0);
        assert!(!st.pump(&mut state, 2_000));
        assert!(st.is_pending());
        assert_eq!(state.last_saved, None);

        mem.set_fail_writes(false);
        assert!(st.pump(&mut state, 4_000));
        assert_eq!(mem.writes(), 1);
        assert!(st.flush(&mut state, 5_000).is_ok());
    }

    #[test]
    fn clear_removes_document() {
        let mem = MemoryStorage::new();
        let mut st = store(&mem);
        let mut state = rich_state();
        st.flush(&mut state, 1).unwrap();
        st.schedule(2);
        st.clear();
        assert!(mem.raw(KEY).is_none());
        assert!(!st.is_pending());
        assert!(st.load().is_none());
    }
}
