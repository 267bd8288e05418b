//! Random-walk price simulation for stocks and crypto.
//!
//! Only runs while the investing view is open. Prices are seeded lazily: an
//! asset with no history trades at its catalog base price.

use rand::Rng;

use super::catalog::{AssetClass, AssetDef, Catalog};
use super::state::PlayerState;
use crate::time::{IntervalTimer, Millis};

pub const DEFAULT_TICK_MS: Millis = 30_000;

/// Slight upward drift: the walk is centred on 0.48 rather than 0.5.
const DRIFT_CENTER: f64 = 0.48;

pub fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Current simulated price, or the catalog base price before the first tick.
pub fn current_price(
    state: &PlayerState,
    catalog: &Catalog,
    class: AssetClass,
    asset_id: &str,
) -> Option<f64> {
    state
        .price_history(class)
        .get(asset_id)
        .copied()
        .or_else(|| catalog.asset(class, asset_id).map(|a| a.base_price))
}

/// One step of the walk for a single asset. `roll` is uniform in [0, 1).
pub fn next_price(current: f64, asset: &AssetDef, class: AssetClass, roll: f64) -> f64 {
    let change = (roll - DRIFT_CENTER) * 2.0 * (asset.volatility / 100.0);
    let (lo, hi) = class.price_band();
    let moved = current * (1.0 + change);
    round_cents(moved.clamp(asset.base_price * lo, asset.base_price * hi))
}

/// Move every catalog asset one step.
pub fn step<R: Rng>(state: &mut PlayerState, catalog: &Catalog, rng: &mut R) {
    for class in [AssetClass::Stock, AssetClass::Crypto] {
        for asset in catalog.assets(class) {
            let current = state
                .price_history(class)
                .get(&asset.id)
                .copied()
                .unwrap_or(asset.base_price);
            let roll: f64 = rng.gen();
            let price = next_price(current, asset, class, roll);
            state.price_history_mut(class).insert(asset.id.clone(), price);
        }
    }
}

/// The gated 30 s ticker.
#[derive(Clone, Debug)]
pub struct PriceSimulation {
    timer: IntervalTimer,
}

impl PriceSimulation {
    pub fn new(tick_ms: Millis) -> Self {
        Self {
            timer: IntervalTimer::new(tick_ms),
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_running()
    }

    pub fn set_active(&mut self, active: bool, now: Millis) {
        if active {
            self.timer.start(now);
        } else {
            self.timer.stop();
        }
    }

    /// True when a step is due. Several missed periods still produce a
    /// single step.
    pub fn tick(&mut self, now: Millis) -> bool {
        self.timer.poll(now) > 0
    }
}
