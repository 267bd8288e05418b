//! Idle tycoon economy: player state, transactions, passive income, boosts,
//! market simulation and persistence.
//!
//! `Engine` is the single writer. Collaborators mutate state only through
//! `dispatch` (or the thin wrappers around it) and advance time through
//! `pump`, which the driver calls once per animation frame.

pub mod actions;
pub mod boost;
pub mod catalog;
pub mod income;
pub mod items;
pub mod logic;
pub mod market;
pub mod offline;
pub mod render;
pub mod save;
pub mod state;
pub mod stats;

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::console;
use crate::time::{Clock, Millis};

use actions::{Action, Outcome, Rejection};
use boost::{BoostConfig, BoostTimer, Transition};
use catalog::{AssetClass, Catalog};
use income::IncomeAccrual;
use logic::Ctx;
use market::PriceSimulation;
use offline::OfflineReport;
use save::{Storage, Store, StoreError};
use state::{EntryId, PlayerState, Track};

/// Tunables. `Default` matches the shipped game.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub debounce_ms: Millis,
    pub income_tick_ms: Millis,
    pub price_tick_ms: Millis,
    pub offline_cap_ms: Millis,
    pub watch_secs: u64,
    pub boost_secs: u64,
    pub storage_key: String,
    /// Fixed RNG seed for reproducible price walks. `None` seeds from the
    /// clock.
    pub rng_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: save::DEFAULT_DEBOUNCE_MS,
            income_tick_ms: income::DEFAULT_TICK_MS,
            price_tick_ms: market::DEFAULT_TICK_MS,
            offline_cap_ms: offline::DEFAULT_CAP_MS,
            watch_secs: boost::DEFAULT_WATCH_SECS,
            boost_secs: boost::DEFAULT_BOOST_SECS,
            storage_key: save::DEFAULT_STORAGE_KEY.to_string(),
            rng_seed: None,
        }
    }
}

/// What one `pump` did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PumpReport {
    pub income_credited: u64,
    pub boost_transitions: Vec<(Track, Transition)>,
    pub prices_moved: bool,
    pub saved: bool,
}

pub struct Engine {
    state: PlayerState,
    catalog: Catalog,
    config: EngineConfig,
    clock: Box<dyn Clock>,
    store: Store,
    rng: SmallRng,
    earnings_timer: BoostTimer,
    business_timer: BoostTimer,
    income: IncomeAccrual,
    prices: PriceSimulation,
    offline_report: OfflineReport,
}

impl Engine {
    /// Load the saved game (or start fresh), credit offline earnings and
    /// bring every timer in line with the current time.
    pub fn new(
        catalog: Catalog,
        config: EngineConfig,
        storage: Box<dyn Storage>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let now = clock.now_ms();
        let mut store = Store::new(storage, config.storage_key.clone(), config.debounce_ms);
        let mut state = store.load().unwrap_or_default();

        // Offline earnings read the boost timestamps as saved, so they run
        // before the tracks are settled.
        let offline_report = offline::reconcile(&mut state, &catalog, now, config.offline_cap_ms);
        if offline_report.total > 0 {
            console::info(&format!(
                "offline for {} s, earned {}",
                offline_report.elapsed_ms / 1_000,
                offline_report.total
            ));
            store.schedule(now);
        }

        let earnings_cfg = BoostConfig::new(Track::Earnings, config.watch_secs, config.boost_secs);
        let business_cfg = BoostConfig::new(Track::Business, config.watch_secs, config.boost_secs);
        boost::settle(&mut state.earnings_boost, &earnings_cfg, now);
        boost::settle(&mut state.business_boost, &business_cfg, now);

        let seed = config.rng_seed.unwrap_or(now);
        let mut engine = Self {
            state,
            catalog,
            clock,
            store,
            rng: SmallRng::seed_from_u64(seed),
            earnings_timer: BoostTimer::new(earnings_cfg),
            business_timer: BoostTimer::new(business_cfg),
            income: IncomeAccrual::new(config.income_tick_ms),
            prices: PriceSimulation::new(config.price_tick_ms),
            offline_report,
            config,
        };
        engine.resume_timers(now);
        engine
    }

    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    fn resume_timers(&mut self, now: Millis) {
        self.earnings_timer.resume(&self.state.earnings_boost, now);
        self.business_timer.resume(&self.state.business_boost, now);
        self.sync_income(now);
    }

    fn sync_income(&mut self, now: Millis) {
        let rate = income::hourly_rate(&self.state, &self.catalog);
        self.income.sync(rate, now);
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Apply one player action. A rejection leaves the state untouched and
    /// schedules nothing.
    ///
    /// Boosts and income due by now are settled first, so the action sees
    /// current state and a rate change never reprices time already passed.
    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, Rejection> {
        let now = self.now();
        self.catch_up(now, &mut PumpReport::default());
        let ctx = Ctx {
            catalog: &self.catalog,
            now,
            earnings_boost: &self.earnings_timer.cfg,
            business_boost: &self.business_timer.cfg,
        };
        let outcome = logic::apply(&mut self.state, &ctx, action)?;
        self.resume_timers(now);
        self.store.schedule(now);
        Ok(outcome)
    }

    /// Tap once. Returns the currency earned.
    pub fn tap(&mut self) -> u64 {
        let before = self.state.balance;
        match self.dispatch(Action::Tap) {
            Ok(_) => self.state.balance - before,
            Err(_) => 0,
        }
    }

    pub fn upgrade(&mut self) -> Result<(), Rejection> {
        self.dispatch(Action::Upgrade).map(|_| ())
    }

    pub fn start_ad(&mut self, track: Track) -> Result<(), Rejection> {
        self.dispatch(Action::StartAd { track }).map(|_| ())
    }

    pub fn clear_offline_earnings(&mut self) {
        // Never rejected.
        let _ = self.dispatch(Action::ClearOfflineEarnings);
    }

    /// Buy a catalog business by id and size.
    pub fn buy_business(
        &mut self,
        business_id: &str,
        size_type: &str,
        custom_name: &str,
    ) -> Result<EntryId, Rejection> {
        let business = self
            .catalog
            .business(business_id)
            .cloned()
            .ok_or_else(|| Rejection::NotInCatalog(business_id.to_string()))?;
        match self.dispatch(Action::BuyBusiness {
            business,
            size_type: size_type.to_string(),
            custom_name: custom_name.to_string(),
        })? {
            Outcome::Created(id) => Ok(id),
            _ => Err(Rejection::NotInCatalog(business_id.to_string())),
        }
    }

    /// Merge by catalog merger id.
    pub fn merge(&mut self, merger_id: &str) -> Result<(), Rejection> {
        let merger = self
            .catalog
            .merger(merger_id)
            .cloned()
            .ok_or_else(|| Rejection::NotInCatalog(merger_id.to_string()))?;
        self.dispatch(Action::MergeBusinesses { merger }).map(|_| ())
    }

    /// Trade at the current simulated price.
    pub fn buy_asset_at_market(
        &mut self,
        class: AssetClass,
        asset_id: &str,
        quantity: f64,
    ) -> Result<(), Rejection> {
        let price = self
            .asset_price(class, asset_id)
            .ok_or_else(|| Rejection::NotInCatalog(asset_id.to_string()))?;
        self.dispatch(Action::BuyAsset {
            class,
            asset_id: asset_id.to_string(),
            quantity,
            price,
        })
        .map(|_| ())
    }

    pub fn sell_asset_at_market(
        &mut self,
        class: AssetClass,
        asset_id: &str,
        quantity: f64,
    ) -> Result<u64, Rejection> {
        let price = self
            .asset_price(class, asset_id)
            .ok_or_else(|| Rejection::UnknownAsset(asset_id.to_string()))?;
        match self.dispatch(Action::SellAsset {
            class,
            asset_id: asset_id.to_string(),
            quantity,
            price,
        })? {
            Outcome::Credited(amount) => Ok(amount),
            _ => Ok(0),
        }
    }

    /// Buy a catalog item at its list price.
    pub fn buy_item(&mut self, item_id: &str) -> Result<EntryId, Rejection> {
        let item = self
            .catalog
            .item(item_id)
            .cloned()
            .ok_or_else(|| Rejection::NotInCatalog(item_id.to_string()))?;
        let total_price = item.price;
        match self.dispatch(Action::BuyItem {
            item,
            total_price,
            extra: BTreeMap::new(),
        })? {
            Outcome::Created(id) => Ok(id),
            _ => Err(Rejection::NotInCatalog(item_id.to_string())),
        }
    }

    /// Advance every timer to the current time: boost countdowns, income
    /// accrual, the gated price walk and the debounced save.
    pub fn pump(&mut self) -> PumpReport {
        let now = self.now();
        let mut report = PumpReport::default();
        self.catch_up(now, &mut report);

        if self.prices.tick(now) {
            market::step(&mut self.state, &self.catalog, &mut self.rng);
            report.prices_moved = true;
            self.store.schedule(now);
        }

        report.saved = self.store.pump(&mut self.state, now);
        report
    }

    /// Apply boost transitions and income accrual due by `now`. Each business
    /// transition takes effect at its own timestamp: ticks before it are paid
    /// at the old rate, ticks after it at the new one.
    fn catch_up(&mut self, now: Millis, report: &mut PumpReport) {
        let earnings = self
            .earnings_timer
            .catch_up(&mut self.state.earnings_boost, now);
        for (_, transition) in earnings {
            report.boost_transitions.push((Track::Earnings, transition));
            self.store.schedule(now);
        }

        while let Some(at) = self.business_timer.due(&self.state.business_boost, now) {
            self.credit_income(at, now, report);
            let transition = self.business_timer.apply(&mut self.state.business_boost, at);
            if transition == Transition::None {
                break;
            }
            report.boost_transitions.push((Track::Business, transition));
            self.store.schedule(now);
            self.sync_income(at);
        }

        self.credit_income(now, now, report);
    }

    /// Credit income ticks that fell due by `until` at the current rate.
    fn credit_income(&mut self, until: Millis, now: Millis, report: &mut PumpReport) {
        let credited = self.income.tick(until);
        if credited > 0 {
            logic::credit(&mut self.state, credited);
            report.income_credited = report.income_credited.saturating_add(credited);
            self.store.schedule(now);
        }
    }

    /// Write the state now, bypassing the debounce. Called on page hide.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let now = self.now();
        self.store.flush(&mut self.state, now)
    }

    /// Start over: default state, nothing stored.
    pub fn reset_game(&mut self) {
        let now = self.now();
        self.state = PlayerState::new();
        self.offline_report = OfflineReport::default();
        self.income.reset();
        self.store.clear();
        self.resume_timers(now);
        console::info("game reset");
    }

    /// Drop the item inventory and badges only.
    pub fn reset_items(&mut self) {
        let now = self.now();
        items::reset_items(&mut self.state);
        self.store.schedule(now);
    }

    /// The price walk only runs while the investing view is open.
    pub fn set_investing_view_active(&mut self, active: bool) {
        let now = self.now();
        self.prices.set_active(active, now);
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Offline earnings credited when this engine was constructed.
    pub fn offline_report(&self) -> &OfflineReport {
        &self.offline_report
    }

    pub fn is_investing_view_active(&self) -> bool {
        self.prices.is_active()
    }

    pub fn is_save_pending(&self) -> bool {
        self.store.is_pending()
    }

    pub fn per_click(&self) -> u64 {
        logic::per_click(&self.state)
    }

    pub fn hourly_income(&self) -> u64 {
        income::hourly_rate(&self.state, &self.catalog)
    }

    pub fn business_income_per_hour(&self) -> f64 {
        let boosted = boost::is_active(&self.state.business_boost);
        income::business_income_per_hour(&self.state, &self.catalog, boosted)
    }

    pub fn rental_income_per_hour(&self) -> u64 {
        income::rental_income_per_hour(&self.state)
    }

    pub fn is_boosted(&self, track: Track) -> bool {
        boost::is_active(self.state.boost(track))
    }

    pub fn boost_remaining_seconds(&self, track: Track) -> u64 {
        boost::remaining_seconds(self.state.boost(track), self.now())
    }

    pub fn asset_price(&self, class: AssetClass, asset_id: &str) -> Option<f64> {
        market::current_price(&self.state, &self.catalog, class, asset_id)
    }

    pub fn portfolio_value(&self) -> f64 {
        stats::portfolio_value(&self.state, &self.catalog)
    }

    pub fn net_worth(&self) -> u64 {
        stats::net_worth(&self.state, &self.catalog)
    }

    pub fn summary(&self) -> stats::Summary {
        stats::summary(&self.state, &self.catalog)
    }
}
