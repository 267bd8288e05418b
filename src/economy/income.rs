//! Passive income: hourly rate computation and the accrual ticker.

use super::boost;
use super::catalog::Catalog;
use super::state::PlayerState;
use crate::time::{IntervalTimer, Millis, HOUR_MS};

pub const DEFAULT_TICK_MS: Millis = 10_000;

/// Product of `(1 + bonus/100)` over every merged merger. Mergers missing
/// from the catalog contribute nothing.
pub fn merger_multiplier(state: &PlayerState, catalog: &Catalog) -> f64 {
    state
        .merged_businesses
        .iter()
        .filter_map(|id| catalog.merger(id))
        .map(|m| m.multiplier())
        .product()
}

/// Raw business income before mergers and boosts.
pub fn base_business_income(state: &PlayerState) -> u64 {
    state
        .owned_businesses
        .iter()
        .map(|b| b.income_per_hour)
        .fold(0, u64::saturating_add)
}

/// Business income per hour with mergers applied, doubled when `boosted`.
pub fn business_income_per_hour(state: &PlayerState, catalog: &Catalog, boosted: bool) -> f64 {
    let income = base_business_income(state) as f64 * merger_multiplier(state, catalog);
    if boosted {
        income * 2.0
    } else {
        income
    }
}

pub fn rental_income_per_hour(state: &PlayerState) -> u64 {
    state
        .owned_properties
        .iter()
        .map(|p| p.income_per_hour())
        .fold(0, u64::saturating_add)
}

/// Total hourly rate, using the live business boost.
pub fn hourly_rate(state: &PlayerState, catalog: &Catalog) -> u64 {
    let boosted = boost::is_active(&state.business_boost);
    let total = business_income_per_hour(state, catalog, boosted)
        + rental_income_per_hour(state) as f64;
    total.floor() as u64
}

/// Turns the hourly rate into per-tick credits. Fractions accumulate across
/// ticks so slow rates still pay out eventually.
#[derive(Clone, Debug)]
pub struct IncomeAccrual {
    timer: IntervalTimer,
    rate: u64,
    accumulator: f64,
}

impl IncomeAccrual {
    pub fn new(tick_ms: Millis) -> Self {
        Self {
            timer: IntervalTimer::new(tick_ms),
            rate: 0,
            accumulator: 0.0,
        }
    }

    pub fn rate(&self) -> u64 {
        self.rate
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Feed the current rate. A zero rate tears the ticker down.
    pub fn sync(&mut self, rate: u64, now: Millis) {
        self.rate = rate;
        if rate > 0 {
            self.timer.start(now);
        } else {
            self.timer.stop();
        }
    }

    /// Whole currency units earned since the last call.
    pub fn tick(&mut self, now: Millis) -> u64 {
        let fired = self.timer.poll(now);
        if fired == 0 {
            return 0;
        }
        let ticks_per_hour = HOUR_MS as f64 / self.timer.period_ms() as f64;
        let per_tick = self.rate as f64 / ticks_per_hour;
        let mut credited: u64 = 0;
        for _ in 0..fired {
            self.accumulator += per_tick;
            if self.accumulator >= 1.0 {
                let whole = self.accumulator.floor();
                self.accumulator -= whole;
                credited = credited.saturating_add(whole as u64);
            }
        }
        credited
    }

    pub fn reset(&mut self) {
        self.timer.stop();
        self.rate = 0;
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::catalog::{MergerDef, PropertyDef};
    use crate::economy::state::{BoostStatus, OwnedBusiness, OwnedProperty};

    fn business(id: u64, income: u64) -> OwnedBusiness {
        OwnedBusiness {
            id,
            business_id: "shop".into(),
            size_type: "small".into(),
            income_per_hour: income,
            purchase_cost: 1_000,
            custom_name: String::new(),
            purchased_at: 0,
        }
    }

    fn merger(id: &str, bonus_percent: f64) -> MergerDef {
        MergerDef {
            id: id.into(),
            name: id.into(),
            bonus_percent,
            requirements: vec![],
        }
    }

    fn property(rent: u64) -> OwnedProperty {
        let def = PropertyDef {
            id: "flat".into(),
            name: "Flat".into(),
            price: 10_000,
            rental_income_per_hour: rent,
            improvements: vec![],
        };
        OwnedProperty {
            own_id: 99,
            property_id: def.id,
            name: def.name,
            price: def.price,
            rental_income_per_hour: def.rental_income_per_hour,
            improvements: vec![],
            purchased_at: 0,
        }
    }

    #[test]
    fn merger_multipliers_compound() {
        let catalog = Catalog {
            mergers: vec![merger("a", 10.0), merger("b", 20.0)],
            ..Catalog::default()
        };
        let mut state = PlayerState::new();
        state.owned_businesses.push(business(1, 1_000));
        state.merged_businesses.insert("a".into());
        state.merged_businesses.insert("b".into());
        // 1000 * 1.1 * 1.2, not 1000 * 1.3
        assert_eq!(hourly_rate(&state, &catalog), 1_320);
    }

    #[test]
    fn business_boost_doubles_after_mergers_and_not_rent() {
        let catalog = Catalog {
            mergers: vec![merger("a", 50.0)],
            ..Catalog::default()
        };
        let mut state = PlayerState::new();
        state.owned_businesses.push(business(1, 100));
        state.merged_businesses.insert("a".into());
        state.owned_properties.push(property(40));
        assert_eq!(hourly_rate(&state, &catalog), 190);
        state.business_boost.status = BoostStatus::Boosted;
        state.business_boost.boost_end_time = Some(1);
        assert_eq!(hourly_rate(&state, &catalog), 340);
    }

    #[test]
    fn zero_rate_keeps_ticker_down() {
        let mut acc = IncomeAccrual::new(DEFAULT_TICK_MS);
        acc.sync(0, 0);
        assert!(!acc.is_running());
        assert_eq!(acc.tick(1_000_000), 0);
    }

    #[test]
    fn rate_dropping_to_zero_tears_down() {
        let mut acc = IncomeAccrual::new(DEFAULT_TICK_MS);
        acc.sync(3_600, 0);
        assert!(acc.is_running());
        acc.sync(0, 5_000);
        assert!(!acc.is_running());
    }

    #[test]
    fn one_hour_pays_the_hourly_rate() {
        let mut acc = IncomeAccrual::new(DEFAULT_TICK_MS);
        acc.sync(3_600, 0);
        let mut total = 0;
        for i in 1..=360 {
            total += acc.tick(i * DEFAULT_TICK_MS);
        }
        assert_eq!(total, 3_600);
    }

    #[test]
    fn slow_rate_accumulates_fractions() {
        // 36/h = 0.1 per 10 s tick
        let mut acc = IncomeAccrual::new(DEFAULT_TICK_MS);
        acc.sync(36, 0);
        let mut total = 0;
        for i in 1..=9 {
            total += acc.tick(i * DEFAULT_TICK_MS);
        }
        assert_eq!(total, 0);
        assert!(acc.accumulator() > 0.85);
        let mut credited_at = None;
        for i in 10..=11 {
            let got = acc.tick(i * DEFAULT_TICK_MS);
            if got > 0 && credited_at.is_none() {
                credited_at = Some(i);
            }
            total += got;
        }
        assert_eq!(total, 1);
        assert!(credited_at.is_some());
    }

    #[test]
    fn catch_up_after_gap_counts_every_tick() {
        let mut acc = IncomeAccrual::new(DEFAULT_TICK_MS);
        acc.sync(360, 0); // 1 per tick
        assert_eq!(acc.tick(60_000), 6);
    }
}
