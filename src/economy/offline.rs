//! Offline earnings: what the player earned while the app was closed.

use super::catalog::Catalog;
use super::income;
use super::state::PlayerState;
use crate::time::{Millis, HOUR_MS, SECOND_MS};

/// Catch-up never covers more than a day.
pub const DEFAULT_CAP_MS: Millis = 24 * HOUR_MS;

/// Passive tap trickle per second of absence, per unit of click rate.
const TRICKLE_PER_SECOND: f64 = 0.1;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OfflineReport {
    /// Absence actually credited, after the cap.
    pub elapsed_ms: Millis,
    pub trickle: u64,
    pub business: f64,
    pub rental: f64,
    pub total: u64,
}

/// Compute offline earnings without touching the state. Zero when the state
/// was never saved.
pub fn compute(state: &PlayerState, catalog: &Catalog, now: Millis, cap_ms: Millis) -> OfflineReport {
    let Some(last_saved) = state.last_saved else {
        return OfflineReport::default();
    };
    let elapsed_ms = now.saturating_sub(last_saved).min(cap_ms);
    let elapsed_secs = elapsed_ms as f64 / SECOND_MS as f64;
    let elapsed_hours = elapsed_ms as f64 / HOUR_MS as f64;

    let trickle = (elapsed_secs * state.base_click_rate as f64 * TRICKLE_PER_SECOND).floor() as u64;

    let hourly = income::business_income_per_hour(state, catalog, false);
    let boosted_hours = match state.business_boost.boost_end_time {
        Some(end) if end > last_saved => {
            ((end - last_saved) as f64 / HOUR_MS as f64).min(elapsed_hours)
        }
        _ => 0.0,
    };
    let business = hourly * 2.0 * boosted_hours + hourly * (elapsed_hours - boosted_hours);

    let rental = income::rental_income_per_hour(state) as f64 * elapsed_hours;

    OfflineReport {
        elapsed_ms,
        trickle,
        business,
        rental,
        total: trickle.saturating_add((business + rental).floor() as u64),
    }
}

/// Credit offline earnings to the balance and to the unclaimed pool.
pub fn reconcile(
    state: &mut PlayerState,
    catalog: &Catalog,
    now: Millis,
    cap_ms: Millis,
) -> OfflineReport {
    let report = compute(state, catalog, now, cap_ms);
    if report.total > 0 {
        state.balance = state.balance.saturating_add(report.total);
        state.offline_earnings = state.offline_earnings.saturating_add(report.total);
    }
    report
}
