//! End-to-end economy scenarios through the public engine API only.

use idle_tycoon::economy::actions::{Action, Outcome, Rejection};
use idle_tycoon::economy::catalog::{AssetClass, Catalog};
use idle_tycoon::economy::save::{self, MemoryStorage, DEFAULT_STORAGE_KEY};
use idle_tycoon::economy::state::{BoostStatus, OwnedBusiness, PlayerState, Track};
use idle_tycoon::economy::{Engine, EngineConfig};
use idle_tycoon::time::{Clock, ManualClock, Millis, HOUR_MS, SECOND_MS};
use proptest::prelude::*;

const T0: Millis = 1_700_000_000_000;

fn engine_with(state: &PlayerState, clock: &ManualClock, mem: &MemoryStorage) -> Engine {
    mem.insert_raw(DEFAULT_STORAGE_KEY, &save::encode(state, clock.now_ms()).unwrap());
    Engine::new(
        Catalog::starter(),
        EngineConfig {
            rng_seed: Some(1),
            ..EngineConfig::default()
        },
        Box::new(mem.clone()),
        Box::new(clock.clone()),
    )
}

fn with_balance(balance: u64) -> (Engine, ManualClock, MemoryStorage) {
    let clock = ManualClock::new(T0);
    let mem = MemoryStorage::new();
    let mut state = PlayerState::new();
    state.balance = balance;
    let engine = engine_with(&state, &clock, &mem);
    (engine, clock, mem)
}

#[test]
fn tap_economy() {
    let (mut engine, _, _) = with_balance(0);
    for _ in 0..100 {
        engine.tap();
    }
    assert_eq!(engine.state().balance, 100);
    engine.upgrade().unwrap();
    assert_eq!(engine.state().balance, 0);
    assert_eq!(engine.state().level, 2);
    assert_eq!(engine.per_click(), 3);
    assert_eq!(engine.state().upgrade_cost, 250);
    assert_eq!(engine.tap(), 3);
}

#[test]
fn business_round_trip() {
    let (mut engine, _, _) = with_balance(10_000);
    let id = engine.buy_business("shop", "small", "Main St").unwrap();
    assert_eq!(engine.state().balance, 6_000);
    assert_eq!(engine.state().owned_businesses[0].custom_name, "Main St");

    engine
        .dispatch(Action::RenameBusiness {
            id,
            custom_name: "Side St".into(),
        })
        .unwrap();
    assert_eq!(engine.state().owned_businesses[0].custom_name, "Side St");

    assert_eq!(
        engine.dispatch(Action::SellBusiness { id }),
        Ok(Outcome::Credited(2_400))
    );
    assert_eq!(engine.state().balance, 8_400);
    assert_eq!(
        engine.dispatch(Action::SellBusiness { id }),
        Err(Rejection::UnknownId(id))
    );
}

#[test]
fn merger_gate() {
    let (mut engine, _, _) = with_balance(1_000_000);
    engine.buy_business("shop", "small", "").unwrap();
    engine.buy_business("shop", "small", "").unwrap();
    engine.buy_business("cardealership", "medium", "").unwrap();
    let before = engine.state().clone();
    assert_eq!(
        engine.merge("retail_empire"),
        Err(Rejection::RequirementUnmet {
            business_id: "shop".into(),
            needed: 3,
            owned: 2,
        })
    );
    assert_eq!(engine.state(), &before);

    engine.buy_business("shop", "small", "").unwrap();
    engine.merge("retail_empire").unwrap();
    assert!(engine.state().merged_businesses.contains("retail_empire"));
}

#[test]
fn offline_reconciliation_caps_at_a_day() {
    let clock = ManualClock::new(T0);
    let mem = MemoryStorage::new();
    let mut state = PlayerState::new();
    state.base_click_rate = 0;
    state.owned_businesses.push(OwnedBusiness {
        id: 1,
        business_id: "shop".into(),
        size_type: "small".into(),
        income_per_hour: 100,
        purchase_cost: 4_000,
        custom_name: String::new(),
        purchased_at: T0,
    });
    mem.insert_raw(DEFAULT_STORAGE_KEY, &save::encode(&state, T0).unwrap());

    clock.advance(48 * HOUR_MS);
    let engine = Engine::new(
        Catalog::starter(),
        EngineConfig::default(),
        Box::new(mem.clone()),
        Box::new(clock.clone()),
    );
    assert_eq!(engine.state().balance, 2_400);
    assert_eq!(engine.state().offline_earnings, 2_400);
}

#[test]
fn corrupt_save_starts_fresh() {
    let clock = ManualClock::new(T0);
    let mem = MemoryStorage::new();
    mem.insert_raw(DEFAULT_STORAGE_KEY, "{{{{");
    let engine = Engine::new(
        Catalog::starter(),
        EngineConfig::default(),
        Box::new(mem.clone()),
        Box::new(clock),
    );
    assert_eq!(engine.state(), &PlayerState::new());
    assert!(mem.raw(DEFAULT_STORAGE_KEY).is_none());
}

#[test]
fn one_write_per_burst_of_changes() {
    let (mut engine, clock, mem) = with_balance(0);
    let writes = mem.writes();
    for _ in 0..20 {
        engine.tap();
        clock.advance(50);
        engine.pump();
    }
    assert_eq!(mem.writes(), writes);
    clock.advance(2 * SECOND_MS);
    engine.pump();
    assert_eq!(mem.writes(), writes + 1);
}

#[test]
fn flush_persists_everything_for_the_next_session() {
    let (mut engine, clock, mem) = with_balance(500);
    engine
        .buy_asset_at_market(AssetClass::Crypto, "DOGE", 100.0)
        .unwrap();
    engine.start_ad(Track::Earnings).unwrap();
    engine.flush().unwrap();
    drop(engine);

    let reopened = Engine::new(
        Catalog::starter(),
        EngineConfig::default(),
        Box::new(mem),
        Box::new(clock),
    );
    let s = reopened.state();
    assert_eq!(s.balance, 475);
    assert_eq!(s.owned_crypto[0].quantity, 100.0);
    assert_eq!(s.earnings_boost.status, BoostStatus::Watching);
}

#[derive(Clone, Debug)]
enum Op {
    Tap,
    Upgrade,
    BuyBusiness(usize),
    SellFirstBusiness,
    BuyStock(u8),
    SellStock(u8),
    BuyItem(usize),
    Ad(bool),
    Wait(u32),
    ToggleInvesting,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Tap),
        Just(Op::Upgrade),
        (0usize..3).prop_map(Op::BuyBusiness),
        Just(Op::SellFirstBusiness),
        (1u8..10).prop_map(Op::BuyStock),
        (1u8..10).prop_map(Op::SellStock),
        (0usize..4).prop_map(Op::BuyItem),
        any::<bool>().prop_map(Op::Ad),
        (0u32..120_000).prop_map(Op::Wait),
        Just(Op::ToggleInvesting),
    ]
}

proptest! {
    #[test]
    fn prop_invariants_hold_over_random_sessions(
        start in 0u64..200_000,
        ops in proptest::collection::vec(arb_op(), 1..60),
    ) {
        let (mut engine, clock, _) = with_balance(start);
        for op in &ops {
            let before = engine.state().clone();
            let result: Result<(), Rejection> = match op {
                Op::Tap => { engine.tap(); Ok(()) }
                Op::Upgrade => engine.upgrade(),
                Op::BuyBusiness(i) => {
                    let def = engine.catalog().businesses[*i].clone();
                    engine.buy_business(&def.id, &def.sizes[0].size_type, "").map(|_| ())
                }
                Op::SellFirstBusiness => match engine.state().owned_businesses.first().map(|b| b.id) {
                    Some(id) => engine.dispatch(Action::SellBusiness { id }).map(|_| ()),
                    None => Ok(()),
                },
                Op::BuyStock(q) => engine.buy_asset_at_market(AssetClass::Stock, "OILX", *q as f64),
                Op::SellStock(q) => engine
                    .sell_asset_at_market(AssetClass::Stock, "OILX", *q as f64)
                    .map(|_| ()),
                Op::BuyItem(i) => {
                    let id = engine.catalog().items[*i].id.clone();
                    engine.buy_item(&id).map(|_| ())
                }
                Op::Ad(earnings) => {
                    let track = if *earnings { Track::Earnings } else { Track::Business };
                    engine.start_ad(track)
                }
                Op::Wait(ms) => {
                    clock.advance(*ms as Millis);
                    engine.pump();
                    Ok(())
                }
                Op::ToggleInvesting => {
                    let active = engine.is_investing_view_active();
                    engine.set_investing_view_active(!active);
                    Ok(())
                }
            };
            if result.is_err() {
                prop_assert_eq!(engine.state(), &before, "rejected {:?} changed state", op);
            }

            let s = engine.state();
            prop_assert!(s.owned_stocks.iter().all(|h| h.quantity > 0.0));
            for track in Track::all() {
                let b = s.boost(*track);
                prop_assert!(!(b.boost_end_time.is_some() && b.ad_watching_end_time.is_some()));
            }
            let mut ids: Vec<u64> = s.owned_businesses.iter().map(|b| b.id)
                .chain(s.items.all_items().map(|i| i.id))
                .collect();
            let n = ids.len();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), n);
            for (id, price) in &s.stock_price_history {
                let base = engine.catalog().asset(AssetClass::Stock, id).map(|a| a.base_price).unwrap_or(*price);
                prop_assert!(*price >= base * 0.5 - 0.005 && *price <= base * 2.0 + 0.005);
            }
        }
    }
}
