//! Integration test: overlapping vaults and the unweighted mean rate.
//!
//! 1. Vault A (32 tokens, 1 token bid, 100 days) registers at t0
//! 2. Vault B (96 tokens, 4.5 token bid, 150 days) registers at t0 + 30 days
//! 3. The average rate is the plain mean of both rates
//! 4. After A's final claim the average is exactly B's rate
//! 5. B runs to completion on its own

use accrual_ledger::fixed_point::SCALE;
use accrual_ledger::{
    AccountId, AccrualEngine, InMemoryCustody, LedgerParams, NullSink, SingleAdmin,
};
use accrual_types::{GWEI_PER_TOKEN, SECONDS_PER_DAY};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;
const DAY: u64 = SECONDS_PER_DAY;

type Engine = AccrualEngine<InMemoryCustody, SingleAdmin, NullSink>;

fn admin() -> AccountId {
    AccountId::from_label("admin")
}

fn setup() -> Engine {
    let custody = InMemoryCustody::new().with_balance(admin(), 100 * GWEI_PER_TOKEN);
    AccrualEngine::new(
        LedgerParams::default(),
        BASE_TIME,
        custody,
        SingleAdmin(admin()),
        NullSink,
    )
    .expect("engine")
}

#[test]
fn staggered_vaults_share_mean_rate() {
    let mut engine = setup();
    let a = AccountId::from_label("vault-a");
    let b = AccountId::from_label("vault-b");

    engine
        .register(&admin(), a, 32 * GWEI_PER_TOKEN, GWEI_PER_TOKEN, 100 * DAY, BASE_TIME)
        .expect("register A");
    engine
        .register(
            &admin(),
            b,
            96 * GWEI_PER_TOKEN,
            4_500_000_000,
            150 * DAY,
            BASE_TIME + 30 * DAY,
        )
        .expect("register B");

    let rate_a = engine.vault(&a).expect("A").rate;
    let rate_b = engine.vault(&b).expect("B").rate;

    // =========================================================
    // Mean of two rates
    // =========================================================
    let global = engine.global_state();
    let mean = (rate_a + rate_b) / 2;
    assert!(global.average_rate.abs_diff(mean) <= 100_000_000);
    assert_eq!(global.active_count, 2);
    assert_eq!(global.total_active_stake, 128 * GWEI_PER_TOKEN);

    // =========================================================
    // A runs out
    // =========================================================
    engine
        .claim_rewards(&a, BASE_TIME + 50 * DAY)
        .expect("A halfway claim");
    engine
        .claim_final_rewards(&a, BASE_TIME + 100 * DAY)
        .expect("A final claim");

    let global = engine.global_state();
    assert_eq!(global.average_rate, rate_b);
    assert_eq!(global.active_count, 1);
    assert_eq!(global.total_active_stake, 96 * GWEI_PER_TOKEN);
    assert!(global.index > SCALE);

    // =========================================================
    // B runs to completion alone
    // =========================================================
    let mid = engine
        .claim_rewards(&b, BASE_TIME + 120 * DAY)
        .expect("B periodic claim");
    let last = engine
        .claim_final_rewards(&b, BASE_TIME + 180 * DAY)
        .expect("B final claim");
    let paid_b = mid + last;
    assert!(paid_b <= 4_500_000_000);
    assert!(4_500_000_000 - paid_b < 10);

    let global = engine.global_state();
    assert_eq!(global.average_rate, 0);
    assert_eq!(global.active_count, 0);
}

#[test]
fn survivor_keeps_its_own_rate() {
    let mut engine = setup();
    let a = AccountId::from_label("a");
    let b = AccountId::from_label("b");

    // B's bid is twice A's on the same stake and period
    engine
        .register(&admin(), a, 32 * GWEI_PER_TOKEN, GWEI_PER_TOKEN, 10 * DAY, BASE_TIME)
        .expect("register A");
    engine
        .register(
            &admin(),
            b,
            32 * GWEI_PER_TOKEN,
            2 * GWEI_PER_TOKEN,
            100 * DAY,
            BASE_TIME + DAY,
        )
        .expect("register B");

    let rate_a = engine.vault(&a).expect("A").rate;
    let rate_b = engine.vault(&b).expect("B").rate;
    assert_eq!(engine.global_state().average_rate, (rate_a + rate_b) / 2);

    engine
        .claim_final_rewards(&a, BASE_TIME + 10 * DAY)
        .expect("A final claim");

    // The two rates sum to an odd number, so the stored mean lost one unit
    assert!(engine.global_state().average_rate.abs_diff(rate_b) <= 1);
    assert_eq!(engine.active_count(), 1);
}

#[test]
fn mean_is_unweighted_by_stake() {
    let mut engine = setup();
    let small = AccountId::from_label("small");
    let large = AccountId::from_label("large");

    // Same rate per unit of stake would need 3x the bid for 3x the stake;
    // give the large vault the same bid so its rate is a third.
    engine
        .register(&admin(), small, 32 * GWEI_PER_TOKEN, 3 * GWEI_PER_TOKEN, 30 * DAY, BASE_TIME)
        .expect("register small");
    engine
        .register(&admin(), large, 96 * GWEI_PER_TOKEN, 3 * GWEI_PER_TOKEN, 30 * DAY, BASE_TIME)
        .expect("register large");

    let rate_small = engine.vault(&small).expect("small").rate;
    let rate_large = engine.vault(&large).expect("large").rate;
    let stake_weighted = (rate_small * 32 + rate_large * 96) / 128;

    let average = engine.global_state().average_rate;
    assert_eq!(average, (rate_small + rate_large) / 2);
    assert_ne!(average, stake_weighted);
}

#[test]
fn final_slice_uses_current_average() {
    // A's final slice is priced at the average in effect at claim time, even
    // though B joined after A's last update.
    let mut engine = setup();
    let a = AccountId::from_label("a");
    let b = AccountId::from_label("b");

    engine
        .register(&admin(), a, 32 * GWEI_PER_TOKEN, GWEI_PER_TOKEN, 10 * DAY, BASE_TIME)
        .expect("register A");
    engine
        .register(
            &admin(),
            b,
            32 * GWEI_PER_TOKEN,
            20 * GWEI_PER_TOKEN,
            100 * DAY,
            BASE_TIME + 5 * DAY,
        )
        .expect("register B");

    let average = engine.global_state().average_rate;
    let paid = engine
        .claim_final_rewards(&a, BASE_TIME + 10 * DAY)
        .expect("A final");

    let slice = average * u128::from(10 * DAY);
    let expected = u64::try_from(u128::from(32 * GWEI_PER_TOKEN) * slice / SCALE).expect("fits");
    assert_eq!(paid, expected);
    // More than A's own budget: the whole window is priced at the raised mean
    assert!(paid > GWEI_PER_TOKEN);
}
