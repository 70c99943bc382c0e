//! Integration test: single-vault lifecycle.
//!
//! 1. Register 32 tokens of stake with a 1 token bid over 100 days
//! 2. Claim at day 50, expect about half the bid
//! 3. Final claim at day 100, expect the remaining half
//! 4. Vault is terminal; rate, stake and count return to zero
//! 5. Many small claims still add up to the bid

use accrual_ledger::{
    AccountId, AccrualEngine, InMemoryCustody, LedgerError, LedgerEvent, LedgerParams,
    RecordingSink, SingleAdmin,
};
use accrual_types::{GWEI_PER_TOKEN, SECONDS_PER_DAY};

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;
const DAY: u64 = SECONDS_PER_DAY;
const STAKE: u64 = 32 * GWEI_PER_TOKEN;
const BID: u64 = GWEI_PER_TOKEN;

type Engine = AccrualEngine<InMemoryCustody, SingleAdmin, RecordingSink>;

fn admin() -> AccountId {
    AccountId::from_label("admin")
}

fn vault() -> AccountId {
    AccountId::from_label("vault-1")
}

fn setup() -> Engine {
    let custody = InMemoryCustody::new().with_balance(admin(), 10 * GWEI_PER_TOKEN);
    let mut engine = AccrualEngine::new(
        LedgerParams::default(),
        BASE_TIME,
        custody,
        SingleAdmin(admin()),
        RecordingSink::new(),
    )
    .expect("engine");
    engine
        .register(&admin(), vault(), STAKE, BID, 100 * DAY, BASE_TIME)
        .expect("Registration should succeed");
    engine
}

fn within_one_percent(actual: u64, expected: u64) -> bool {
    let diff = actual.abs_diff(expected);
    diff * 100 <= expected
}

#[test]
fn single_vault_full_lifecycle() {
    let mut engine = setup();

    // =========================================================
    // Halfway claim
    // =========================================================
    let first = engine
        .claim_rewards(&vault(), BASE_TIME + 50 * DAY)
        .expect("Halfway claim should succeed");
    assert!(
        within_one_percent(first, BID / 2),
        "halfway claim {first} not within 1% of {}",
        BID / 2
    );

    // =========================================================
    // Final claim
    // =========================================================
    let last = engine
        .claim_final_rewards(&vault(), BASE_TIME + 100 * DAY)
        .expect("Final claim should succeed");
    assert!(within_one_percent(last, BID / 2));

    let record = engine.vault(&vault()).expect("record kept after termination");
    assert!(!record.active);

    let global = engine.global_state();
    assert_eq!(global.average_rate, 0);
    assert_eq!(global.total_active_stake, 0);
    assert_eq!(global.active_count, 0);

    // =========================================================
    // Payouts landed and never exceeded the bid
    // =========================================================
    let paid = engine.funds().balance_of(&vault());
    assert_eq!(paid, first + last);
    assert!(paid <= BID);
    assert_eq!(engine.funds().custody_balance(), BID - paid);

    // =========================================================
    // Terminal vault is inert
    // =========================================================
    assert!(matches!(
        engine.claim_rewards(&vault(), BASE_TIME + 100 * DAY),
        Err(LedgerError::VaultNotActive(_))
    ));
    assert!(matches!(
        engine.claim_final_rewards(&vault(), BASE_TIME + 101 * DAY),
        Err(LedgerError::VaultNotActive(_))
    ));
}

#[test]
fn repeated_claim_at_same_time_has_nothing() {
    let mut engine = setup();
    engine
        .claim_rewards(&vault(), BASE_TIME + 7 * DAY)
        .expect("first claim");
    assert!(matches!(
        engine.claim_rewards(&vault(), BASE_TIME + 7 * DAY),
        Err(LedgerError::NoRewardsAvailable)
    ));
}

#[test]
fn many_claims_sum_to_bid() {
    let mut engine = setup();
    let mut total = 0u64;
    let mut claims = 0u64;

    for day in (10..100).step_by(10) {
        total += engine
            .claim_rewards(&vault(), BASE_TIME + day * DAY)
            .expect("periodic claim");
        claims += 1;
    }
    total += engine
        .claim_final_rewards(&vault(), BASE_TIME + 100 * DAY)
        .expect("final claim");
    claims += 1;

    // Each claim truncates by less than one base unit
    assert!(total <= BID);
    assert!(BID - total <= claims + 1, "lost {} over {claims} claims", BID - total);
}

#[test]
fn claim_in_last_day_terminates_early() {
    let mut engine = setup();
    let owed = engine
        .claim_rewards(&vault(), BASE_TIME + 99 * DAY + 1)
        .expect("late periodic claim");
    assert!(owed > 0);

    let global = engine.global_state();
    assert_eq!(global.active_count, 0);
    assert_eq!(global.total_active_stake, 0);

    let last = engine
        .events()
        .events()
        .iter()
        .rev()
        .find(|e| e.kind() == "rewards_claimed")
        .expect("claim event");
    assert!(matches!(last, LedgerEvent::RewardsClaimed { terminal: true, .. }));
}

#[test]
fn failed_payout_leaves_no_trace() {
    let mut engine = setup();
    let before = engine.snapshot();
    let events_before = engine.events().events().len();

    engine.funds_mut().set_frozen(true);
    let err = engine
        .claim_rewards(&vault(), BASE_TIME + 20 * DAY)
        .expect_err("frozen custody");
    assert!(matches!(err, LedgerError::FundsTransferFailed(_)));

    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.events().events().len(), events_before);
}
