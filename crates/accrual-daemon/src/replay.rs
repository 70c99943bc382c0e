//! Scenario replay.
//!
//! A scenario is a TOML list of timed ledger operations. Replay builds a
//! fresh ledger from the daemon config, applies every step in order, and
//! reports each step's outcome, the final ledger snapshot, and the events
//! the ledger emitted along the way.

use std::path::Path;

use accrual_ledger::{
    AccrualEngine, InMemoryCustody, LedgerSnapshot, Result as LedgerResult, SharedLedger,
    SingleAdmin,
};
use accrual_types::AccountId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::events::{Event, EventBus, EventFilter};

/// Event buffer capacity for a replay.
pub const EVENT_BUFFER: usize = 1000;

fn default_start_time() -> u64 {
    1_700_000_000
}

/// A replayable list of operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Absolute time of offset zero.
    #[serde(default = "default_start_time")]
    pub start_time: u64,
    /// Which events to keep in the report.
    #[serde(default)]
    pub filter: EventFilter,
    /// Operations in application order.
    pub steps: Vec<Step>,
}

/// One timed operation. `at` is seconds after the scenario start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Register a vault on behalf of the configured administrator.
    Register {
        at: u64,
        vault: String,
        stake: u64,
        bid: u64,
        period: u64,
    },
    /// Periodic claim by the vault.
    Claim { at: u64, vault: String },
    /// Final claim by the vault.
    FinalClaim { at: u64, vault: String },
}

impl Step {
    fn at(&self) -> u64 {
        match self {
            Step::Register { at, .. } | Step::Claim { at, .. } | Step::FinalClaim { at, .. } => *at,
        }
    }

    fn vault(&self) -> &str {
        match self {
            Step::Register { vault, .. }
            | Step::Claim { vault, .. }
            | Step::FinalClaim { vault, .. } => vault,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            Step::Register { .. } => "register",
            Step::Claim { .. } => "claim",
            Step::FinalClaim { .. } => "final_claim",
        }
    }
}

/// Result of applying one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub action: &'static str,
    pub vault: AccountId,
    pub time: u64,
    /// Amount paid, for claims that succeeded.
    pub amount: Option<u64>,
    /// Rendered error, for steps that were rejected.
    pub error: Option<String>,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<StepOutcome>,
    pub snapshot: LedgerSnapshot,
    pub events: Vec<Event>,
    /// Sequence number of the last event published, filtered out or not.
    pub last_sequence: u64,
}

type Ledger = SharedLedger<InMemoryCustody, SingleAdmin, EventBus>;

/// Read a scenario file and replay it.
pub async fn run_file(config: &DaemonConfig, path: &Path) -> anyhow::Result<ReplayReport> {
    let content = tokio::fs::read_to_string(path).await?;
    let scenario: Scenario = toml::from_str(&content)?;
    info!(path = %path.display(), steps = scenario.steps.len(), "scenario loaded");
    run(config, &scenario)
}

/// Replay a scenario against a fresh ledger.
pub fn run(config: &DaemonConfig, scenario: &Scenario) -> anyhow::Result<ReplayReport> {
    let bus = EventBus::new(EVENT_BUFFER);
    let mut rx = bus.subscribe();

    let mut custody = InMemoryCustody::new();
    for (account, amount) in config.initial_balances() {
        custody.deposit(account, amount);
    }
    let admin = config.admin_id();
    let engine = AccrualEngine::new(
        config.ledger_params(),
        scenario.start_time,
        custody,
        SingleAdmin(admin),
        bus.clone(),
    )?;
    let ledger: Ledger = SharedLedger::new(engine);

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    let mut events = Vec::new();
    for (i, step) in scenario.steps.iter().enumerate() {
        let time = scenario.start_time.saturating_add(step.at());
        let vault = AccountId::resolve(step.vault());
        let action = step.action();

        let result = apply(&ledger, &admin, step, vault, time);
        let (amount, error) = match result {
            Ok(amount) => {
                info!(step = i, action, %vault, time, ?amount, "step applied");
                (amount, None)
            }
            Err(e) => {
                warn!(step = i, action, %vault, time, error = %e, "step rejected");
                (None, Some(e.to_string()))
            }
        };
        outcomes.push(StepOutcome {
            step: i,
            action,
            vault,
            time,
            amount,
            error,
        });
        drain_events(&mut rx, &scenario.filter, &mut events);
    }

    Ok(ReplayReport {
        outcomes,
        snapshot: ledger.snapshot()?,
        events,
        last_sequence: bus.sequence(),
    })
}

fn apply(
    ledger: &Ledger,
    admin: &AccountId,
    step: &Step,
    vault: AccountId,
    now: u64,
) -> LedgerResult<Option<u64>> {
    match step {
        Step::Register {
            stake, bid, period, ..
        } => ledger
            .register(admin, vault, *stake, *bid, *period, now)
            .map(|()| None),
        Step::Claim { .. } => ledger.claim_rewards(&vault, now).map(Some),
        Step::FinalClaim { .. } => ledger.claim_final_rewards(&vault, now).map(Some),
    }
}

fn drain_events(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    filter: &EventFilter,
    out: &mut Vec<Event>,
) {
    loop {
        match rx.try_recv() {
            Ok(event) => {
                if filter.matches(&event.event) {
                    out.push(event);
                }
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "event buffer overflowed");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}
