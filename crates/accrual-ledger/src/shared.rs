//! Serialized, reentrancy-guarded access to an engine.
//!
//! [`SharedLedger`] is a cloneable handle that runs every call inside one
//! critical section. It also remembers which thread is currently inside
//! the engine: if that same thread calls back in (typically from a funds
//! transfer collaborator paying out), the nested call is rejected with
//! [`LedgerError::ReentrantCall`] instead of deadlocking or observing a
//! half-finished operation.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::collaborators::{AdminGate, EventSink, FundsTransfer};
use crate::engine::{AccrualEngine, GlobalState, LedgerSnapshot};
use crate::vaults::VaultRecord;
use crate::{AccountId, LedgerError, Result};

/// Cloneable handle over a single [`AccrualEngine`].
pub struct SharedLedger<F, A, E> {
    engine: Arc<Mutex<AccrualEngine<F, A, E>>>,
    in_flight: Arc<Mutex<Option<ThreadId>>>,
}

impl<F, A, E> Clone for SharedLedger<F, A, E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Marks a thread as inside the engine until dropped, unwinding included.
struct InFlight<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> InFlight<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>, holder: ThreadId) -> Result<Self> {
        *slot.lock().map_err(|_| LedgerError::LockPoisoned)? = Some(holder);
        Ok(Self { slot })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<F, A, E> SharedLedger<F, A, E> {
    /// Take ownership of an engine.
    pub fn new(engine: AccrualEngine<F, A, E>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ReentrantCall`] if the current thread is already inside
    /// - [`LedgerError::LockPoisoned`] if a previous holder panicked
    pub fn with_engine<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut AccrualEngine<F, A, E>) -> Result<T>,
    ) -> Result<T> {
        let me = thread::current().id();
        if *self.in_flight.lock().map_err(|_| LedgerError::LockPoisoned)? == Some(me) {
            tracing::warn!(op, "reentrant ledger call rejected");
            return Err(LedgerError::ReentrantCall);
        }

        let mut engine = self.engine.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let _guard = InFlight::enter(&self.in_flight, me)?;
        f(&mut *engine)
    }

    /// Current global state.
    pub fn global_state(&self) -> Result<GlobalState> {
        self.with_engine("global_state", |e| Ok(e.global_state()))
    }

    /// Number of active vaults.
    pub fn active_count(&self) -> Result<u64> {
        self.with_engine("active_count", |e| Ok(e.active_count()))
    }

    /// Copy of a vault record, active or terminal.
    pub fn vault(&self, vault: &AccountId) -> Result<Option<VaultRecord>> {
        self.with_engine("vault", |e| Ok(e.vault(vault).cloned()))
    }

    /// Serializable copy of the whole ledger.
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.with_engine("snapshot", |e| Ok(e.snapshot()))
    }
}

impl<F, A, E> SharedLedger<F, A, E>
where
    F: FundsTransfer,
    A: AdminGate,
    E: EventSink,
{
    /// See [`AccrualEngine::register`].
    pub fn register(
        &self,
        caller: &AccountId,
        vault: AccountId,
        stake: u64,
        bid_amount: u64,
        period: u64,
        now: u64,
    ) -> Result<()> {
        self.with_engine("register", |e| {
            e.register(caller, vault, stake, bid_amount, period, now)
        })
    }

    /// See [`AccrualEngine::claim_rewards`].
    pub fn claim_rewards(&self, caller: &AccountId, now: u64) -> Result<u64> {
        self.with_engine("claim_rewards", |e| e.claim_rewards(caller, now))
    }

    /// See [`AccrualEngine::claim_final_rewards`].
    pub fn claim_final_rewards(&self, caller: &AccountId, now: u64) -> Result<u64> {
        self.with_engine("claim_final_rewards", |e| {
            e.claim_final_rewards(caller, now)
        })
    }

    /// See [`AccrualEngine::pending_rewards`].
    pub fn pending_rewards(&self, vault: &AccountId, now: u64) -> Result<u64> {
        self.with_engine("pending_rewards", |e| e.pending_rewards(vault, now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use accrual_types::{GWEI_PER_TOKEN, SECONDS_PER_DAY};

    use super::*;
    use crate::collaborators::{NullSink, SingleAdmin, TransferError};
    use crate::custody::InMemoryCustody;
    use crate::params::LedgerParams;

    const T0: u64 = 1_700_000_000;
    const STAKE: u64 = 32 * GWEI_PER_TOKEN;

    fn admin() -> AccountId {
        AccountId::from_label("admin")
    }

    /// Custody that tries to claim again from inside every payout.
    struct ReenteringFunds {
        inner: InMemoryCustody,
        ledger: Arc<OnceLock<SharedLedger<ReenteringFunds, SingleAdmin, NullSink>>>,
        nested: Vec<String>,
    }

    impl FundsTransfer for ReenteringFunds {
        fn pull(&mut self, from: &AccountId, amount: u64) -> std::result::Result<(), TransferError> {
            self.inner.pull(from, amount)
        }

        fn push(&mut self, to: &AccountId, amount: u64) -> std::result::Result<(), TransferError> {
            if let Some(ledger) = self.ledger.get() {
                if let Err(e) = ledger.claim_rewards(to, T0 + 2 * SECONDS_PER_DAY) {
                    self.nested.push(e.to_string());
                    return Err(TransferError::Rejected(e.to_string()));
                }
            }
            self.inner.push(to, amount)
        }
    }

    fn shared() -> SharedLedger<InMemoryCustody, SingleAdmin, NullSink> {
        let custody = InMemoryCustody::new().with_balance(admin(), 10 * GWEI_PER_TOKEN);
        let engine = AccrualEngine::new(
            LedgerParams::default(),
            T0,
            custody,
            SingleAdmin(admin()),
            NullSink,
        )
        .expect("engine");
        SharedLedger::new(engine)
    }

    #[test]
    fn test_clones_share_state() {
        let ledger = shared();
        let other = ledger.clone();
        let vault = AccountId::from_label("v");
        ledger
            .register(&admin(), vault, STAKE, GWEI_PER_TOKEN, 100 * SECONDS_PER_DAY, T0)
            .expect("register");
        assert_eq!(other.active_count().expect("count"), 1);
        assert!(other.vault(&vault).expect("lookup").is_some());
    }

    #[test]
    fn test_calls_from_many_threads_serialize() {
        let ledger = shared();
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let vault = AccountId::new([i + 1; 32]);
                    ledger.register(
                        &admin(),
                        vault,
                        STAKE,
                        GWEI_PER_TOKEN,
                        100 * SECONDS_PER_DAY,
                        T0 + u64::from(i),
                    )
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join").expect("register");
        }

        let global = ledger.global_state().expect("state");
        assert_eq!(global.active_count, 4);
        assert_eq!(global.total_active_stake, 4 * STAKE);
    }

    #[test]
    fn test_reentrant_claim_rejected_and_rolled_back() {
        let slot = Arc::new(OnceLock::new());
        let funds = ReenteringFunds {
            inner: InMemoryCustody::new().with_balance(admin(), 10 * GWEI_PER_TOKEN),
            ledger: Arc::clone(&slot),
            nested: Vec::new(),
        };
        let engine = AccrualEngine::new(
            LedgerParams::default(),
            T0,
            funds,
            SingleAdmin(admin()),
            NullSink,
        )
        .expect("engine");
        let ledger = SharedLedger::new(engine);
        assert!(slot.set(ledger.clone()).is_ok());

        let vault = AccountId::from_label("v");
        ledger
            .register(&admin(), vault, STAKE, GWEI_PER_TOKEN, 100 * SECONDS_PER_DAY, T0)
            .expect("register");
        let before = ledger.global_state().expect("state");

        let err = ledger
            .claim_rewards(&vault, T0 + SECONDS_PER_DAY)
            .expect_err("payout re-entered");
        assert!(matches!(err, LedgerError::FundsTransferFailed(_)));
        assert_eq!(ledger.global_state().expect("state"), before);

        let nested = ledger
            .with_engine("inspect", |e| Ok(e.funds().nested.clone()))
            .expect("inspect");
        assert_eq!(nested, vec![LedgerError::ReentrantCall.to_string()]);
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panic_inside_engine_reports_poisoned_lock() {
        let ledger = shared();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ledger.with_engine("explode", |_| -> Result<()> { panic!("collaborator failed") })
        }));
        assert!(outcome.is_err());

        // Same thread, after the unwind: the cause is the poisoned lock
        assert!(matches!(
            ledger.global_state(),
            Err(LedgerError::LockPoisoned)
        ));
        assert!(ledger.in_flight.lock().expect("in-flight slot").is_none());
    }
}
