//! External collaborators consumed by the engine.
//!
//! Custody of funds, administrative authorization and notification
//! delivery live outside the ledger. The engine only sees these traits.

use crate::{AccountId, LedgerEvent};

/// Failure reported by a [`FundsTransfer`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The source account cannot cover the amount.
    #[error("insufficient balance for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        /// Account being debited.
        account: AccountId,
        /// Requested amount.
        needed: u64,
        /// Available balance.
        available: u64,
    },

    /// Transfers are currently refused.
    #[error("transfers are frozen")]
    Frozen,

    /// The transfer was rejected for another reason.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Moves funds between accounts and the ledger's custody.
///
/// Called synchronously inside the operation that needs it; an `Err`
/// rolls back every accounting change made by that operation.
pub trait FundsTransfer {
    /// Take `amount` from `from` into custody.
    fn pull(&mut self, from: &AccountId, amount: u64) -> Result<(), TransferError>;

    /// Pay `amount` out of custody to `to`.
    fn push(&mut self, to: &AccountId, amount: u64) -> Result<(), TransferError>;
}

/// Decides who may register vaults.
pub trait AdminGate {
    /// Whether `caller` holds the administrative capability.
    fn is_admin(&self, caller: &AccountId) -> bool;
}

/// Receives committed ledger notifications.
pub trait EventSink {
    /// Deliver one event. Must not fail or block.
    fn emit(&mut self, event: LedgerEvent);
}

/// An [`AdminGate`] that trusts exactly one account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SingleAdmin(pub AccountId);

impl AdminGate for SingleAdmin {
    fn is_admin(&self, caller: &AccountId) -> bool {
        &self.0 == caller
    }
}

/// Discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: LedgerEvent) {}
}

/// Keeps every event in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Vec<LedgerEvent>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Remove and return everything emitted so far.
    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}
