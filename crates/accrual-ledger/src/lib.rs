//! # accrual-ledger
//!
//! Index-based reward accrual for fixed-term vaults.
//!
//! Each vault earns at its own fixed rate over a fixed window, but payouts
//! come from a shared pool that accrues at the unweighted mean of all
//! active vault rates. A single monotonically increasing global index
//! tracks that accrual; a vault's entitlement is its stake times the index
//! delta since its last reconciliation.
//!
//! ## Modules
//!
//! - [`fixed_point`] — `SCALE` (10^27) arithmetic, multiply before divide
//! - [`index`] — Global index accumulator
//! - [`rates`] — Active-set count and running mean rate
//! - [`vaults`] — Per-vault records and the active stake total
//! - [`engine`] — Register, periodic claim, final claim
//! - [`collaborators`] — Funds transfer, admin gate, and event sink seams
//! - [`custody`] — In-memory funds transfer implementation
//! - [`shared`] — Serialized, reentrancy-guarded handle over an engine
//! - [`params`] — Ledger parameters

pub mod collaborators;
pub mod custody;
pub mod engine;
pub mod fixed_point;
pub mod index;
pub mod params;
pub mod rates;
pub mod shared;
pub mod vaults;

pub use accrual_types::{AccountId, LedgerEvent};
pub use collaborators::{
    AdminGate, EventSink, FundsTransfer, NullSink, RecordingSink, SingleAdmin, TransferError,
};
pub use custody::InMemoryCustody;
pub use engine::{AccrualEngine, GlobalState, LedgerSnapshot};
pub use params::LedgerParams;
pub use shared::SharedLedger;
pub use vaults::VaultRecord;

/// Error types for ledger operations.
///
/// Every error rejects the whole operation; no partial state is committed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The vault identity is the reserved zero id.
    #[error("invalid vault identity")]
    InvalidVaultIdentity,

    /// Stake is zero or not a multiple of the stake unit.
    #[error("stake {stake} is not a positive multiple of {unit}")]
    InvalidStakeMultiple {
        /// The offered stake.
        stake: u64,
        /// The configured stake unit.
        unit: u64,
    },

    /// Bid amount is zero.
    #[error("bid amount must be positive")]
    NonPositiveBid,

    /// Period is zero.
    #[error("period must be positive")]
    NonPositivePeriod,

    /// The vault is already registered and active.
    #[error("vault {0} is already active")]
    VaultAlreadyActive(AccountId),

    /// The vault has no record or has already terminated.
    #[error("vault {0} is not active")]
    VaultNotActive(AccountId),

    /// A periodic claim was attempted at or after the vault's end time.
    #[error("period already ended at {end_time}, now {now}; use the final claim")]
    PeriodAlreadyEnded {
        /// The vault's end time.
        end_time: u64,
        /// The claim time.
        now: u64,
    },

    /// A final claim was attempted before the vault's end time.
    #[error("period ends at {end_time}, now {now}")]
    PeriodNotYetEnded {
        /// The vault's end time.
        end_time: u64,
        /// The claim time.
        now: u64,
    },

    /// The claim would pay nothing.
    #[error("no rewards available")]
    NoRewardsAvailable,

    /// The funds-transfer collaborator refused the movement.
    #[error("funds transfer failed: {0}")]
    FundsTransferFailed(#[from] TransferError),

    /// The caller lacks the administrative capability.
    #[error("caller {0} is not authorized")]
    Unauthorized(AccountId),

    /// Checked fixed-point arithmetic overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// A mutating call arrived while another was in flight on the same ledger.
    #[error("reentrant ledger call rejected")]
    ReentrantCall,

    /// A previous holder of the shared ledger panicked.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
