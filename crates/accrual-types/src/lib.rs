//! # accrual-types
//!
//! Shared domain types used across the accrual workspace: account
//! identities, ledger notifications, and the unit and time constants the
//! ledger and its embedders agree on.

pub mod account;
pub mod events;

pub use account::{AccountId, AccountIdError};
pub use events::LedgerEvent;

/// Seconds in one day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Base units (gwei) per whole token.
pub const GWEI_PER_TOKEN: u64 = 1_000_000_000;

/// Default stake unit size: 32 whole tokens.
pub const DEFAULT_STAKE_UNIT: u64 = 32 * GWEI_PER_TOKEN;
