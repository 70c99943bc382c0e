//! Ledger parameters.

use accrual_types::{DEFAULT_STAKE_UNIT, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Tunables fixed for the lifetime of an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerParams {
    /// Stake must be a positive multiple of this.
    pub stake_unit: u64,
    /// A periodic claim this close to `end_time` terminates the vault.
    pub early_termination_window: u64,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            stake_unit: DEFAULT_STAKE_UNIT,
            early_termination_window: SECONDS_PER_DAY,
        }
    }
}
