//! Active-set count and running mean rate.
//!
//! The average rate is the unweighted arithmetic mean of the active vaults'
//! rates: every vault counts once regardless of its stake. It is kept in
//! O(1) by re-deriving the sum from the pre-update count on each change.

use serde::{Deserialize, Serialize};

use crate::fixed_point;
use crate::{LedgerError, Result};

/// Number of active vaults and the mean of their rates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRegistry {
    average_rate: u128,
    active_count: u64,
}

impl RateRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mean rate; zero when no vault is active.
    pub fn average_rate(&self) -> u128 {
        self.average_rate
    }

    /// Number of active vaults.
    pub fn active_count(&self) -> u64 {
        self.active_count
    }

    /// Fold a newly active vault's rate into the mean.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn on_add(&mut self, new_rate: u128) -> Result<()> {
        let count = u128::from(self.active_count);
        let average_rate = if self.active_count == 0 {
            new_rate
        } else {
            let sum = fixed_point::mul(self.average_rate, count)?
                .checked_add(new_rate)
                .ok_or(LedgerError::Overflow)?;
            sum / (count + 1)
        };
        let active_count = self
            .active_count
            .checked_add(1)
            .ok_or(LedgerError::Overflow)?;

        tracing::debug!(
            new_rate,
            old_average = self.average_rate,
            average_rate,
            active_count,
            "rate added"
        );

        self.average_rate = average_rate;
        self.active_count = active_count;
        Ok(())
    }

    /// Remove a departing vault's rate from the mean.
    ///
    /// Truncation in earlier updates can leave the re-derived sum below the
    /// departing rate. The subtraction saturates at zero instead of failing,
    /// so the mean can read zero while other vaults are still active.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the registry is already empty
    pub fn on_remove(&mut self, vault_rate: u128) -> Result<()> {
        let average_rate = match self.active_count {
            0 => return Err(LedgerError::Overflow),
            1 => 0,
            n => {
                let count = u128::from(n);
                let sum = fixed_point::mul(self.average_rate, count)?;
                sum.saturating_sub(vault_rate) / (count - 1)
            }
        };
        let active_count = self.active_count - 1;

        tracing::debug!(
            vault_rate,
            old_average = self.average_rate,
            average_rate,
            active_count,
            "rate removed"
        );

        self.average_rate = average_rate;
        self.active_count = active_count;
        Ok(())
    }
}
