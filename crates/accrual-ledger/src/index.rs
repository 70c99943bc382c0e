//! Global index accumulator.
//!
//! The index starts at [`SCALE`] (1.0) and grows by `average_rate * elapsed`
//! every time it is advanced. A vault owes `stake * (index - snapshot) / SCALE`
//! for any interval it was active, so advancing must happen before any rate
//! or stake change so the interval is priced at the rate that was in effect.

use serde::{Deserialize, Serialize};

use crate::fixed_point::{self, SCALE};
use crate::{LedgerError, Result};

/// The global index and the time it was last advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAccumulator {
    index: u128,
    last_update_time: u64,
}

impl IndexAccumulator {
    /// Start a fresh accumulator at index 1.0.
    pub fn new(now: u64) -> Self {
        Self {
            index: SCALE,
            last_update_time: now,
        }
    }

    /// Current index value.
    pub fn index(&self) -> u128 {
        self.index
    }

    /// Time of the last advance.
    pub fn last_update_time(&self) -> u64 {
        self.last_update_time
    }

    /// Advance the index to `now` at `average_rate`.
    ///
    /// No-op when no time has passed or the pool holds no stake. An idle
    /// stretch leaves `last_update_time` behind, so the next advance with
    /// stake prices it at the rate in effect then.
    ///
    /// Returns the new index when it changed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] if the accrued amount overflows
    pub fn advance(
        &mut self,
        now: u64,
        average_rate: u128,
        total_active_stake: u64,
    ) -> Result<Option<u128>> {
        if now <= self.last_update_time || total_active_stake == 0 {
            return Ok(None);
        }

        let elapsed = now - self.last_update_time;
        let accrued = fixed_point::mul(average_rate, u128::from(elapsed))?;
        let index = self
            .index
            .checked_add(accrued)
            .ok_or(LedgerError::Overflow)?;

        tracing::debug!(
            elapsed,
            average_rate,
            old_index = self.index,
            new_index = index,
            "index advanced"
        );

        self.index = index;
        self.last_update_time = now;
        Ok(Some(index))
    }
}
