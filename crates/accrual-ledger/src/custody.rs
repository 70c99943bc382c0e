//! In-memory custody.
//!
//! A [`FundsTransfer`] that keeps per-account balances and a single
//! custody pot. Used by the daemon's replay mode and by tests; real
//! deployments plug their own token movement in behind the same trait.

use std::collections::BTreeMap;

use crate::collaborators::{FundsTransfer, TransferError};
use crate::AccountId;

/// Account balances plus the pot held on behalf of the ledger.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCustody {
    balances: BTreeMap<AccountId, u64>,
    custody: u64,
    frozen: bool,
}

impl InMemoryCustody {
    /// Empty custody with no funded accounts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style deposit.
    pub fn with_balance(mut self, account: AccountId, amount: u64) -> Self {
        self.deposit(account, amount);
        self
    }

    /// Credit an account from outside the ledger.
    pub fn deposit(&mut self, account: AccountId, amount: u64) {
        let balance = self.balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Balance of an account.
    pub fn balance_of(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Funds currently held on behalf of the ledger.
    pub fn custody_balance(&self) -> u64 {
        self.custody
    }

    /// Refuse (or resume) every transfer.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }
}

impl FundsTransfer for InMemoryCustody {
    fn pull(&mut self, from: &AccountId, amount: u64) -> Result<(), TransferError> {
        if self.frozen {
            return Err(TransferError::Frozen);
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                account: *from,
                needed: amount,
                available,
            });
        }
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("custody overflow".to_string()))?;

        self.balances.insert(*from, available - amount);
        self.custody = custody;
        tracing::trace!(%from, amount, custody, "custody pull");
        Ok(())
    }

    fn push(&mut self, to: &AccountId, amount: u64) -> Result<(), TransferError> {
        if self.frozen {
            return Err(TransferError::Frozen);
        }
        if self.custody < amount {
            return Err(TransferError::InsufficientBalance {
                account: AccountId::ZERO,
                needed: amount,
                available: self.custody,
            });
        }

        self.custody -= amount;
        self.deposit(*to, amount);
        tracing::trace!(%to, amount, custody = self.custody, "custody push");
        Ok(())
    }
}
