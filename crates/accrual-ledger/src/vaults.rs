//! Per-vault records and the active stake total.
//!
//! Records are created once per registration and never removed; a vault
//! that terminates stays in the map with `active = false`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Accounting record for one vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Staked amount in base units, a multiple of the stake unit.
    pub stake: u64,
    /// Total reward budget committed for the whole period.
    pub bid_amount: u64,
    /// Duration in seconds.
    pub period: u64,
    /// Fixed-point rate, `bid_amount * SCALE / (stake * period)`.
    pub rate: u128,
    /// Global index value last reconciled into this vault.
    pub snapshot_index: u128,
    pub start_time: u64,
    pub end_time: u64,
    /// Time of the last reconciliation.
    pub last_update_time: u64,
    pub active: bool,
}

/// Vault records keyed by identity, plus the sum of active stake.
#[derive(Clone, Debug, Default)]
pub struct VaultLedger {
    records: BTreeMap<AccountId, VaultRecord>,
    total_active_stake: u64,
}

impl VaultLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a vault record.
    pub fn get(&self, vault: &AccountId) -> Option<&VaultRecord> {
        self.records.get(vault)
    }

    /// The record for `vault` if it exists and is active.
    pub fn active(&self, vault: &AccountId) -> Option<&VaultRecord> {
        self.records.get(vault).filter(|r| r.active)
    }

    /// Sum of stake over active vaults.
    pub fn total_active_stake(&self) -> u64 {
        self.total_active_stake
    }

    /// Store a record and the stake total it was computed against.
    ///
    /// The caller derives `total_active_stake` from the same staged
    /// transaction that produced `record`, so both land together.
    pub fn commit(&mut self, vault: AccountId, record: VaultRecord, total_active_stake: u64) {
        self.records.insert(vault, record);
        self.total_active_stake = total_active_stake;
    }

    /// Iterate over all records, active and terminal.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &VaultRecord)> {
        self.records.iter()
    }

    /// Number of records ever registered (including terminal ones).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no vault was ever registered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
