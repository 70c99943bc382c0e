//! Accrual engine: register, periodic claim, final claim.
//!
//! Every mutating operation runs against a staged copy of the global state
//! and the one vault record it touches:
//!
//! 1. advance the index at the rate in effect since the last update
//! 2. apply rate and stake changes
//! 3. call the funds-transfer collaborator
//! 4. commit the stage and emit its events
//!
//! A failure at any step drops the stage, so nothing is ever half-applied.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collaborators::{AdminGate, EventSink, FundsTransfer, NullSink, SingleAdmin};
use crate::custody::InMemoryCustody;
use crate::fixed_point;
use crate::index::IndexAccumulator;
use crate::params::LedgerParams;
use crate::rates::RateRegistry;
use crate::vaults::{VaultLedger, VaultRecord};
use crate::{AccountId, LedgerError, LedgerEvent, Result};

/// Read-only copy of the global accrual state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub index: u128,
    pub last_update_time: u64,
    pub average_rate: u128,
    pub total_active_stake: u64,
    pub active_count: u64,
}

/// One vault in a [`LedgerSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub vault: AccountId,
    pub record: VaultRecord,
}

/// Serializable view of the whole ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub global: GlobalState,
    pub vaults: Vec<VaultEntry>,
}

/// Pending global changes for one operation.
struct Stage {
    accumulator: IndexAccumulator,
    rates: RateRegistry,
    total_active_stake: u64,
    events: Vec<LedgerEvent>,
}

impl Stage {
    fn advance(&mut self, now: u64) -> Result<()> {
        let advanced =
            self.accumulator
                .advance(now, self.rates.average_rate(), self.total_active_stake)?;
        if let Some(index) = advanced {
            self.events.push(LedgerEvent::IndexUpdated {
                index,
                timestamp: now,
            });
        }
        Ok(())
    }

    fn add_vault(&mut self, stake: u64, rate: u128) -> Result<()> {
        self.rates.on_add(rate)?;
        self.total_active_stake = self
            .total_active_stake
            .checked_add(stake)
            .ok_or(LedgerError::Overflow)?;
        self.push_rate_event();
        Ok(())
    }

    fn remove_vault(&mut self, stake: u64, rate: u128) -> Result<()> {
        self.total_active_stake = self
            .total_active_stake
            .checked_sub(stake)
            .ok_or(LedgerError::Overflow)?;
        self.rates.on_remove(rate)?;
        self.push_rate_event();
        Ok(())
    }

    fn push_rate_event(&mut self) {
        self.events.push(LedgerEvent::AverageRateUpdated {
            average_rate: self.rates.average_rate(),
            active_count: self.rates.active_count(),
        });
    }
}

/// Owed amount for a periodic claim: `stake * (index - snapshot) / SCALE`.
fn periodic_owed(record: &VaultRecord, index: u128) -> Result<u64> {
    let delta = index.saturating_sub(record.snapshot_index);
    fixed_point::scaled_amount(record.stake, delta)
}

/// Final slice `average_rate * (end_time - last_update_time)` and the
/// amount it pays.
///
/// Priced from the current average rate, not from an index delta: if the
/// active set changed between the vault's last update and its end time the
/// two methods disagree, and this one is what the final claim pays.
fn final_slice(record: &VaultRecord, average_rate: u128) -> Result<(u128, u64)> {
    let time_until_end = record.end_time.saturating_sub(record.last_update_time);
    let slice = fixed_point::mul(average_rate, u128::from(time_until_end))?;
    let owed = fixed_point::scaled_amount(record.stake, slice)?;
    Ok((slice, owed))
}

/// The ledger: global index, rate registry, vault records and collaborators.
pub struct AccrualEngine<F = InMemoryCustody, A = SingleAdmin, E = NullSink> {
    params: LedgerParams,
    accumulator: IndexAccumulator,
    rates: RateRegistry,
    vaults: VaultLedger,
    funds: F,
    admin: A,
    events: E,
}

impl<F, A, E> AccrualEngine<F, A, E>
where
    F: FundsTransfer,
    A: AdminGate,
    E: EventSink,
{
    /// Create an empty ledger whose index starts at 1.0 at time `now`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidStakeMultiple`] if `params.stake_unit` is zero
    pub fn new(params: LedgerParams, now: u64, funds: F, admin: A, events: E) -> Result<Self> {
        if params.stake_unit == 0 {
            return Err(LedgerError::InvalidStakeMultiple { stake: 0, unit: 0 });
        }
        Ok(Self {
            params,
            accumulator: IndexAccumulator::new(now),
            rates: RateRegistry::new(),
            vaults: VaultLedger::new(),
            funds,
            admin,
            events,
        })
    }

    /// Register a vault and take its reward budget into custody.
    ///
    /// `caller` must hold the administrative capability and funds the bid.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not an administrator
    /// - [`LedgerError::InvalidVaultIdentity`] for the zero id
    /// - [`LedgerError::VaultAlreadyActive`] if the vault is currently active
    /// - [`LedgerError::InvalidStakeMultiple`], [`LedgerError::NonPositiveBid`],
    ///   [`LedgerError::NonPositivePeriod`] on bad terms
    /// - [`LedgerError::FundsTransferFailed`] if the bid cannot be pulled
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn register(
        &mut self,
        caller: &AccountId,
        vault: AccountId,
        stake: u64,
        bid_amount: u64,
        period: u64,
        now: u64,
    ) -> Result<()> {
        if !self.admin.is_admin(caller) {
            return Err(LedgerError::Unauthorized(*caller));
        }
        if vault.is_zero() {
            return Err(LedgerError::InvalidVaultIdentity);
        }
        // Terminal records may be replaced; only an active vault blocks.
        if self.vaults.active(&vault).is_some() {
            return Err(LedgerError::VaultAlreadyActive(vault));
        }
        let unit = self.params.stake_unit;
        if stake == 0 || stake % unit != 0 {
            return Err(LedgerError::InvalidStakeMultiple { stake, unit });
        }
        if bid_amount == 0 {
            return Err(LedgerError::NonPositiveBid);
        }
        if period == 0 {
            return Err(LedgerError::NonPositivePeriod);
        }
        let end_time = now.checked_add(period).ok_or(LedgerError::Overflow)?;

        let mut stage = self.stage();
        stage.advance(now)?;
        let rate = fixed_point::vault_rate(bid_amount, stake, period)?;
        stage.add_vault(stake, rate)?;

        let record = VaultRecord {
            stake,
            bid_amount,
            period,
            rate,
            snapshot_index: stage.accumulator.index(),
            start_time: now,
            end_time,
            last_update_time: now,
            active: true,
        };

        if let Err(e) = self.funds.pull(caller, bid_amount) {
            warn!(%vault, bid_amount, error = %e, "registration rolled back");
            return Err(e.into());
        }

        stage.events.push(LedgerEvent::VaultRegistered {
            vault,
            stake,
            bid_amount,
            period,
            rate,
            start_time: now,
            end_time,
        });
        self.commit(vault, record, stage);

        info!(%vault, stake, bid_amount, period, rate, end_time, "vault registered");
        Ok(())
    }

    /// Periodic claim by the vault `caller` of everything accrued so far.
    ///
    /// A claim landing within the early-termination window of `end_time`
    /// is terminal: the vault leaves the active set.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::VaultNotActive`] if there is no active record
    /// - [`LedgerError::PeriodAlreadyEnded`] if `now >= end_time`
    /// - [`LedgerError::NoRewardsAvailable`] if nothing has accrued
    /// - [`LedgerError::FundsTransferFailed`] if the payout fails
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn claim_rewards(&mut self, caller: &AccountId, now: u64) -> Result<u64> {
        let vault = *caller;
        let mut record = self
            .vaults
            .active(&vault)
            .cloned()
            .ok_or(LedgerError::VaultNotActive(vault))?;
        if now >= record.end_time {
            return Err(LedgerError::PeriodAlreadyEnded {
                end_time: record.end_time,
                now,
            });
        }

        let mut stage = self.stage();
        stage.advance(now)?;
        let index = stage.accumulator.index();
        let owed = periodic_owed(&record, index)?;
        if owed == 0 {
            return Err(LedgerError::NoRewardsAvailable);
        }

        record.snapshot_index = index;
        record.last_update_time = now;

        let terminal =
            now.saturating_add(self.params.early_termination_window) >= record.end_time;
        if terminal {
            stage.remove_vault(record.stake, record.rate)?;
            record.active = false;
        }

        if let Err(e) = self.funds.push(&vault, owed) {
            warn!(%vault, owed, error = %e, "claim rolled back");
            return Err(e.into());
        }

        stage.events.push(LedgerEvent::RewardsClaimed {
            vault,
            amount: owed,
            index,
            timestamp: now,
            terminal,
        });
        self.commit(vault, record, stage);

        info!(%vault, owed, index, terminal, "rewards claimed");
        Ok(owed)
    }

    /// Final claim by the vault `caller` at or after its end time.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::VaultNotActive`] if there is no active record
    /// - [`LedgerError::PeriodNotYetEnded`] if `now < end_time`
    /// - [`LedgerError::NoRewardsAvailable`] if the final slice is empty
    /// - [`LedgerError::FundsTransferFailed`] if the payout fails
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn claim_final_rewards(&mut self, caller: &AccountId, now: u64) -> Result<u64> {
        let vault = *caller;
        let mut record = self
            .vaults
            .active(&vault)
            .cloned()
            .ok_or(LedgerError::VaultNotActive(vault))?;
        if now < record.end_time {
            return Err(LedgerError::PeriodNotYetEnded {
                end_time: record.end_time,
                now,
            });
        }

        let mut stage = self.stage();
        stage.advance(now)?;
        let (slice, owed) = final_slice(&record, stage.rates.average_rate())?;
        if owed == 0 {
            return Err(LedgerError::NoRewardsAvailable);
        }

        record.active = false;
        record.last_update_time = record.end_time;
        record.snapshot_index = record
            .snapshot_index
            .checked_add(slice)
            .ok_or(LedgerError::Overflow)?;
        stage.remove_vault(record.stake, record.rate)?;

        if let Err(e) = self.funds.push(&vault, owed) {
            warn!(%vault, owed, error = %e, "final claim rolled back");
            return Err(e.into());
        }

        stage.events.push(LedgerEvent::FinalRewardsClaimed {
            vault,
            amount: owed,
            timestamp: now,
        });
        self.commit(vault, record, stage);

        info!(%vault, owed, "final rewards claimed");
        Ok(owed)
    }

    /// What a claim by `vault` at `now` would pay, without changing state.
    ///
    /// Uses the periodic formula before `end_time` and the final formula
    /// from then on. Returns zero rather than failing when nothing is owed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::VaultNotActive`] if there is no active record
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn pending_rewards(&self, vault: &AccountId, now: u64) -> Result<u64> {
        let record = self
            .vaults
            .active(vault)
            .ok_or(LedgerError::VaultNotActive(*vault))?;
        let mut stage = self.stage();
        stage.advance(now)?;
        if now < record.end_time {
            periodic_owed(record, stage.accumulator.index())
        } else {
            Ok(final_slice(record, stage.rates.average_rate())?.1)
        }
    }

    fn stage(&self) -> Stage {
        Stage {
            accumulator: self.accumulator,
            rates: self.rates,
            total_active_stake: self.vaults.total_active_stake(),
            events: Vec::new(),
        }
    }

    fn commit(&mut self, vault: AccountId, record: VaultRecord, stage: Stage) {
        self.accumulator = stage.accumulator;
        self.rates = stage.rates;
        self.vaults.commit(vault, record, stage.total_active_stake);
        for event in stage.events {
            self.events.emit(event);
        }
    }
}

impl<F, A, E> AccrualEngine<F, A, E> {
    /// Parameters the engine was built with.
    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Current global state.
    pub fn global_state(&self) -> GlobalState {
        GlobalState {
            index: self.accumulator.index(),
            last_update_time: self.accumulator.last_update_time(),
            average_rate: self.rates.average_rate(),
            total_active_stake: self.vaults.total_active_stake(),
            active_count: self.rates.active_count(),
        }
    }

    /// Number of active vaults.
    pub fn active_count(&self) -> u64 {
        self.rates.active_count()
    }

    /// Look up a vault record, active or terminal.
    pub fn vault(&self, vault: &AccountId) -> Option<&VaultRecord> {
        self.vaults.get(vault)
    }

    /// All vault records.
    pub fn vaults(&self) -> impl Iterator<Item = (&AccountId, &VaultRecord)> {
        self.vaults.iter()
    }

    /// Serializable copy of the global state and every record.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            global: self.global_state(),
            vaults: self
                .vaults
                .iter()
                .map(|(vault, record)| VaultEntry {
                    vault: *vault,
                    record: record.clone(),
                })
                .collect(),
        }
    }

    /// The funds-transfer collaborator.
    pub fn funds(&self) -> &F {
        &self.funds
    }

    /// Mutable access to the funds-transfer collaborator.
    pub fn funds_mut(&mut self) -> &mut F {
        &mut self.funds
    }

    /// The event sink.
    pub fn events(&self) -> &E {
        &self.events
    }

    /// Mutable access to the event sink.
    pub fn events_mut(&mut self) -> &mut E {
        &mut self.events
    }
}
