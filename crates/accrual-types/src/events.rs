//! Ledger notifications.
//!
//! The ledger emits one of these for every committed state change. Events
//! are fire-and-forget: sinks cannot influence control flow, and an
//! operation that rolls back emits nothing.

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// A committed ledger occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A vault was registered and its reward budget taken into custody.
    VaultRegistered {
        vault: AccountId,
        stake: u64,
        bid_amount: u64,
        period: u64,
        /// Fixed-point per-second rate assigned to the vault.
        rate: u128,
        start_time: u64,
        end_time: u64,
    },

    /// A periodic claim paid out. `terminal` is set when the claim landed
    /// inside the early-termination window and deactivated the vault.
    RewardsClaimed {
        vault: AccountId,
        amount: u64,
        index: u128,
        timestamp: u64,
        terminal: bool,
    },

    /// A final claim paid out the last slice and deactivated the vault.
    FinalRewardsClaimed {
        vault: AccountId,
        amount: u64,
        timestamp: u64,
    },

    /// The global index advanced.
    IndexUpdated { index: u128, timestamp: u64 },

    /// The average rate was recomputed after the active set changed.
    AverageRateUpdated { average_rate: u128, active_count: u64 },
}

impl LedgerEvent {
    /// Short name of the event kind, matching its serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::VaultRegistered { .. } => "vault_registered",
            LedgerEvent::RewardsClaimed { .. } => "rewards_claimed",
            LedgerEvent::FinalRewardsClaimed { .. } => "final_rewards_claimed",
            LedgerEvent::IndexUpdated { .. } => "index_updated",
            LedgerEvent::AverageRateUpdated { .. } => "average_rate_updated",
        }
    }

    /// The vault this event concerns, if any.
    pub fn vault(&self) -> Option<&AccountId> {
        match self {
            LedgerEvent::VaultRegistered { vault, .. }
            | LedgerEvent::RewardsClaimed { vault, .. }
            | LedgerEvent::FinalRewardsClaimed { vault, .. } => Some(vault),
            LedgerEvent::IndexUpdated { .. } | LedgerEvent::AverageRateUpdated { .. } => None,
        }
    }
}
