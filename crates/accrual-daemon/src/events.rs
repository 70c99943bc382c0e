//! Event bus.
//!
//! Ledger notifications are sequenced and fanned out to subscribers over a
//! broadcast channel. The bus is the ledger's [`EventSink`]; a slow or
//! absent subscriber never affects the ledger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use accrual_ledger::EventSink;
use accrual_types::{AccountId, LedgerEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A sequenced ledger event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Position in emission order, starting at 1.
    pub sequence: u64,
    /// The ledger notification.
    pub event: LedgerEvent,
}

/// Filter applied when collecting events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Category filter: "vault", "pool".
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// Only events concerning these vaults (labels or hex ids).
    #[serde(default)]
    pub vaults: Option<Vec<String>>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: LedgerEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(Event { sequence, event });
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Get the current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventSink for EventBus {
    fn emit(&mut self, event: LedgerEvent) {
        self.publish(event);
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        if let Some(ref categories) = self.categories {
            let category = categorize_event(event);
            if !categories.iter().any(|c| c == category) {
                return false;
            }
        }

        // Pool-wide events carry no vault and pass the vault filter
        if let (Some(vaults), Some(vault)) = (&self.vaults, event.vault()) {
            if !vaults.iter().any(|v| &AccountId::resolve(v) == vault) {
                return false;
            }
        }

        true
    }
}

/// Categorize an event into "vault" or "pool".
fn categorize_event(event: &LedgerEvent) -> &'static str {
    match event {
        LedgerEvent::VaultRegistered { .. }
        | LedgerEvent::RewardsClaimed { .. }
        | LedgerEvent::FinalRewardsClaimed { .. } => "vault",
        LedgerEvent::IndexUpdated { .. } | LedgerEvent::AverageRateUpdated { .. } => "pool",
    }
}
