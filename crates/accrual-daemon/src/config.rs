//! Configuration file management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use accrual_ledger::LedgerParams;
use accrual_types::{AccountId, DEFAULT_STAKE_UNIT, GWEI_PER_TOKEN, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Ledger parameters and administrator.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// In-memory custody seeding.
    #[serde(default)]
    pub custody: CustodyConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Stake must be a positive multiple of this (base units).
    #[serde(default = "default_stake_unit")]
    pub stake_unit: u64,
    /// Periodic claims this close to the end time terminate the vault.
    #[serde(default = "default_early_termination_window")]
    pub early_termination_window_secs: u64,
    /// Administrator: a label or a 64-character hex account id.
    #[serde(default = "default_admin")]
    pub admin: String,
}

/// Custody configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Starting balances, keyed by label or hex account id.
    #[serde(default = "default_initial_balances")]
    pub initial_balances: BTreeMap<String, u64>,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_stake_unit() -> u64 {
    DEFAULT_STAKE_UNIT
}

fn default_early_termination_window() -> u64 {
    SECONDS_PER_DAY
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_initial_balances() -> BTreeMap<String, u64> {
    BTreeMap::from([(default_admin(), 1_000 * GWEI_PER_TOKEN)])
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            stake_unit: default_stake_unit(),
            early_termination_window_secs: default_early_termination_window(),
            admin: default_admin(),
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            initial_balances: default_initial_balances(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, defaulting if absent.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Parameters for the ledger engine.
    pub fn ledger_params(&self) -> LedgerParams {
        LedgerParams {
            stake_unit: self.ledger.stake_unit,
            early_termination_window: self.ledger.early_termination_window_secs,
        }
    }

    /// The administrator's account id.
    pub fn admin_id(&self) -> AccountId {
        AccountId::resolve(&self.ledger.admin)
    }

    /// Starting custody balances with resolved account ids.
    pub fn initial_balances(&self) -> Vec<(AccountId, u64)> {
        self.custody
            .initial_balances
            .iter()
            .map(|(account, amount)| (AccountId::resolve(account), *amount))
            .collect()
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Data directory: `$ACCRUAL_DATA_DIR`, else a platform default.
    fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("ACCRUAL_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Accrual")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Accrual")
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            dirs_fallback(".accrual")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/accrual"))
}
