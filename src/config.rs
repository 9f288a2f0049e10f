//! Simulation configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::core::ledger::LedgerParams;
use crate::core::slot::SlotConfig;
use crate::core::value::Value;
use crate::error::{SimError, Result};
use crate::utils::hex_to_32;

/// Lovelace held by the admin user at genesis.
pub const DEFAULT_ADMIN_FUNDS: i128 = 1_000_000_000_000;

/// Fixed key seed so that user keys are reproducible across runs.
pub const DEFAULT_KEY_SEED: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Value of the admin's genesis output.
    pub admin_funds: Value,
    pub slot_config: SlotConfig,
    pub ledger: LedgerParams,
    /// Hex-encoded 32-byte entropy for the user key mnemonic.
    pub key_seed: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            admin_funds: Value::ada(DEFAULT_ADMIN_FUNDS),
            slot_config: SlotConfig::default(),
            ledger: LedgerParams::default(),
            key_seed: DEFAULT_KEY_SEED.to_string(),
        }
    }
}

impl SimConfig {
    /// Default configuration with the given admin funds.
    pub fn with_admin_funds(admin_funds: Value) -> Self {
        Self {
            admin_funds,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_config.slot_length == 0 {
            return Err(SimError::Config("slot_length must be positive".to_string()));
        }
        if !self.admin_funds.negative_part().is_zero() {
            return Err(SimError::Config(format!("admin_funds must be non-negative, got {}", self.admin_funds)));
        }
        if self.ledger.min_fee < 0 || self.ledger.stake_deposit < 0 {
            return Err(SimError::Config("ledger parameters must be non-negative".to_string()));
        }
        self.seed_bytes().map(|_| ())
    }

    pub fn seed_bytes(&self) -> Result<[u8; 32]> {
        hex_to_32(&self.key_seed).map_err(|e| SimError::Config(format!("key_seed: {}", e)))
    }
}
