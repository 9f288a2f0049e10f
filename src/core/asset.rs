//! Asset classes carried by a `Value`. Ada is the base currency (quantities in lovelace); every other asset is a token named under a minting policy.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::core::address::ScriptHash;

/// Asset identifier. Ordered: Ada first, then tokens by (policy, name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// Base currency, in lovelace.
    Ada,
    /// Token minted under `policy`.
    Token { policy: ScriptHash, name: String },
}

impl Asset {
    pub fn token(policy: ScriptHash, name: impl Into<String>) -> Self {
        Asset::Token { policy, name: name.into() }
    }

    /// Minting policy of a token; `None` for Ada.
    pub fn policy(&self) -> Option<&ScriptHash> {
        match self {
            Asset::Ada => None,
            Asset::Token { policy, .. } => Some(policy),
        }
    }

    /// Returns a canonical string for hashing and display (deterministic).
    pub fn as_canonical(&self) -> String {
        match self {
            Asset::Ada => "ADA".to_string(),
            Asset::Token { policy, name } => format!("{}.{}", policy, name),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_canonical())
    }
}
