//! Identities and addresses. Anything that can receive value implements `HasAddress`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex hash of a payment or staking public key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PubKeyHash(String);

impl PubKeyHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PubKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hex hash identifying a validator or minting policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptHash(String);

impl ScriptHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Staking credential: the hash of a user's staking key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StakeCredential(PubKeyHash);

impl StakeCredential {
    pub fn new(key_hash: PubKeyHash) -> Self {
        Self(key_hash)
    }

    /// Key whose witness authorizes withdrawals and certificates.
    pub fn key_hash(&self) -> &PubKeyHash {
        &self.0
    }
}

impl fmt::Display for StakeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stake:{}", self.0)
    }
}

/// Payment address: locked by a key or by a script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    Key(PubKeyHash),
    Script(ScriptHash),
}

impl Address {
    pub fn key_hash(&self) -> Option<&PubKeyHash> {
        match self {
            Address::Key(pkh) => Some(pkh),
            Address::Script(_) => None,
        }
    }

    pub fn script_hash(&self) -> Option<&ScriptHash> {
        match self {
            Address::Key(_) => None,
            Address::Script(sh) => Some(sh),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Key(pkh) => write!(f, "key:{}", pkh),
            Address::Script(sh) => write!(f, "script:{}", sh),
        }
    }
}

/// Capability: resolves to an address.
pub trait HasAddress {
    fn address(&self) -> Address;
}

impl HasAddress for Address {
    fn address(&self) -> Address {
        self.clone()
    }
}

impl HasAddress for PubKeyHash {
    fn address(&self) -> Address {
        Address::Key(self.clone())
    }
}

impl HasAddress for ScriptHash {
    fn address(&self) -> Address {
        Address::Script(self.clone())
    }
}

impl<T: HasAddress + ?Sized> HasAddress for &T {
    fn address(&self) -> Address {
        (**self).address()
    }
}
