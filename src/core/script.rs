//! Scripts, datums and the validator hook used by the ledger rules.
//!
//! Script evaluation itself is host code: a `Validator` is any Rust predicate over a `ScriptContext`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use crate::core::address::{Address, HasAddress, PubKeyHash, ScriptHash};
use crate::core::slot::Slot;
use crate::core::tx::Tx;
use crate::core::utxo::{OutputRef, TxOut};
use crate::core::value::Value;
use crate::error::{SimError, Result};

/// Opaque structured data used for datums and redeemers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data(serde_json::Value);

/// Datum attached to a script output.
pub type Datum = Data;
/// Argument supplied by the spender or minter.
pub type Redeemer = Data;

impl Data {
    pub fn new<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(value)?))
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Unit-like data, for scripts that ignore their redeemer.
    pub fn unit() -> Self {
        Self(serde_json::Value::Null)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.0.clone()).map_err(SimError::from)
    }

    pub fn hash(&self) -> DatumHash {
        let mut hasher = Sha256::new();
        hasher.update(b"datum:");
        hasher.update(self.0.to_string().as_bytes());
        DatumHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatumHash(String);

impl DatumHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatumHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named script. The hash is derived from the name, so the same name always means the same script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    name: String,
    hash: ScriptHash,
}

impl Script {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut hasher = Sha256::new();
        hasher.update(b"script:");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        Self {
            hash: ScriptHash::new(hex::encode(&digest[..28])),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> &ScriptHash {
        &self.hash
    }
}

impl HasAddress for Script {
    fn address(&self) -> Address {
        Address::Script(self.hash.clone())
    }
}

/// What a script is being run for.
#[derive(Debug, Clone, Copy)]
pub enum ScriptPurpose<'a> {
    Spend {
        out_ref: &'a OutputRef,
        output: &'a TxOut,
        datum: &'a Datum,
        redeemer: &'a Redeemer,
    },
    Mint {
        policy: &'a ScriptHash,
        value: &'a Value,
        redeemer: &'a Redeemer,
    },
}

/// Everything a validator may inspect.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub tx: &'a Tx,
    pub slot: Slot,
    pub purpose: ScriptPurpose<'a>,
}

impl<'a> ScriptContext<'a> {
    /// True when `pkh` is listed as an extra signatory of the transaction.
    pub fn signed_by(&self, pkh: &PubKeyHash) -> bool {
        self.tx.extra_signatories().contains(pkh)
    }

    pub fn redeemer(&self) -> &'a Redeemer {
        match self.purpose {
            ScriptPurpose::Spend { redeemer, .. } => redeemer,
            ScriptPurpose::Mint { redeemer, .. } => redeemer,
        }
    }
}

/// Script logic. Returns `Err(reason)` to reject the transaction.
pub trait Validator: Send + Sync {
    fn validate(&self, ctx: &ScriptContext<'_>) -> std::result::Result<(), String>;
}

impl<F> Validator for F
where
    F: Fn(&ScriptContext<'_>) -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self, ctx: &ScriptContext<'_>) -> std::result::Result<(), String> {
        self(ctx)
    }
}
