//! UTXO store: the ledger's current spendable set.
//!
//! # Invariants
//! - Keys are unique; an output reference is never reused once consumed.
//! - Entries change only through `commit`, which checks every consumed reference is present and every produced reference is fresh before touching the map (all or nothing).
//! - Snapshots are O(1): the map is shared behind an `Arc` and copied on the first write after a clone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use crate::core::address::Address;
use crate::core::script::DatumHash;
use crate::core::value::Value;

/// Transaction id (hex SHA-256 of the body).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locator of an output: producing transaction and position. Ordered by `(tx_id, index)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_id: TxId,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_id: TxId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

/// An output: owner, value and optional datum hash. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: Address,
    pub value: Value,
    pub datum_hash: Option<DatumHash>,
}

impl TxOut {
    pub fn new(address: Address, value: Value) -> Self {
        Self { address, value, datum_hash: None }
    }

    pub fn with_datum_hash(address: Address, value: Value, datum_hash: DatumHash) -> Self {
        Self { address, value, datum_hash: Some(datum_hash) }
    }
}

/// Errors produced by store updates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtxoError {
    #[error("Missing input: {0}")]
    MissingInput(OutputRef),

    #[error("Output reference already exists: {0}")]
    DuplicateOutput(OutputRef),
}

/// Mapping output reference -> output.
#[derive(Debug, Clone, Default)]
pub struct UtxoStore {
    entries: Arc<BTreeMap<OutputRef, TxOut>>,
}

impl UtxoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, out_ref: &OutputRef) -> Option<&TxOut> {
        self.entries.get(out_ref)
    }

    pub fn contains(&self, out_ref: &OutputRef) -> bool {
        self.entries.contains_key(out_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in ascending reference order.
    pub fn iter(&self) -> impl Iterator<Item = (&OutputRef, &TxOut)> {
        self.entries.iter()
    }

    /// Outputs locked at `address`, in ascending reference order.
    pub fn at_address<'a>(&'a self, address: &'a Address) -> impl Iterator<Item = (&'a OutputRef, &'a TxOut)> + 'a {
        self.entries.iter().filter(move |(_, out)| &out.address == address)
    }

    /// Sum of all values locked at `address`.
    pub fn value_at(&self, address: &Address) -> Value {
        self.at_address(address).map(|(_, out)| &out.value).sum()
    }

    /// Removes `consumed` and adds `produced` atomically.
    pub fn commit(
        &mut self,
        consumed: &[OutputRef],
        produced: Vec<(OutputRef, TxOut)>,
    ) -> Result<(), UtxoError> {
        for out_ref in consumed {
            if !self.entries.contains_key(out_ref) {
                return Err(UtxoError::MissingInput(out_ref.clone()));
            }
        }
        for (i, (out_ref, _)) in produced.iter().enumerate() {
            let consumed_here = consumed.contains(out_ref);
            let repeated = produced[..i].iter().any(|(r, _)| r == out_ref);
            if (self.entries.contains_key(out_ref) && !consumed_here) || repeated {
                return Err(UtxoError::DuplicateOutput(out_ref.clone()));
            }
        }
        let entries = Arc::make_mut(&mut self.entries);
        for out_ref in consumed {
            entries.remove(out_ref);
        }
        for (out_ref, out) in produced {
            entries.insert(out_ref, out);
        }
        Ok(())
    }
}

impl PartialEq for UtxoStore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries) || *self.entries == *other.entries
    }
}

impl Eq for UtxoStore {}
