//! Greedy coin selection over an owner's outputs.
//!
//! Candidates are visited in ascending output-reference order, so the result is reproducible for a fixed store.
//! An output is taken only if it strictly shrinks the outstanding deficit; the scan stops as soon as nothing is outstanding.
//! Selection never mutates the store.

use std::collections::BTreeSet;
use thiserror::Error;
use crate::core::address::Address;
use crate::core::utxo::{OutputRef, TxOut, UtxoStore};
use crate::core::value::Value;
use crate::error::SimError;

/// The owner's outputs cannot cover the requested value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Not enough funds at {owner}: requested {requested}")]
pub struct InsufficientFunds {
    pub owner: Address,
    pub requested: Value,
}

impl From<InsufficientFunds> for SimError {
    fn from(err: InsufficientFunds) -> Self {
        SimError::InsufficientFunds(err.to_string())
    }
}

/// Selected inputs plus the change output returning the surplus to the owner.
///
/// # Invariants
/// - sum(inputs) == requested + change value.
/// - `change` is `None` exactly when the surplus is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpend {
    inputs: BTreeSet<OutputRef>,
    change: Option<TxOut>,
}

impl UserSpend {
    pub fn inputs(&self) -> &BTreeSet<OutputRef> {
        &self.inputs
    }

    pub fn change(&self) -> Option<&TxOut> {
        self.change.as_ref()
    }

    /// Value of the change output, zero when there is none.
    pub fn change_value(&self) -> Value {
        self.change.as_ref().map(|c| c.value.clone()).unwrap_or_default()
    }

    pub fn into_parts(self) -> (BTreeSet<OutputRef>, Option<TxOut>) {
        (self.inputs, self.change)
    }
}

/// Chooses inputs owned by `owner` covering `target`.
pub fn select_coins(
    owner: &Address,
    target: &Value,
    utxos: &UtxoStore,
) -> Result<UserSpend, InsufficientFunds> {
    let mut still_needed = target.clone();
    let mut selected = BTreeSet::new();
    let mut selected_value = Value::zero();

    for (out_ref, out) in utxos.at_address(owner) {
        if still_needed.leq(&Value::zero()) {
            break;
        }
        let next_needed = (still_needed.clone() - out.value.clone()).positive_part();
        if next_needed < still_needed {
            selected.insert(out_ref.clone());
            selected_value += &out.value;
            still_needed = next_needed;
        }
    }

    if !still_needed.leq(&Value::zero()) {
        return Err(InsufficientFunds {
            owner: owner.clone(),
            requested: target.clone(),
        });
    }

    let surplus = selected_value - target.clone();
    let change = if surplus.is_zero() {
        None
    } else {
        Some(TxOut::new(owner.clone(), surplus))
    };
    Ok(UserSpend { inputs: selected, change })
}
