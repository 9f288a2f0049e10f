//! Multi-asset quantities.
//!
//! # Invariants
//! - A `Value` never stores a zero quantity, so structural equality is value equality and the empty map is the zero value.
//! - `a <= b` holds exactly when `b - a` has no negative quantity. Values with mixed-sign differences are incomparable.
//! - `split(v) = (neg, pos)` with `neg + pos == v`, `neg <= 0 <= pos`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use crate::core::address::ScriptHash;
use crate::core::asset::Asset;

/// One serialized `(asset, quantity)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueEntry {
    pub asset: Asset,
    pub quantity: i128,
}

/// Mapping asset -> signed quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<ValueEntry>", into = "Vec<ValueEntry>")]
pub struct Value {
    quantities: BTreeMap<Asset, i128>,
}

impl Value {
    /// The zero value (identity for `+`).
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn singleton(asset: Asset, quantity: i128) -> Self {
        let mut v = Self::zero();
        v.insert_add(asset, quantity);
        v
    }

    /// Lovelace amount.
    pub fn ada(quantity: i128) -> Self {
        Self::singleton(Asset::Ada, quantity)
    }

    pub fn token(policy: ScriptHash, name: impl Into<String>, quantity: i128) -> Self {
        Self::singleton(Asset::token(policy, name), quantity)
    }

    fn insert_add(&mut self, asset: Asset, quantity: i128) {
        if quantity == 0 {
            return;
        }
        let total = self.quantity(&asset) + quantity;
        if total == 0 {
            self.quantities.remove(&asset);
        } else {
            self.quantities.insert(asset, total);
        }
    }

    pub fn quantity(&self, asset: &Asset) -> i128 {
        self.quantities.get(asset).copied().unwrap_or(0)
    }

    pub fn ada_quantity(&self) -> i128 {
        self.quantity(&Asset::Ada)
    }

    pub fn is_zero(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Non-zero entries in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&Asset, i128)> {
        self.quantities.iter().map(|(a, q)| (a, *q))
    }

    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.quantities.keys()
    }

    fn filtered(&self, keep: impl Fn(i128) -> bool) -> Self {
        Self {
            quantities: self
                .quantities
                .iter()
                .filter(|(_, q)| keep(**q))
                .map(|(a, q)| (a.clone(), *q))
                .collect(),
        }
    }

    /// Entries with strictly positive quantity.
    pub fn positive_part(&self) -> Self {
        self.filtered(|q| q > 0)
    }

    /// Entries with strictly negative quantity (kept negative).
    pub fn negative_part(&self) -> Self {
        self.filtered(|q| q < 0)
    }

    /// `(negative_part, positive_part)`; their sum is `self`.
    pub fn split(&self) -> (Self, Self) {
        (self.negative_part(), self.positive_part())
    }

    /// Partial order `self <= other`.
    pub fn leq(&self, other: &Value) -> bool {
        (other.clone() - self.clone()).negative_part().is_zero()
    }

    /// Only the entries whose asset belongs to `policy`.
    pub fn restrict_to_policy(&self, policy: &ScriptHash) -> Self {
        Self {
            quantities: self
                .quantities
                .iter()
                .filter(|(a, _)| a.policy() == Some(policy))
                .map(|(a, q)| (a.clone(), *q))
                .collect(),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let diff = self.clone() - other.clone();
        if diff.is_zero() {
            Some(Ordering::Equal)
        } else if diff.negative_part().is_zero() {
            Some(Ordering::Greater)
        } else if diff.positive_part().is_zero() {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

impl Add for Value {
    type Output = Value;

    fn add(mut self, rhs: Value) -> Value {
        self += &rhs;
        self
    }
}

impl<'a> Add<&'a Value> for Value {
    type Output = Value;

    fn add(mut self, rhs: &'a Value) -> Value {
        self += rhs;
        self
    }
}

impl<'a> AddAssign<&'a Value> for Value {
    fn add_assign(&mut self, rhs: &'a Value) {
        for (asset, q) in rhs.quantities.iter() {
            self.insert_add(asset.clone(), *q);
        }
    }
}

impl AddAssign for Value {
    fn add_assign(&mut self, rhs: Value) {
        *self += &rhs;
    }
}

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        Value {
            quantities: self.quantities.into_iter().map(|(a, q)| (a, -q)).collect(),
        }
    }
}

impl<'a> Neg for &'a Value {
    type Output = Value;

    fn neg(self) -> Value {
        -self.clone()
    }
}

impl Sub for Value {
    type Output = Value;

    fn sub(self, rhs: Value) -> Value {
        self + (-rhs)
    }
}

impl Sum for Value {
    fn sum<I: Iterator<Item = Value>>(iter: I) -> Value {
        iter.fold(Value::zero(), |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a Value> for Value {
    fn sum<I: Iterator<Item = &'a Value>>(iter: I) -> Value {
        iter.fold(Value::zero(), |acc, v| acc + v)
    }
}

impl From<Vec<ValueEntry>> for Value {
    fn from(entries: Vec<ValueEntry>) -> Self {
        let mut v = Value::zero();
        for entry in entries {
            v.insert_add(entry.asset, entry.quantity);
        }
        v
    }
}

impl From<Value> for Vec<ValueEntry> {
    fn from(value: Value) -> Self {
        value
            .quantities
            .into_iter()
            .map(|(asset, quantity)| ValueEntry { asset, quantity })
            .collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self
            .quantities
            .iter()
            .map(|(a, q)| format!("{} {}", q, a))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(q: i128) -> Value {
        Value::token(ScriptHash::new("cafe"), "coin", q)
    }

    #[test]
    fn test_zero_is_identity() {
        let v = Value::ada(5) + coin(3);
        assert_eq!(v.clone() + Value::zero(), v);
        assert!(Value::ada(0).is_zero());
    }

    #[test]
    fn test_normalized_after_cancel() {
        let v = Value::ada(5) + Value::ada(-5);
        assert!(v.is_zero());
        assert_eq!(v, Value::zero());
    }

    #[test]
    fn test_split() {
        let v = Value::ada(5) + coin(-3);
        let (neg, pos) = v.split();
        assert_eq!(neg, coin(-3));
        assert_eq!(pos, Value::ada(5));
        assert_eq!(neg + pos, v);
    }

    #[test]
    fn test_partial_order() {
        assert!(Value::ada(3) < Value::ada(5));
        assert!(Value::ada(5) <= Value::ada(5));
        assert!(Value::ada(3) <= Value::ada(3) + coin(1));
        // incomparable
        let a = Value::ada(3);
        let b = coin(3);
        assert_eq!(a.partial_cmp(&b), None);
        assert!(!(a <= b));
        assert!(!(b <= a));
    }

    #[test]
    fn test_leq_matches_partial_ord() {
        let a = Value::ada(3) + coin(1);
        let b = Value::ada(4) + coin(1);
        assert!(a.leq(&b));
        assert!(!b.leq(&a));
        assert!(Value::zero().leq(&Value::zero()));
    }

    #[test]
    fn test_negation_and_sub() {
        let v = Value::ada(7) + coin(2);
        assert_eq!(-&v, Value::ada(-7) + coin(-2));
        assert_eq!(v.clone() - v, Value::zero());
    }

    #[test]
    fn test_restrict_to_policy() {
        let v = Value::ada(7) + coin(2) + Value::token(ScriptHash::new("beef"), "x", 1);
        assert_eq!(v.restrict_to_policy(&ScriptHash::new("cafe")), coin(2));
    }

    #[test]
    fn test_serde_roundtrip_normalizes() {
        let json = r#"[{"asset":"Ada","quantity":10},{"asset":"Ada","quantity":-10}]"#;
        let v: Value = serde_json::from_str(json).unwrap();
        assert!(v.is_zero());
        let v = Value::ada(10);
        let back: Value = serde_json::from_str(&serde_json::to_string(&v).unwrap()).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::zero().to_string(), "0");
        assert_eq!(Value::ada(12).to_string(), "12 ADA");
    }
}
