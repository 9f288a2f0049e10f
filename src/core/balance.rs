//! Balance-diff verification: declare the net value change per address, run an action, compare.
//!
//! Only the addresses named in the diff are observed; everything else may change freely. Mismatches are logged, never rolled back.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use crate::core::address::{Address, HasAddress};
use crate::core::log::FailReason;
use crate::core::simulation::Simulation;
use crate::core::value::Value;

/// Expected net change per address.
///
/// Addresses stay in the diff even when their expected change nets to zero, so they are still checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceDiff {
    deltas: BTreeMap<Address, Value>,
}

impl BalanceDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.deltas.keys()
    }

    /// Expected change at `address`; zero for addresses outside the diff.
    pub fn expected(&self, address: &Address) -> Value {
        self.deltas.get(address).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    fn add_delta(&mut self, address: Address, value: &Value) {
        *self.deltas.entry(address).or_default() += value;
    }
}

/// `target` ends up with `value` more than before.
pub fn owns(target: &impl HasAddress, value: Value) -> BalanceDiff {
    let mut diff = BalanceDiff::new();
    diff.add_delta(target.address(), &value);
    diff
}

/// `from` hands `value` to `to`.
pub fn gives(from: &impl HasAddress, value: Value, to: &impl HasAddress) -> BalanceDiff {
    let mut diff = BalanceDiff::new();
    diff.add_delta(from.address(), &-&value);
    diff.add_delta(to.address(), &value);
    diff
}

impl<'a> AddAssign<&'a BalanceDiff> for BalanceDiff {
    fn add_assign(&mut self, rhs: &'a BalanceDiff) {
        for (address, value) in &rhs.deltas {
            self.add_delta(address.clone(), value);
        }
    }
}

impl Add for BalanceDiff {
    type Output = BalanceDiff;

    fn add(mut self, rhs: BalanceDiff) -> BalanceDiff {
        self += &rhs;
        self
    }
}

impl Sum for BalanceDiff {
    fn sum<I: Iterator<Item = BalanceDiff>>(iter: I) -> BalanceDiff {
        iter.fold(BalanceDiff::new(), |acc, diff| acc + diff)
    }
}

impl Simulation {
    /// Runs `action` and logs a `BalanceMismatch` for every address in `diff` whose observed change differs from the declared one.
    pub fn check_balance<R>(&mut self, diff: &BalanceDiff, action: impl FnOnce(&mut Self) -> R) -> R {
        self.check_balance_by(|_| diff.clone(), action)
    }

    /// Like `check_balance`, with the expected diff computed from the action's result.
    pub fn check_balance_by<R>(
        &mut self,
        expect: impl FnOnce(&R) -> BalanceDiff,
        action: impl FnOnce(&mut Self) -> R,
    ) -> R {
        // old totals come from the snapshot; the watched set is known only after the action
        let before = self.snapshot();
        let result = action(self);
        let diff = expect(&result);
        for address in diff.addresses() {
            let observed = self.value_at(address) - before.value_at(address);
            let expected = diff.expected(address);
            if observed != expected {
                self.log_fail(FailReason::BalanceMismatch {
                    address: address.clone(),
                    expected,
                    observed,
                });
            }
        }
        result
    }
}
