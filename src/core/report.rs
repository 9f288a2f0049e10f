//! Test-result surface: failures, labels and the chronological log of a run.

use std::collections::BTreeMap;
use std::fmt;
use crate::core::address::{Address, ScriptHash};
use crate::core::asset::Asset;
use crate::core::log::{FailReason, LogEntry};
use crate::core::slot::Slot;
use crate::core::value::Value;

/// Human-readable labels for addresses and minting policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    addresses: BTreeMap<Address, String>,
    policies: BTreeMap<ScriptHash, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels an address. A later label for the same address replaces the earlier one.
    pub fn name_address(&mut self, address: Address, name: impl Into<String>) {
        self.addresses.insert(address, name.into());
    }

    pub fn name_policy(&mut self, policy: ScriptHash, name: impl Into<String>) {
        self.policies.insert(policy, name.into());
    }

    pub fn address_label(&self, address: &Address) -> Option<&str> {
        self.addresses.get(address).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.policies.is_empty()
    }

    pub fn render_address(&self, address: &Address) -> String {
        match self.address_label(address) {
            Some(label) => label.to_string(),
            None => address.to_string(),
        }
    }

    pub fn render_asset(&self, asset: &Asset) -> String {
        match asset {
            Asset::Token { policy, name } => match self.policies.get(policy) {
                Some(label) => format!("{}.{}", label, name),
                None => asset.to_string(),
            },
            Asset::Ada => asset.to_string(),
        }
    }

    pub fn render_value(&self, value: &Value) -> String {
        if value.is_zero() {
            return "0".to_string();
        }
        value
            .iter()
            .map(|(asset, q)| format!("{} {}", q, self.render_asset(asset)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn render_reason(&self, reason: &FailReason) -> String {
        match reason {
            FailReason::NotEnoughFunds { owner, requested } => format!(
                "Not enough funds at {}: requested {}",
                self.render_address(owner),
                self.render_value(requested)
            ),
            FailReason::BalanceMismatch { address, expected, observed } => format!(
                "Balance mismatch at {}: expected {}, observed {}",
                self.render_address(address),
                self.render_value(expected),
                self.render_value(observed)
            ),
            other => other.to_string(),
        }
    }

    pub fn render_entry(&self, entry: &LogEntry) -> String {
        match entry {
            LogEntry::Failure(reason) => self.render_reason(reason),
            LogEntry::ExpectedFailure { name, entry } => {
                format!("Expected failure [{}]: {}", name, self.render_entry(entry))
            }
            other => other.to_string(),
        }
    }
}

/// Snapshot of a run's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub failures: Vec<(Slot, FailReason)>,
    pub names: NameTable,
    pub log: Option<Vec<(Slot, LogEntry)>>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            writeln!(f, "No errors")?;
        } else {
            writeln!(f, "Errors:")?;
            for (slot, reason) in &self.failures {
                writeln!(f, "  slot {}: {}", slot, self.names.render_reason(reason))?;
            }
        }
        if !self.names.is_empty() {
            writeln!(f, "Names:")?;
            for (address, name) in &self.names.addresses {
                writeln!(f, "  {}: {}", name, address)?;
            }
            for (policy, name) in &self.names.policies {
                writeln!(f, "  {}: policy {}", name, policy)?;
            }
        }
        if let Some(log) = &self.log {
            writeln!(f, "Log:")?;
            for (slot, entry) in log {
                writeln!(f, "  slot {}: {}", slot, self.names.render_entry(entry))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::PubKeyHash;

    fn alice() -> Address {
        Address::Key(PubKeyHash::new("a1"))
    }

    #[test]
    fn test_render_uses_labels() {
        let mut names = NameTable::new();
        names.name_address(alice(), "alice");
        names.name_policy(ScriptHash::new("p"), "gold");
        let reason = FailReason::BalanceMismatch {
            address: alice(),
            expected: Value::ada(5),
            observed: Value::token(ScriptHash::new("p"), "bar", 2),
        };
        assert_eq!(
            names.render_reason(&reason),
            "Balance mismatch at alice: expected 5 ADA, observed 2 gold.bar"
        );
    }

    #[test]
    fn test_render_without_labels() {
        let names = NameTable::new();
        assert_eq!(names.render_address(&alice()), "key:a1");
        assert_eq!(names.render_value(&Value::zero()), "0");
    }

    #[test]
    fn test_report_display() {
        let report = Report {
            failures: vec![(3, FailReason::Error("boom".into()))],
            names: NameTable::new(),
            log: Some(vec![(0, LogEntry::Info("start".into()))]),
        };
        let text = report.to_string();
        assert!(!report.is_success());
        assert!(text.contains("slot 3: Error: boom"));
        assert!(text.contains("slot 0: start"));
    }
}
