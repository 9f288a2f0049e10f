//! Staking state: registered pools and stake accounts.
//!
//! Pools change only through explicit register/retire calls on the simulation. Stake accounts change through certificate and withdrawal effects applied by the ledger rules, and through explicit reward distribution.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use sha2::{Digest, Sha256};
use crate::core::address::StakeCredential;

/// Stake pool identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Pool id derived from a label: hex of the first 28 bytes of SHA-256.
    pub fn from_name(name: &str) -> Self {
        let digest = Sha256::digest(format!("pool:{}", name).as_bytes());
        Self(hex::encode(&digest[..28]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

/// A registered stake credential.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeAccount {
    pub delegation: Option<PoolId>,
    /// Withdrawable rewards in lovelace.
    pub rewards: i128,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeState {
    pools: BTreeSet<PoolId>,
    accounts: BTreeMap<StakeCredential, StakeAccount>,
}

impl StakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pool_registered(&self, pool: &PoolId) -> bool {
        self.pools.contains(pool)
    }

    pub fn pools(&self) -> impl Iterator<Item = &PoolId> {
        self.pools.iter()
    }

    /// Returns false if the pool was already registered.
    pub(crate) fn register_pool(&mut self, pool: PoolId) -> bool {
        self.pools.insert(pool)
    }

    /// Returns false if the pool was not registered. Delegations to it are dropped.
    pub(crate) fn retire_pool(&mut self, pool: &PoolId) -> bool {
        if !self.pools.remove(pool) {
            return false;
        }
        for account in self.accounts.values_mut() {
            if account.delegation.as_ref() == Some(pool) {
                account.delegation = None;
            }
        }
        true
    }

    pub fn account(&self, credential: &StakeCredential) -> Option<&StakeAccount> {
        self.accounts.get(credential)
    }

    pub fn is_registered(&self, credential: &StakeCredential) -> bool {
        self.accounts.contains_key(credential)
    }

    pub fn rewards(&self, credential: &StakeCredential) -> i128 {
        self.accounts.get(credential).map_or(0, |a| a.rewards)
    }

    pub fn delegation(&self, credential: &StakeCredential) -> Option<&PoolId> {
        self.accounts.get(credential).and_then(|a| a.delegation.as_ref())
    }

    /// Credentials delegated to `pool`, in credential order.
    pub fn delegators(&self, pool: &PoolId) -> Vec<&StakeCredential> {
        self.accounts
            .iter()
            .filter(|(_, a)| a.delegation.as_ref() == Some(pool))
            .map(|(c, _)| c)
            .collect()
    }

    pub fn register(&mut self, credential: StakeCredential) -> bool {
        if self.accounts.contains_key(&credential) {
            return false;
        }
        self.accounts.insert(credential, StakeAccount::default());
        true
    }

    pub fn deregister(&mut self, credential: &StakeCredential) -> Option<StakeAccount> {
        self.accounts.remove(credential)
    }

    pub fn delegate(&mut self, credential: &StakeCredential, pool: PoolId) -> bool {
        match self.accounts.get_mut(credential) {
            Some(account) => {
                account.delegation = Some(pool);
                true
            }
            None => false,
        }
    }

    /// Adds `amount` to the reward balance of a registered credential.
    pub fn add_rewards(&mut self, credential: &StakeCredential, amount: i128) -> bool {
        match self.accounts.get_mut(credential) {
            Some(account) => {
                account.rewards += amount;
                true
            }
            None => false,
        }
    }

    /// Empties the reward balance; returns what was there.
    pub fn take_rewards(&mut self, credential: &StakeCredential) -> i128 {
        self.accounts
            .get_mut(credential)
            .map_or(0, |a| std::mem::take(&mut a.rewards))
    }
}
