//! Simulation state machine: one in-memory ledger per test.
//!
//! The simulation owns its state and threads it through `&mut self`. Submission hands the transaction and the current ledger state to the `LedgerRules` adapter; success replaces the ledger state, failure is logged and leaves it untouched.
//!
//! # Determinism
//! Users are derived from the configured seed by index, coin selection walks outputs in reference order, and the clock only moves on explicit waits. The same sequence of calls always yields the same state and log.
//!
//! # Invariants
//! - Expected failures are data in the event log, never panics or returned errors.
//! - `restore(&snapshot())` restores the state exactly; snapshots share storage with the live state until the next write.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::config::SimConfig;
use crate::core::address::{Address, HasAddress, PubKeyHash, ScriptHash, StakeCredential};
use crate::core::ledger::{BasicLedger, LedgerFailure, LedgerRules, LedgerState};
use crate::core::log::{EventLog, FailReason, LogEntry};
use crate::core::report::{NameTable, Report};
use crate::core::script::Datum;
use crate::core::selection::{select_coins, UserSpend};
use crate::core::slot::{PosixTime, Slot, TimeRange};
use crate::core::staking::PoolId;
use crate::core::tx::{pay_fee, pay_to_address, user_spend, valid_in_slots, Tx};
use crate::core::utxo::{OutputRef, TxId, TxOut};
use crate::core::value::Value;
use crate::error::{SimError, Result};
use crate::key_generator::{KeyGenerator, UserKeys};
use crate::signer::sign_tx_with_keys;

/// Label used by `must_fail`.
pub const DEFAULT_FAILURE_NAME: &str = "must fail";
/// Message used by `must_fail` when the action succeeds.
pub const DEFAULT_FAILURE_MESSAGE: &str = "action was expected to fail";

/// Handle of a simulated user. Keys stay inside the simulation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct User {
    index: u32,
    pub_key_hash: PubKeyHash,
    stake_credential: StakeCredential,
}

impl User {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn pub_key_hash(&self) -> &PubKeyHash {
        &self.pub_key_hash
    }

    pub fn stake_credential(&self) -> &StakeCredential {
        &self.stake_credential
    }
}

impl From<&UserKeys> for User {
    fn from(keys: &UserKeys) -> Self {
        Self {
            index: keys.index,
            pub_key_hash: keys.pub_key_hash.clone(),
            stake_credential: keys.stake_credential.clone(),
        }
    }
}

impl HasAddress for User {
    fn address(&self) -> Address {
        Address::Key(self.pub_key_hash.clone())
    }
}

/// An output together with its reference and, for script outputs, its datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBox {
    pub out_ref: OutputRef,
    pub out: TxOut,
    pub datum: Option<Datum>,
}

impl TxBox {
    pub fn value(&self) -> &Value {
        &self.out.value
    }
}

impl HasAddress for TxBox {
    fn address(&self) -> Address {
        self.out.address.clone()
    }
}

/// Everything that rolls back together.
#[derive(Debug, Clone, Default)]
struct SimState {
    ledger: LedgerState,
    users: BTreeMap<PubKeyHash, UserKeys>,
    next_user: u32,
    log: EventLog,
    names: NameTable,
}

/// Immutable copy of a simulation state. The UTXO map and datum table are shared, not copied.
#[derive(Debug, Clone)]
pub struct SimSnapshot {
    state: SimState,
}

impl SimSnapshot {
    pub fn current_slot(&self) -> Slot {
        self.state.ledger.slot
    }

    pub fn value_at(&self, target: &impl HasAddress) -> Value {
        self.state.ledger.utxos.value_at(&target.address())
    }
}

/// Output reference of the genesis transaction.
pub fn genesis_ref() -> OutputRef {
    OutputRef::new(TxId::new("0".repeat(64)), 0)
}

#[derive(Clone)]
pub struct Simulation {
    config: SimConfig,
    rules: Arc<dyn LedgerRules>,
    keys: KeyGenerator,
    admin: User,
    state: SimState,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("admin", &self.admin)
            .field("state", &self.state)
            .finish()
    }
}

impl Simulation {
    /// Simulation with the reference ledger rules built from `config.ledger`.
    pub fn new(config: SimConfig) -> Result<Self> {
        let rules = BasicLedger::new(config.ledger);
        Self::with_ledger(config, rules)
    }

    /// Simulation with custom ledger rules. The admin (index 0) receives a genesis output holding `admin_funds`.
    pub fn with_ledger(config: SimConfig, rules: impl LedgerRules + 'static) -> Result<Self> {
        config.validate()?;
        let keys = KeyGenerator::from_entropy(&config.seed_bytes()?)?;
        let admin_keys = keys.derive(0)?;
        let admin = User::from(&admin_keys);

        let mut state = SimState::default();
        if !config.admin_funds.is_zero() {
            let genesis = TxOut::new(admin.address(), config.admin_funds.clone());
            state
                .ledger
                .utxos
                .commit(&[], vec![(genesis_ref(), genesis)])
                .map_err(|e| SimError::Validation(e.to_string()))?;
        }
        state.users.insert(admin.pub_key_hash.clone(), admin_keys);
        state.next_user = 1;
        state.names.name_address(admin.address(), "admin");
        state.log.push(0, LogEntry::Info(format!("Genesis: admin holds {}", config.admin_funds)));
        info!(admin = %admin.pub_key_hash, funds = %config.admin_funds, "simulation started");

        Ok(Self {
            config,
            rules: Arc::new(rules),
            keys,
            admin,
            state,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn ledger_state(&self) -> &LedgerState {
        &self.state.ledger
    }

    pub fn log(&self) -> &EventLog {
        &self.state.log
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot { state: self.state.clone() }
    }

    pub fn restore(&mut self, snapshot: &SimSnapshot) {
        self.state = snapshot.state.clone();
    }

    // ---- users ----

    pub fn admin(&self) -> User {
        self.admin.clone()
    }

    /// Allocates the next user and funds it from the admin. Lack of admin funds is logged, not returned.
    pub fn new_user(&mut self, value: Value) -> Result<User> {
        let index = self.state.next_user;
        let keys = self.keys.derive(index)?;
        let user = User::from(&keys);
        self.state.users.insert(user.pub_key_hash.clone(), keys);
        self.state.next_user += 1;
        info!(index, user = %user.pub_key_hash, funds = %value, "new user");

        if !value.is_zero() {
            let admin = self.admin();
            self.send_value(&admin, &value, &user)?;
        }
        Ok(user)
    }

    pub fn user_keys(&self, user: &User) -> Result<&UserKeys> {
        self.state
            .users
            .get(&user.pub_key_hash)
            .ok_or_else(|| SimError::UnknownUser(user.pub_key_hash.to_string()))
    }

    /// Registered users in key-hash order, admin included.
    pub fn users(&self) -> impl Iterator<Item = User> + '_ {
        self.state.users.values().map(User::from)
    }

    // ---- signing and submission ----

    /// Adds witnesses by the payment keys of `users`.
    pub fn sign_tx(&self, users: &[&User], tx: Tx) -> Result<Tx> {
        let keys = users
            .iter()
            .map(|u| self.user_keys(u).map(|k| &k.payment_key))
            .collect::<Result<Vec<_>>>()?;
        sign_tx_with_keys(tx, keys)
    }

    /// Adds witnesses by the staking keys of `users`.
    pub fn sign_tx_staking(&self, users: &[&User], tx: Tx) -> Result<Tx> {
        let keys = users
            .iter()
            .map(|u| self.user_keys(u).map(|k| &k.staking_key))
            .collect::<Result<Vec<_>>>()?;
        sign_tx_with_keys(tx, keys)
    }

    /// Applies `tx` at the current slot. Either outcome is logged.
    pub fn submit_tx(&mut self, tx: Tx) -> std::result::Result<TxId, LedgerFailure> {
        let slot = self.state.ledger.slot;
        match self.rules.apply(&tx, &self.state.ledger) {
            Ok((next, record)) => {
                debug!(slot, tx_id = %record.tx_id, inputs = record.consumed.len(), outputs = record.produced.len(), "applied tx");
                let tx_id = record.tx_id.clone();
                self.state.ledger = next;
                self.state.log.push(slot, LogEntry::Submitted(record));
                Ok(tx_id)
            }
            Err(failure) => {
                self.log_fail(FailReason::Ledger(failure.clone()));
                Err(failure)
            }
        }
    }

    pub fn send_tx(&mut self, tx: Tx) {
        let _ = self.submit_tx(tx);
    }

    /// Validity interval for `range`, resolved through the slot configuration.
    pub fn valid_range(&self, range: TimeRange) -> Tx {
        valid_in_slots(self.config.slot_config.to_slot_range(&range))
    }

    /// Fee added by the convenience transfers.
    fn default_fee(&self) -> Value {
        Value::ada(self.config.ledger.min_fee)
    }

    // ---- spending ----

    /// Selects `user`'s outputs covering `value`; `None` when funds are short.
    pub fn try_spend(&self, user: &User, value: &Value) -> Option<UserSpend> {
        select_coins(&user.address(), value, &self.state.ledger.utxos).ok()
    }

    pub fn spend(&self, user: &User, value: &Value) -> Result<UserSpend> {
        Ok(select_coins(&user.address(), value, &self.state.ledger.utxos)?)
    }

    /// Runs `cont` with a selection for `value`, or logs `NotEnoughFunds` and skips it.
    pub fn with_spend<R>(
        &mut self,
        user: &User,
        value: &Value,
        cont: impl FnOnce(&mut Self, UserSpend) -> R,
    ) -> Option<R> {
        match select_coins(&user.address(), value, &self.state.ledger.utxos) {
            Ok(spend) => Some(cont(self, spend)),
            Err(err) => {
                self.log_fail(FailReason::NotEnoughFunds { owner: err.owner, requested: err.requested });
                None
            }
        }
    }

    /// Transfers `value` from `from` to `to`, paying the minimum fee. Failures are logged.
    pub fn send_value(&mut self, from: &User, value: &Value, to: &impl HasAddress) -> Result<()> {
        let fee = self.default_fee();
        let to = to.address();
        let total = value.clone() + &fee;
        self.with_spend(from, &total, |sim, spend| -> Result<()> {
            let tx = user_spend(spend) + pay_to_address(&to, value.clone()) + pay_fee(fee);
            let tx = sim.sign_tx(&[from], tx)?;
            sim.send_tx(tx);
            Ok(())
        })
        .unwrap_or(Ok(()))
    }

    // ---- clock ----

    pub fn current_slot(&self) -> Slot {
        self.state.ledger.slot
    }

    /// Start of the current slot in POSIX milliseconds.
    pub fn current_time(&self) -> PosixTime {
        self.config.slot_config.slot_to_begin_time(self.current_slot())
    }

    /// Advances the clock by `n` slots; `n <= 0` does nothing.
    pub fn wait_n_slots(&mut self, n: i64) {
        if n <= 0 {
            return;
        }
        let from = self.state.ledger.slot;
        self.state.ledger.slot = from.saturating_add(n as u64);
        debug!(from, to = self.state.ledger.slot, "slot advanced");
    }

    /// Advances by the whole slots contained in `duration_ms`.
    pub fn wait(&mut self, duration_ms: u64) {
        let slots = self.config.slot_config.duration_to_slots(duration_ms);
        self.wait_n_slots(i64::try_from(slots).unwrap_or(i64::MAX));
    }

    /// Advances to the slot containing `time`; never moves backwards.
    pub fn wait_until(&mut self, time: PosixTime) {
        let target = self.config.slot_config.time_to_slot(time);
        let current = self.current_slot();
        if target > current {
            self.wait_n_slots(i64::try_from(target - current).unwrap_or(i64::MAX));
        }
    }

    // ---- queries ----

    pub fn value_at(&self, target: &impl HasAddress) -> Value {
        self.state.ledger.utxos.value_at(&target.address())
    }

    pub fn utxo_at(&self, target: &impl HasAddress) -> Vec<(OutputRef, TxOut)> {
        let address = target.address();
        self.state
            .ledger
            .utxos
            .at_address(&address)
            .map(|(r, out)| (r.clone(), out.clone()))
            .collect()
    }

    /// Outputs at `target` with their datums resolved.
    pub fn box_at(&self, target: &impl HasAddress) -> Vec<TxBox> {
        self.utxo_at(target)
            .into_iter()
            .map(|(out_ref, out)| {
                let datum = out.datum_hash.as_ref().and_then(|h| self.state.ledger.datum(h)).cloned();
                TxBox { out_ref, out, datum }
            })
            .collect()
    }

    pub fn tx_out(&self, out_ref: &OutputRef) -> Option<&TxOut> {
        self.state.ledger.utxos.get(out_ref)
    }

    // ---- staking ----

    pub fn stake_rewards(&self, credential: &StakeCredential) -> i128 {
        self.state.ledger.stake.rewards(credential)
    }

    pub fn is_stake_registered(&self, credential: &StakeCredential) -> bool {
        self.state.ledger.stake.is_registered(credential)
    }

    pub fn stake_delegation(&self, credential: &StakeCredential) -> Option<&PoolId> {
        self.state.ledger.stake.delegation(credential)
    }

    pub fn is_pool_registered(&self, pool: &PoolId) -> bool {
        self.state.ledger.stake.is_pool_registered(pool)
    }

    /// Registers a stake pool. Registering twice is logged as an error.
    pub fn register_pool(&mut self, pool: PoolId) {
        if self.state.ledger.stake.register_pool(pool.clone()) {
            info!(pool = %pool, "pool registered");
            self.log_info(format!("Registered {}", pool));
        } else {
            self.log_error(format!("Pool already registered: {}", pool));
        }
    }

    /// Retires a stake pool; its delegations are dropped.
    pub fn retire_pool(&mut self, pool: &PoolId) {
        if self.state.ledger.stake.retire_pool(pool) {
            info!(pool = %pool, "pool retired");
            self.log_info(format!("Retired {}", pool));
        } else {
            self.log_error(format!("Cannot retire unknown pool: {}", pool));
        }
    }

    /// Splits `amount` lovelace of rewards evenly over the pool's delegators in credential order; the remainder goes one lovelace at a time to the first ones.
    pub fn distribute_rewards(&mut self, pool: &PoolId, amount: i128) {
        if !self.is_pool_registered(pool) {
            self.log_error(format!("Cannot reward unknown pool: {}", pool));
            return;
        }
        let delegators: Vec<StakeCredential> =
            self.state.ledger.stake.delegators(pool).into_iter().cloned().collect();
        if delegators.is_empty() || amount <= 0 {
            self.log_info(format!("No rewards distributed for {}", pool));
            return;
        }
        let count = delegators.len() as i128;
        let share = amount / count;
        let remainder = amount % count;
        for (i, credential) in delegators.iter().enumerate() {
            let extra = if (i as i128) < remainder { 1 } else { 0 };
            self.state.ledger.stake.add_rewards(credential, share + extra);
        }
        info!(pool = %pool, amount = %amount, delegators = delegators.len(), "rewards distributed");
        self.log_info(format!("Distributed {} lovelace to {} delegators of {}", amount, delegators.len(), pool));
    }

    // ---- event log ----

    pub fn log_info(&mut self, msg: impl Into<String>) {
        let slot = self.current_slot();
        self.state.log.push(slot, LogEntry::Info(msg.into()));
    }

    pub fn log_error(&mut self, msg: impl Into<String>) {
        self.log_fail(FailReason::Error(msg.into()));
    }

    pub fn log_fail(&mut self, reason: FailReason) {
        let slot = self.current_slot();
        warn!(slot, reason = %reason, "failure logged");
        self.state.log.push(slot, LogEntry::Failure(reason));
    }

    pub fn no_errors(&self) -> bool {
        self.state.log.failure_count() == 0
    }

    pub fn errors(&self) -> Vec<(Slot, FailReason)> {
        self.state.log.failures().map(|(slot, reason)| (slot, reason.clone())).collect()
    }

    /// Rendered failure list, or `None` when the run is clean.
    pub fn check_errors(&self) -> Option<String> {
        if self.no_errors() {
            None
        } else {
            Some(self.report(false).to_string())
        }
    }

    // ---- naming and reporting ----

    pub fn write_user_name(&mut self, user: &User, name: impl Into<String>) {
        self.state.names.name_address(user.address(), name);
    }

    pub fn write_address_name(&mut self, target: &impl HasAddress, name: impl Into<String>) {
        self.state.names.name_address(target.address(), name);
    }

    pub fn write_policy_name(&mut self, policy: &ScriptHash, name: impl Into<String>) {
        self.state.names.name_policy(policy.clone(), name);
    }

    pub fn report(&self, show_log: bool) -> Report {
        Report {
            failures: self.errors(),
            names: self.state.names.clone(),
            log: show_log.then(|| self.state.log.entries().to_vec()),
        }
    }

    /// `Ok` for a clean run, otherwise the rendered report.
    pub fn verdict(&self, show_log: bool) -> std::result::Result<(), String> {
        let report = self.report(show_log);
        if report.is_success() {
            Ok(())
        } else {
            Err(report.to_string())
        }
    }

    // ---- must-fail ----

    /// Runs `action` expecting it to log at least one failure.
    ///
    /// On failure the state is rolled back and every entry the action appended is kept, relabelled as an expected failure under `name`. If nothing failed, the post-action state is kept and `ExpectedFailureDidNotOccur(message)` is logged.
    pub fn must_fail_with_name<R>(&mut self, name: &str, message: &str, action: impl FnOnce(&mut Self) -> R) {
        let snapshot = self.snapshot();
        let failures_before = self.state.log.failure_count();
        let log_len = self.state.log.len();
        let _ = action(self);

        if self.state.log.failure_count() <= failures_before {
            self.log_fail(FailReason::ExpectedFailureDidNotOccur(message.to_string()));
            return;
        }
        let appended = self.state.log.split_off(log_len);
        self.restore(&snapshot);
        debug!(name, entries = appended.len(), "expected failure rolled back");
        self.state.log.extend(appended.into_iter().map(|(slot, entry)| {
            (slot, LogEntry::ExpectedFailure { name: name.to_string(), entry: Box::new(entry) })
        }));
    }

    pub fn must_fail<R>(&mut self, action: impl FnOnce(&mut Self) -> R) {
        self.must_fail_with_name(DEFAULT_FAILURE_NAME, DEFAULT_FAILURE_MESSAGE, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tx::spend_pub_key;

    fn sim(admin_funds: i128) -> Simulation {
        Simulation::new(SimConfig::with_admin_funds(Value::ada(admin_funds))).unwrap()
    }

    #[test]
    fn test_genesis() {
        let s = sim(1000);
        assert_eq!(s.value_at(&s.admin()), Value::ada(1000));
        assert_eq!(s.admin().index(), 0);
        assert_eq!(s.current_slot(), 0);
        assert!(s.no_errors());
    }

    #[test]
    fn test_users_are_deterministic() {
        let mut a = sim(1000);
        let mut b = sim(1000);
        let ua = a.new_user(Value::ada(10)).unwrap();
        let ub = b.new_user(Value::ada(10)).unwrap();
        assert_eq!(ua, ub);
        assert_eq!(ua.index(), 1);
        assert_eq!(a.ledger_state(), b.ledger_state());
    }

    #[test]
    fn test_new_user_without_admin_funds_is_logged() {
        let mut s = sim(100);
        let user = s.new_user(Value::ada(200)).unwrap();
        assert_eq!(s.value_at(&user), Value::zero());
        assert!(matches!(s.errors()[0].1, FailReason::NotEnoughFunds { .. }));
    }

    #[test]
    fn test_wait_n_slots() {
        let mut s = sim(10);
        s.wait_n_slots(0);
        s.wait_n_slots(-3);
        assert_eq!(s.current_slot(), 0);
        s.wait_n_slots(5);
        assert_eq!(s.current_slot(), 5);
        assert_eq!(s.current_time(), 5000);
    }

    #[test]
    fn test_wait_and_wait_until() {
        let mut s = sim(10);
        s.wait(2500);
        assert_eq!(s.current_slot(), 2);
        s.wait_until(10_000);
        assert_eq!(s.current_slot(), 10);
        s.wait_until(1_000);
        assert_eq!(s.current_slot(), 10);
    }

    #[test]
    fn test_unknown_user() {
        let s = sim(10);
        let mut other = sim(10);
        let stranger = other.new_user(Value::zero()).unwrap();
        assert!(matches!(s.user_keys(&stranger), Err(SimError::UnknownUser(_))));
        assert!(s.sign_tx(&[&stranger], Tx::default()).is_err());
    }

    #[test]
    fn test_submit_failure_keeps_state() {
        let mut s = sim(100);
        let before = s.ledger_state().clone();
        let result = s.submit_tx(spend_pub_key(genesis_ref()));
        assert!(result.is_err());
        assert_eq!(s.ledger_state(), &before);
        assert_eq!(s.errors().len(), 1);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut s = sim(100);
        let snapshot = s.snapshot();
        s.new_user(Value::ada(40)).unwrap();
        s.wait_n_slots(3);
        assert_eq!(snapshot.value_at(&s.admin()), Value::ada(100));
        s.restore(&snapshot);
        assert_eq!(s.value_at(&s.admin()), Value::ada(100));
        assert_eq!(s.current_slot(), 0);
        assert_eq!(s.users().count(), 1);
    }

    #[test]
    fn test_must_fail_without_failure() {
        let mut s = sim(100);
        s.must_fail(|sim| sim.log_info("fine"));
        assert_eq!(
            s.errors(),
            vec![(0, FailReason::ExpectedFailureDidNotOccur(DEFAULT_FAILURE_MESSAGE.to_string()))]
        );
    }

    #[test]
    fn test_valid_range_uses_slot_config() {
        let s = sim(10);
        let tx = s.valid_range(TimeRange::interval(2000, 5999));
        assert_eq!(tx.validity(), &crate::core::slot::SlotRange::interval(2, 5));
    }

    #[test]
    fn test_distribute_rewards_unknown_pool() {
        let mut s = sim(10);
        s.distribute_rewards(&PoolId::from_name("ghost"), 10);
        assert_eq!(s.errors().len(), 1);
    }
}
