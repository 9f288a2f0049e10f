//! Ledger rules: the step that turns a transaction and the current ledger state into a new state or a structured failure.
//!
//! `LedgerRules` is the seam; `BasicLedger` is the reference implementation. Its checks run in a fixed order (structure, validity interval, value, witnesses, staking, scripts) so the same transaction against the same state always reports the same failure.
//! A rule set must never partially apply a transaction: on `Err` the caller keeps its old state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;
use crate::core::address::{Address, PubKeyHash, ScriptHash, StakeCredential};
use crate::core::script::{Datum, DatumHash, Script, ScriptContext, ScriptPurpose, Validator};
use crate::core::slot::{Slot, SlotRange};
use crate::core::staking::{PoolId, StakeState};
use crate::core::tx::{Certificate, Tx, TxInputKind};
use crate::core::utxo::{OutputRef, TxId, TxOut, UtxoStore};
use crate::core::value::Value;
use crate::error::SimError;
use crate::signer::verify_witnesses;

/// State the ledger rules read and produce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub slot: Slot,
    pub utxos: UtxoStore,
    pub datums: Arc<BTreeMap<DatumHash, Datum>>,
    pub stake: StakeState,
}

impl LedgerState {
    pub fn datum(&self, hash: &DatumHash) -> Option<&Datum> {
        self.datums.get(hash)
    }
}

/// Record of an applied transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub tx_id: TxId,
    pub slot: Slot,
    pub tx: Tx,
    pub consumed: Vec<OutputRef>,
    pub produced: Vec<OutputRef>,
}

/// Why the ledger rejected a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerFailure {
    #[error("Transaction has no inputs")]
    NoInputs,

    #[error("Input not found in the UTXO set: {0}")]
    MissingInput(OutputRef),

    #[error("Input {0} is spent the wrong way for its address")]
    WrongInputKind(OutputRef),

    #[error("Current slot {slot} is outside the validity range {range}")]
    OutsideValidityRange { slot: Slot, range: SlotRange },

    #[error("Output {index} carries a negative quantity")]
    NegativeOutput { index: usize },

    #[error("Mint under policy {policy} touches other assets")]
    MintPolicyMismatch { policy: ScriptHash },

    #[error("Fee too small: required {required}, got {got}")]
    FeeTooSmall { required: i128, got: i128 },

    #[error("Value not preserved: consumed {consumed}, produced {produced}")]
    ValueNotPreserved { consumed: Value, produced: Value },

    #[error("Missing signature from {0}")]
    MissingSignature(PubKeyHash),

    #[error("Invalid witness for {0}")]
    InvalidWitness(PubKeyHash),

    #[error("Datum does not match the datum hash of {0}")]
    DatumMismatch(OutputRef),

    #[error("No validator registered for script {0}")]
    ScriptNotFound(ScriptHash),

    #[error("Script {script} rejected the transaction: {reason}")]
    ScriptRejected { script: ScriptHash, reason: String },

    #[error("Stake credential already registered: {0}")]
    StakeAlreadyRegistered(StakeCredential),

    #[error("Stake credential not registered: {0}")]
    StakeNotRegistered(StakeCredential),

    #[error("Unknown stake pool: {0}")]
    UnknownPool(PoolId),

    #[error("Withdrawal for {credential} must be exactly {expected}, got {got}")]
    WithdrawalMismatch { credential: StakeCredential, expected: i128, got: i128 },

    #[error("Rewards of {0} must be withdrawn before deregistration")]
    RewardsNotWithdrawn(StakeCredential),

    #[error("Malformed transaction: {0}")]
    Malformed(String),
}

impl From<LedgerFailure> for SimError {
    fn from(err: LedgerFailure) -> Self {
        SimError::Validation(err.to_string())
    }
}

/// Protocol parameters of the reference rules, in lovelace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerParams {
    pub min_fee: i128,
    pub stake_deposit: i128,
}

/// Applies one transaction. Implementations must be deterministic.
pub trait LedgerRules: Send + Sync {
    fn apply(&self, tx: &Tx, state: &LedgerState) -> Result<(LedgerState, TxRecord), LedgerFailure>;
}

/// Reference ledger rules with pluggable script validators.
#[derive(Clone, Default)]
pub struct BasicLedger {
    params: LedgerParams,
    validators: BTreeMap<ScriptHash, Arc<dyn Validator>>,
}

impl fmt::Debug for BasicLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicLedger")
            .field("params", &self.params)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BasicLedger {
    pub fn new(params: LedgerParams) -> Self {
        Self {
            params,
            validators: BTreeMap::new(),
        }
    }

    pub fn params(&self) -> &LedgerParams {
        &self.params
    }

    /// Registers the logic of a spending validator or minting policy.
    pub fn with_validator(mut self, script: &Script, validator: impl Validator + 'static) -> Self {
        self.validators.insert(script.hash().clone(), Arc::new(validator));
        self
    }

    /// Structure: inputs exist and are spent the right way, outputs are non-negative, mints stay within their policy.
    fn check_structure<'a>(
        &self,
        tx: &'a Tx,
        state: &'a LedgerState,
    ) -> Result<Vec<(&'a OutputRef, &'a TxOut)>, LedgerFailure> {
        if tx.inputs().is_empty() {
            return Err(LedgerFailure::NoInputs);
        }
        let mut spent = Vec::with_capacity(tx.inputs().len());
        for (out_ref, kind) in tx.inputs() {
            let out = state
                .utxos
                .get(out_ref)
                .ok_or_else(|| LedgerFailure::MissingInput(out_ref.clone()))?;
            let kind_matches = matches!(
                (&out.address, kind),
                (Address::Key(_), TxInputKind::PubKey) | (Address::Script(_), TxInputKind::Script { .. })
            );
            if !kind_matches {
                return Err(LedgerFailure::WrongInputKind(out_ref.clone()));
            }
            spent.push((out_ref, out));
        }
        for (index, out) in tx.outputs().iter().enumerate() {
            if !out.value.negative_part().is_zero() {
                return Err(LedgerFailure::NegativeOutput { index });
            }
        }
        for mint in tx.mints() {
            if mint.value.restrict_to_policy(mint.policy.hash()) != mint.value {
                return Err(LedgerFailure::MintPolicyMismatch { policy: mint.policy.hash().clone() });
            }
        }
        Ok(spent)
    }

    fn check_validity(&self, tx: &Tx, slot: Slot) -> Result<(), LedgerFailure> {
        if !tx.validity().contains(slot) {
            return Err(LedgerFailure::OutsideValidityRange { slot, range: *tx.validity() });
        }
        Ok(())
    }

    /// Fee floor and value preservation, deposits included.
    fn check_value(&self, tx: &Tx, spent: &[(&OutputRef, &TxOut)]) -> Result<(), LedgerFailure> {
        let fee = tx.fee().ada_quantity();
        if tx.fee() != &Value::ada(fee) {
            return Err(LedgerFailure::Malformed(format!("fee must be paid in ada, got {}", tx.fee())));
        }
        if fee < self.params.min_fee {
            return Err(LedgerFailure::FeeTooSmall { required: self.params.min_fee, got: fee });
        }
        let registrations = tx
            .certificates()
            .iter()
            .filter(|c| matches!(c, Certificate::RegisterStake(_)))
            .count() as i128;
        let deregistrations = tx
            .certificates()
            .iter()
            .filter(|c| matches!(c, Certificate::DeregisterStake(_)))
            .count() as i128;

        let input_value: Value = spent.iter().map(|(_, out)| &out.value).sum();
        let consumed = input_value
            + tx.minted_value()
            + tx.withdrawn_value()
            + Value::ada(deregistrations * self.params.stake_deposit);
        let produced = tx.produced_value()
            + tx.fee().clone()
            + Value::ada(registrations * self.params.stake_deposit);
        if consumed != produced {
            return Err(LedgerFailure::ValueNotPreserved { consumed, produced });
        }
        Ok(())
    }

    /// Every required signer has a valid witness.
    fn check_witnesses(&self, tx: &Tx, spent: &[(&OutputRef, &TxOut)]) -> Result<(), LedgerFailure> {
        let signers = verify_witnesses(tx).map_err(LedgerFailure::InvalidWitness)?;
        let mut required: BTreeSet<&PubKeyHash> = BTreeSet::new();
        required.extend(spent.iter().filter_map(|(_, out)| out.address.key_hash()));
        required.extend(tx.extra_signatories().iter());
        required.extend(tx.withdrawals().iter().map(|w| w.credential.key_hash()));
        required.extend(tx.certificates().iter().filter_map(|c| match c {
            Certificate::RegisterStake(_) => None,
            other => Some(other.credential().key_hash()),
        }));
        match required.into_iter().find(|pkh| !signers.contains(*pkh)) {
            Some(missing) => Err(LedgerFailure::MissingSignature(missing.clone())),
            None => Ok(()),
        }
    }

    /// Withdrawals then certificates, applied in order to a copy of the stake state.
    fn apply_staking(&self, tx: &Tx, stake: &StakeState) -> Result<StakeState, LedgerFailure> {
        let mut next = stake.clone();
        for withdrawal in tx.withdrawals() {
            let credential = &withdrawal.credential;
            if !next.is_registered(credential) {
                return Err(LedgerFailure::StakeNotRegistered(credential.clone()));
            }
            let expected = next.rewards(credential);
            if withdrawal.amount != expected {
                return Err(LedgerFailure::WithdrawalMismatch {
                    credential: credential.clone(),
                    expected,
                    got: withdrawal.amount,
                });
            }
            next.take_rewards(credential);
        }
        for cert in tx.certificates() {
            match cert {
                Certificate::RegisterStake(credential) => {
                    if !next.register(credential.clone()) {
                        return Err(LedgerFailure::StakeAlreadyRegistered(credential.clone()));
                    }
                }
                Certificate::DeregisterStake(credential) => {
                    match next.account(credential) {
                        None => return Err(LedgerFailure::StakeNotRegistered(credential.clone())),
                        Some(account) if account.rewards != 0 => {
                            return Err(LedgerFailure::RewardsNotWithdrawn(credential.clone()));
                        }
                        Some(_) => {
                            next.deregister(credential);
                        }
                    }
                }
                Certificate::DelegateStake(credential, pool) => {
                    if !next.is_pool_registered(pool) {
                        return Err(LedgerFailure::UnknownPool(pool.clone()));
                    }
                    if !next.delegate(credential, pool.clone()) {
                        return Err(LedgerFailure::StakeNotRegistered(credential.clone()));
                    }
                }
            }
        }
        Ok(next)
    }

    fn validator(&self, hash: &ScriptHash) -> Result<&Arc<dyn Validator>, LedgerFailure> {
        self.validators
            .get(hash)
            .ok_or_else(|| LedgerFailure::ScriptNotFound(hash.clone()))
    }

    /// Datums first, then every spending validator and minting policy.
    fn run_scripts(&self, tx: &Tx, spent: &[(&OutputRef, &TxOut)], slot: Slot) -> Result<(), LedgerFailure> {
        for (out_ref, out) in spent {
            if let (Some(TxInputKind::Script { datum, .. }), Some(expected)) =
                (tx.inputs().get(*out_ref), out.datum_hash.as_ref())
            {
                if &datum.hash() != expected {
                    return Err(LedgerFailure::DatumMismatch((*out_ref).clone()));
                }
            }
        }
        for (out_ref, out) in spent {
            let (Some(TxInputKind::Script { redeemer, datum }), Some(script)) =
                (tx.inputs().get(*out_ref), out.address.script_hash())
            else {
                continue;
            };
            let ctx = ScriptContext {
                tx,
                slot,
                purpose: ScriptPurpose::Spend { out_ref, output: out, datum, redeemer },
            };
            trace!(script = %script, input = %out_ref, "running spending validator");
            self.validator(script)?
                .validate(&ctx)
                .map_err(|reason| LedgerFailure::ScriptRejected { script: script.clone(), reason })?;
        }
        for mint in tx.mints() {
            let policy = mint.policy.hash();
            let ctx = ScriptContext {
                tx,
                slot,
                purpose: ScriptPurpose::Mint { policy, value: &mint.value, redeemer: &mint.redeemer },
            };
            trace!(policy = %policy, "running minting policy");
            self.validator(policy)?
                .validate(&ctx)
                .map_err(|reason| LedgerFailure::ScriptRejected { script: policy.clone(), reason })?;
        }
        Ok(())
    }
}

impl LedgerRules for BasicLedger {
    fn apply(&self, tx: &Tx, state: &LedgerState) -> Result<(LedgerState, TxRecord), LedgerFailure> {
        let spent = self.check_structure(tx, state)?;
        self.check_validity(tx, state.slot)?;
        self.check_value(tx, &spent)?;
        self.check_witnesses(tx, &spent)?;
        let stake = self.apply_staking(tx, &state.stake)?;
        self.run_scripts(tx, &spent, state.slot)?;

        let tx_id = tx.id().map_err(|e| LedgerFailure::Malformed(e.to_string()))?;
        let consumed: Vec<OutputRef> = tx.inputs().keys().cloned().collect();
        let produced: Vec<(OutputRef, TxOut)> = tx
            .outputs()
            .iter()
            .enumerate()
            .map(|(i, out)| (OutputRef::new(tx_id.clone(), i as u32), out.clone()))
            .collect();
        let produced_refs = produced.iter().map(|(r, _)| r.clone()).collect();

        let mut next = state.clone();
        next.utxos
            .commit(&consumed, produced)
            .map_err(|e| LedgerFailure::Malformed(e.to_string()))?;
        if !tx.datums().is_empty() {
            let datums = Arc::make_mut(&mut next.datums);
            for (hash, datum) in tx.datums() {
                datums.insert(hash.clone(), datum.clone());
            }
        }
        next.stake = stake;

        let record = TxRecord {
            tx_id,
            slot: state.slot,
            tx: tx.clone(),
            consumed,
            produced: produced_refs,
        };
        Ok((next, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::Data;
    use crate::core::tx::{
        add_signatory, delegate_stake, deregister_stake, mint_value, pay_fee, pay_to_address, pay_to_script,
        register_stake, spend_pub_key, spend_script, valid_in_slots, withdraw_stake,
    };
    use crate::signer::{key_hash_of, sign_tx, sign_tx_with_keys};
    use secp256k1::SecretKey;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn pkh(byte: u8) -> PubKeyHash {
        key_hash_of(&key(byte)).unwrap()
    }

    fn genesis_ref(index: u32) -> OutputRef {
        OutputRef::new(TxId::new("genesis"), index)
    }

    /// Key 1 owns 100 ada at genesis#0.
    fn state() -> LedgerState {
        let mut state = LedgerState::default();
        state
            .utxos
            .commit(&[], vec![(genesis_ref(0), TxOut::new(Address::Key(pkh(1)), Value::ada(100)))])
            .unwrap();
        state
    }

    fn transfer(amount: i128) -> Tx {
        spend_pub_key(genesis_ref(0))
            + pay_to_address(&pkh(2), Value::ada(amount))
            + pay_to_address(&pkh(1), Value::ada(100 - amount))
    }

    #[test]
    fn test_apply_transfer() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(transfer(30), &key(1)).unwrap();
        let (next, record) = ledger.apply(&tx, &state()).unwrap();
        assert!(!next.utxos.contains(&genesis_ref(0)));
        assert_eq!(next.utxos.value_at(&Address::Key(pkh(2))), Value::ada(30));
        assert_eq!(next.utxos.value_at(&Address::Key(pkh(1))), Value::ada(70));
        assert_eq!(record.consumed, vec![genesis_ref(0)]);
        assert_eq!(record.produced.len(), 2);
        assert!(record.produced.iter().all(|r| r.tx_id == record.tx_id));
    }

    #[test]
    fn test_no_inputs() {
        let ledger = BasicLedger::default();
        let tx = pay_to_address(&pkh(2), Value::ada(1));
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::NoInputs);
    }

    #[test]
    fn test_missing_input() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(spend_pub_key(genesis_ref(9)), &key(1)).unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::MissingInput(genesis_ref(9)));
    }

    #[test]
    fn test_missing_signature() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(transfer(30), &key(2)).unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::MissingSignature(pkh(1)));
    }

    #[test]
    fn test_extra_signatory_required() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(transfer(30) + add_signatory(pkh(3)), &key(1)).unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::MissingSignature(pkh(3)));
    }

    #[test]
    fn test_value_not_preserved() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(spend_pub_key(genesis_ref(0)) + pay_to_address(&pkh(2), Value::ada(101)), &key(1)).unwrap();
        assert!(matches!(ledger.apply(&tx, &state()), Err(LedgerFailure::ValueNotPreserved { .. })));
    }

    #[test]
    fn test_negative_output() {
        let ledger = BasicLedger::default();
        let tx = sign_tx(
            transfer(30) + pay_to_address(&pkh(2), Value::ada(-5)) + pay_to_address(&pkh(2), Value::ada(5)),
            &key(1),
        )
        .unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::NegativeOutput { index: 2 });
    }

    #[test]
    fn test_fee_floor() {
        let ledger = BasicLedger::new(LedgerParams { min_fee: 2, stake_deposit: 0 });
        let tx = sign_tx(
            spend_pub_key(genesis_ref(0)) + pay_to_address(&pkh(2), Value::ada(99)) + pay_fee(Value::ada(1)),
            &key(1),
        )
        .unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::FeeTooSmall { required: 2, got: 1 });

        let tx = sign_tx(
            spend_pub_key(genesis_ref(0)) + pay_to_address(&pkh(2), Value::ada(98)) + pay_fee(Value::ada(2)),
            &key(1),
        )
        .unwrap();
        assert!(ledger.apply(&tx, &state()).is_ok());
    }

    #[test]
    fn test_validity_range() {
        let ledger = BasicLedger::default();
        let mut st = state();
        st.slot = 20;
        let tx = sign_tx(transfer(30) + valid_in_slots(SlotRange::interval(0, 10)), &key(1)).unwrap();
        assert_eq!(
            ledger.apply(&tx, &st).unwrap_err(),
            LedgerFailure::OutsideValidityRange { slot: 20, range: SlotRange::interval(0, 10) }
        );
    }

    #[test]
    fn test_failure_leaves_state_untouched() {
        let ledger = BasicLedger::default();
        let st = state();
        let before = st.clone();
        let tx = sign_tx(transfer(30), &key(2)).unwrap();
        assert!(ledger.apply(&tx, &st).is_err());
        assert_eq!(st, before);
    }

    #[test]
    fn test_script_spend_and_datum_check() {
        let script = Script::new("guess");
        let ledger = BasicLedger::default().with_validator(&script, |ctx: &ScriptContext<'_>| match ctx.purpose {
            ScriptPurpose::Spend { datum, redeemer, .. } if datum == redeemer => Ok(()),
            _ => Err("wrong guess".to_string()),
        });
        let secret = Data::new(&"42").unwrap();
        let lock = sign_tx(
            spend_pub_key(genesis_ref(0))
                + pay_to_script(&script, secret.clone(), Value::ada(40))
                + pay_to_address(&pkh(1), Value::ada(60)),
            &key(1),
        )
        .unwrap();
        let (st, record) = ledger.apply(&lock, &state()).unwrap();
        let script_ref = record.produced[0].clone();
        assert_eq!(st.datum(&secret.hash()), Some(&secret));

        let wrong = spend_script(script_ref.clone(), Data::new(&"7").unwrap(), secret.clone())
            + pay_to_address(&pkh(2), Value::ada(40));
        assert_eq!(
            ledger.apply(&wrong, &st).unwrap_err(),
            LedgerFailure::ScriptRejected { script: script.hash().clone(), reason: "wrong guess".into() }
        );

        let bad_datum = spend_script(script_ref.clone(), Data::new(&"7").unwrap(), Data::new(&"7").unwrap())
            + pay_to_address(&pkh(2), Value::ada(40));
        assert_eq!(ledger.apply(&bad_datum, &st).unwrap_err(), LedgerFailure::DatumMismatch(script_ref.clone()));

        let right = spend_script(script_ref, secret.clone(), secret) + pay_to_address(&pkh(2), Value::ada(40));
        let (st, _) = ledger.apply(&right, &st).unwrap();
        assert_eq!(st.utxos.value_at(&Address::Key(pkh(2))), Value::ada(40));
    }

    #[test]
    fn test_wrong_input_kind() {
        let ledger = BasicLedger::default();
        let tx = spend_script(genesis_ref(0), Data::unit(), Data::unit()) + pay_to_address(&pkh(2), Value::ada(100));
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::WrongInputKind(genesis_ref(0)));
    }

    #[test]
    fn test_unregistered_script() {
        let ledger = BasicLedger::default();
        let policy = Script::new("policy");
        let minted = Value::token(policy.hash().clone(), "t", 5);
        let tx = sign_tx(
            transfer(30) + mint_value(&policy, Data::unit(), minted.clone()) + pay_to_address(&pkh(2), minted),
            &key(1),
        )
        .unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::ScriptNotFound(policy.hash().clone()));
    }

    #[test]
    fn test_mint_policy_mismatch() {
        let policy = Script::new("policy");
        let ledger = BasicLedger::default().with_validator(&policy, |_: &ScriptContext<'_>| Ok(()));
        let foreign = Value::token(ScriptHash::new("other"), "t", 5);
        let tx = sign_tx(
            transfer(30) + mint_value(&policy, Data::unit(), foreign.clone()) + pay_to_address(&pkh(2), foreign),
            &key(1),
        )
        .unwrap();
        assert_eq!(
            ledger.apply(&tx, &state()).unwrap_err(),
            LedgerFailure::MintPolicyMismatch { policy: policy.hash().clone() }
        );
    }

    #[test]
    fn test_staking_lifecycle_with_deposit() {
        let ledger = BasicLedger::new(LedgerParams { min_fee: 0, stake_deposit: 10 });
        let cred = StakeCredential::new(pkh(5));
        let pool = PoolId::from_name("pool");
        let mut st = state();
        st.stake.register_pool(pool.clone());

        let register = sign_tx(
            spend_pub_key(genesis_ref(0))
                + register_stake(cred.clone())
                + delegate_stake(cred.clone(), pool.clone())
                + pay_to_address(&pkh(1), Value::ada(90)),
            &key(1),
        )
        .unwrap();
        // delegation needs the staking key
        assert_eq!(ledger.apply(&register, &st).unwrap_err(), LedgerFailure::MissingSignature(pkh(5)));

        let register = sign_tx_with_keys(register, [&key(1), &key(5)]).unwrap();
        let (mut st, record) = ledger.apply(&register, &st).unwrap();
        assert_eq!(st.stake.delegation(&cred), Some(&pool));

        st.stake.add_rewards(&cred, 7);
        let change = record.produced[0].clone();
        let short = sign_tx_with_keys(
            spend_pub_key(change.clone()) + withdraw_stake(cred.clone(), 3) + pay_to_address(&pkh(1), Value::ada(93)),
            [&key(1), &key(5)],
        )
        .unwrap();
        assert_eq!(
            ledger.apply(&short, &st).unwrap_err(),
            LedgerFailure::WithdrawalMismatch { credential: cred.clone(), expected: 7, got: 3 }
        );

        let dereg_early = sign_tx_with_keys(
            spend_pub_key(change.clone()) + deregister_stake(cred.clone()) + pay_to_address(&pkh(1), Value::ada(100)),
            [&key(1), &key(5)],
        )
        .unwrap();
        assert_eq!(ledger.apply(&dereg_early, &st).unwrap_err(), LedgerFailure::RewardsNotWithdrawn(cred.clone()));

        let full = sign_tx_with_keys(
            spend_pub_key(change)
                + withdraw_stake(cred.clone(), 7)
                + deregister_stake(cred.clone())
                + pay_to_address(&pkh(1), Value::ada(107)),
            [&key(1), &key(5)],
        )
        .unwrap();
        let (st, _) = ledger.apply(&full, &st).unwrap();
        assert!(!st.stake.is_registered(&cred));
        assert_eq!(st.utxos.value_at(&Address::Key(pkh(1))), Value::ada(107));
    }

    #[test]
    fn test_delegate_to_unknown_pool() {
        let ledger = BasicLedger::default();
        let cred = StakeCredential::new(pkh(5));
        let tx = sign_tx_with_keys(
            transfer(30) + register_stake(cred.clone()) + delegate_stake(cred, PoolId::from_name("nope")),
            [&key(1), &key(5)],
        )
        .unwrap();
        assert_eq!(ledger.apply(&tx, &state()).unwrap_err(), LedgerFailure::UnknownPool(PoolId::from_name("nope")));
    }
}
