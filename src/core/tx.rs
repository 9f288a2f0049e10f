//! Transaction fragments and their builder primitives.
//!
//! A `Tx` is a mergeable fragment: `a + b` unions the input set, datum witnesses, signatories and witnesses, concatenates outputs, mints, withdrawals and certificates (left operand first), adds fees and intersects validity ranges.
//! Merge is associative with `Tx::default()` as identity. Output order is observable and preserved.
//!
//! **Determinism:** the transaction id hashes a canonical body (sorted sets, ordered sequences, witnesses excluded); same body, same id.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use crate::core::address::{HasAddress, PubKeyHash, StakeCredential};
use crate::core::script::{Datum, DatumHash, Redeemer, Script};
use crate::core::selection::UserSpend;
use crate::core::slot::SlotRange;
use crate::core::staking::PoolId;
use crate::core::utxo::{OutputRef, TxId, TxOut};
use crate::core::value::Value;
use crate::error::Result;
use crate::signature::hash_message;

/// How an input is unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxInputKind {
    /// Spent by the key that owns the output address.
    PubKey,
    /// Spent through the script locking the output.
    Script { redeemer: Redeemer, datum: Datum },
}

/// Mint (positive) or burn (negative) under one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mint {
    pub policy: Script,
    pub value: Value,
    pub redeemer: Redeemer,
}

/// Reward withdrawal, in lovelace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub credential: StakeCredential,
    pub amount: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Certificate {
    RegisterStake(StakeCredential),
    DeregisterStake(StakeCredential),
    DelegateStake(StakeCredential, PoolId),
}

impl Certificate {
    pub fn credential(&self) -> &StakeCredential {
        match self {
            Certificate::RegisterStake(c)
            | Certificate::DeregisterStake(c)
            | Certificate::DelegateStake(c, _) => c,
        }
    }
}

/// Signature by one key over the transaction id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub pub_key: String,
    pub signature: String,
}

/// Transaction fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tx {
    inputs: BTreeMap<OutputRef, TxInputKind>,
    outputs: Vec<TxOut>,
    datums: BTreeMap<DatumHash, Datum>,
    mints: Vec<Mint>,
    withdrawals: Vec<Withdrawal>,
    certificates: Vec<Certificate>,
    fee: Value,
    validity: SlotRange,
    extra_signatories: BTreeSet<PubKeyHash>,
    witnesses: BTreeMap<PubKeyHash, Witness>,
}

impl Tx {
    pub fn inputs(&self) -> &BTreeMap<OutputRef, TxInputKind> {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn datums(&self) -> &BTreeMap<DatumHash, Datum> {
        &self.datums
    }

    pub fn mints(&self) -> &[Mint] {
        &self.mints
    }

    pub fn withdrawals(&self) -> &[Withdrawal] {
        &self.withdrawals
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn fee(&self) -> &Value {
        &self.fee
    }

    pub fn validity(&self) -> &SlotRange {
        &self.validity
    }

    pub fn extra_signatories(&self) -> &BTreeSet<PubKeyHash> {
        &self.extra_signatories
    }

    pub fn witnesses(&self) -> &BTreeMap<PubKeyHash, Witness> {
        &self.witnesses
    }

    pub fn is_empty(&self) -> bool {
        *self == Tx::default()
    }

    /// Total minted value (burns negative).
    pub fn minted_value(&self) -> Value {
        self.mints.iter().map(|m| &m.value).sum()
    }

    /// Total withdrawn lovelace.
    pub fn withdrawn_value(&self) -> Value {
        Value::ada(self.withdrawals.iter().map(|w| w.amount).sum())
    }

    pub fn produced_value(&self) -> Value {
        self.outputs.iter().map(|o| &o.value).sum()
    }

    pub(crate) fn add_witness(&mut self, key_hash: PubKeyHash, witness: Witness) {
        self.witnesses.insert(key_hash, witness);
    }

    /// Hash of the canonical body. Witnesses are excluded.
    pub fn id(&self) -> Result<TxId> {
        #[derive(Serialize)]
        struct TxHashData<'a> {
            inputs: Vec<(&'a OutputRef, &'a TxInputKind)>,
            outputs: &'a [TxOut],
            datums: Vec<&'a DatumHash>,
            mints: &'a [Mint],
            withdrawals: &'a [Withdrawal],
            certificates: &'a [Certificate],
            fee: &'a Value,
            validity: &'a SlotRange,
            extra_signatories: Vec<&'a PubKeyHash>,
        }
        let hash_data = TxHashData {
            inputs: self.inputs.iter().collect(),
            outputs: &self.outputs,
            datums: self.datums.keys().collect(),
            mints: &self.mints,
            withdrawals: &self.withdrawals,
            certificates: &self.certificates,
            fee: &self.fee,
            validity: &self.validity,
            extra_signatories: self.extra_signatories.iter().collect(),
        };
        let hash_bytes = hash_message(&hash_data)?;
        Ok(TxId::new(hex::encode(hash_bytes)))
    }
}

impl<'a> AddAssign<&'a Tx> for Tx {
    fn add_assign(&mut self, rhs: &'a Tx) {
        for (out_ref, kind) in rhs.inputs.iter() {
            self.inputs.entry(out_ref.clone()).or_insert_with(|| kind.clone());
        }
        self.outputs.extend(rhs.outputs.iter().cloned());
        for (hash, datum) in rhs.datums.iter() {
            self.datums.entry(hash.clone()).or_insert_with(|| datum.clone());
        }
        self.mints.extend(rhs.mints.iter().cloned());
        self.withdrawals.extend(rhs.withdrawals.iter().cloned());
        self.certificates.extend(rhs.certificates.iter().cloned());
        self.fee += &rhs.fee;
        self.validity = self.validity.intersect(&rhs.validity);
        self.extra_signatories.extend(rhs.extra_signatories.iter().cloned());
        for (pkh, witness) in rhs.witnesses.iter() {
            self.witnesses.entry(pkh.clone()).or_insert_with(|| witness.clone());
        }
    }
}

impl AddAssign for Tx {
    fn add_assign(&mut self, rhs: Tx) {
        *self += &rhs;
    }
}

impl Add for Tx {
    type Output = Tx;

    fn add(mut self, rhs: Tx) -> Tx {
        self += &rhs;
        self
    }
}

impl Sum for Tx {
    fn sum<I: Iterator<Item = Tx>>(iter: I) -> Tx {
        iter.fold(Tx::default(), |acc, tx| acc + tx)
    }
}

impl fmt::Display for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inputs: {}, outputs: {}, mints: {}, withdrawals: {}, certificates: {}, fee: {}, valid: {}",
            self.inputs.len(),
            self.outputs.len(),
            self.mints.len(),
            self.withdrawals.len(),
            self.certificates.len(),
            self.fee,
            self.validity
        )
    }
}

/// Pays `value` to any address-bearing target.
pub fn pay_to_address(target: &impl HasAddress, value: Value) -> Tx {
    Tx {
        outputs: vec![TxOut::new(target.address(), value)],
        ..Tx::default()
    }
}

/// Pays `value` to a script together with its datum.
pub fn pay_to_script(script: &Script, datum: Datum, value: Value) -> Tx {
    let hash = datum.hash();
    let mut datums = BTreeMap::new();
    datums.insert(hash.clone(), datum);
    Tx {
        outputs: vec![TxOut::with_datum_hash(script.address(), value, hash)],
        datums,
        ..Tx::default()
    }
}

/// Spends a key-locked output.
pub fn spend_pub_key(out_ref: OutputRef) -> Tx {
    let mut inputs = BTreeMap::new();
    inputs.insert(out_ref, TxInputKind::PubKey);
    Tx { inputs, ..Tx::default() }
}

/// Inputs and change output of a coin selection.
pub fn user_spend(spend: UserSpend) -> Tx {
    let (inputs, change) = spend.into_parts();
    Tx {
        inputs: inputs.into_iter().map(|r| (r, TxInputKind::PubKey)).collect(),
        outputs: change.into_iter().collect(),
        ..Tx::default()
    }
}

/// Spends a script-locked output with `redeemer`, supplying the output's `datum`.
pub fn spend_script(out_ref: OutputRef, redeemer: Redeemer, datum: Datum) -> Tx {
    let mut inputs = BTreeMap::new();
    inputs.insert(out_ref, TxInputKind::Script { redeemer, datum });
    Tx { inputs, ..Tx::default() }
}

/// Mints `value` under `policy`; negative quantities burn.
pub fn mint_value(policy: &Script, redeemer: Redeemer, value: Value) -> Tx {
    Tx {
        mints: vec![Mint { policy: policy.clone(), value, redeemer }],
        ..Tx::default()
    }
}

pub fn pay_fee(fee: Value) -> Tx {
    Tx { fee, ..Tx::default() }
}

/// Restricts the slots in which the transaction is valid.
pub fn valid_in_slots(range: SlotRange) -> Tx {
    Tx { validity: range, ..Tx::default() }
}

/// Withdraws `amount` lovelace of rewards for `credential`.
pub fn withdraw_stake(credential: StakeCredential, amount: i128) -> Tx {
    Tx {
        withdrawals: vec![Withdrawal { credential, amount }],
        ..Tx::default()
    }
}

fn certificate(cert: Certificate) -> Tx {
    Tx { certificates: vec![cert], ..Tx::default() }
}

pub fn register_stake(credential: StakeCredential) -> Tx {
    certificate(Certificate::RegisterStake(credential))
}

pub fn deregister_stake(credential: StakeCredential) -> Tx {
    certificate(Certificate::DeregisterStake(credential))
}

pub fn delegate_stake(credential: StakeCredential, pool: PoolId) -> Tx {
    certificate(Certificate::DelegateStake(credential, pool))
}

/// Requires a signature from `pkh`; visible to scripts through `ScriptContext::signed_by`.
pub fn add_signatory(pkh: PubKeyHash) -> Tx {
    let mut extra_signatories = BTreeSet::new();
    extra_signatories.insert(pkh);
    Tx { extra_signatories, ..Tx::default() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address::Address;
    use crate::core::script::Data;

    fn out_ref(tx: &str, index: u32) -> OutputRef {
        OutputRef::new(TxId::new(tx), index)
    }

    fn alice() -> PubKeyHash {
        PubKeyHash::new("alice")
    }

    fn bob() -> PubKeyHash {
        PubKeyHash::new("bob")
    }

    #[test]
    fn test_empty_is_identity() {
        let tx = spend_pub_key(out_ref("aa", 0)) + pay_to_address(&alice(), Value::ada(5));
        assert_eq!(tx.clone() + Tx::default(), tx);
        assert_eq!(Tx::default() + tx.clone(), tx);
        assert!(Tx::default().is_empty());
    }

    #[test]
    fn test_merge_associative() {
        let a = spend_pub_key(out_ref("aa", 0)) + pay_fee(Value::ada(1));
        let b = pay_to_address(&alice(), Value::ada(5)) + valid_in_slots(SlotRange::interval(1, 9));
        let c = pay_to_address(&bob(), Value::ada(7)) + valid_in_slots(SlotRange::interval(3, 20));
        assert_eq!((a.clone() + b.clone()) + c.clone(), a + (b + c));
    }

    #[test]
    fn test_merge_preserves_output_order() {
        let tx = pay_to_address(&alice(), Value::ada(1)) + pay_to_address(&bob(), Value::ada(2));
        let addrs: Vec<Address> = tx.outputs().iter().map(|o| o.address.clone()).collect();
        assert_eq!(addrs, vec![alice().address(), bob().address()]);
    }

    #[test]
    fn test_merge_unions_inputs() {
        let tx = spend_pub_key(out_ref("aa", 0)) + spend_pub_key(out_ref("aa", 0)) + spend_pub_key(out_ref("aa", 1));
        assert_eq!(tx.inputs().len(), 2);
    }

    #[test]
    fn test_merge_adds_fees_and_intersects_validity() {
        let tx = pay_fee(Value::ada(2))
            + pay_fee(Value::ada(3))
            + valid_in_slots(SlotRange::interval(0, 10))
            + valid_in_slots(SlotRange::interval(5, 50));
        assert_eq!(tx.fee(), &Value::ada(5));
        assert_eq!(tx.validity(), &SlotRange::interval(5, 10));
    }

    #[test]
    fn test_pay_to_script_records_datum() {
        let script = Script::new("lock");
        let datum = Data::new(&7u32).unwrap();
        let tx = pay_to_script(&script, datum.clone(), Value::ada(10));
        let out = &tx.outputs()[0];
        assert_eq!(out.address, script.address());
        assert_eq!(out.datum_hash, Some(datum.hash()));
        assert_eq!(tx.datums().get(&datum.hash()), Some(&datum));
    }

    #[test]
    fn test_value_totals() {
        let policy = Script::new("policy");
        let tx = mint_value(&policy, Data::unit(), Value::token(policy.hash().clone(), "t", 5))
            + withdraw_stake(StakeCredential::new(alice()), 30)
            + pay_to_address(&bob(), Value::ada(4))
            + pay_to_address(&bob(), Value::ada(6));
        assert_eq!(tx.minted_value(), Value::token(policy.hash().clone(), "t", 5));
        assert_eq!(tx.withdrawn_value(), Value::ada(30));
        assert_eq!(tx.produced_value(), Value::ada(10));
    }

    #[test]
    fn test_id_deterministic_and_body_sensitive() {
        let tx = spend_pub_key(out_ref("aa", 0)) + pay_to_address(&alice(), Value::ada(5));
        assert_eq!(tx.id().unwrap(), tx.clone().id().unwrap());
        let other = spend_pub_key(out_ref("aa", 0)) + pay_to_address(&alice(), Value::ada(6));
        assert_ne!(tx.id().unwrap(), other.id().unwrap());
    }

    #[test]
    fn test_id_ignores_witnesses() {
        let mut tx = spend_pub_key(out_ref("aa", 0));
        let id = tx.id().unwrap();
        tx.add_witness(alice(), Witness { pub_key: "00".into(), signature: "11".into() });
        assert_eq!(tx.id().unwrap(), id);
    }

    #[test]
    fn test_certificate_credential() {
        let cred = StakeCredential::new(alice());
        let tx = register_stake(cred.clone()) + delegate_stake(cred.clone(), PoolId::new("pool"));
        assert_eq!(tx.certificates().len(), 2);
        assert!(tx.certificates().iter().all(|c| c.credential() == &cred));
    }
}
