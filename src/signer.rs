use secp256k1::SecretKey;
use std::collections::BTreeSet;
use crate::core::address::PubKeyHash;
use crate::core::tx::{Tx, Witness};
use crate::error::Result;
use crate::signature::{key_hash, public_key_hex, sign_digest, verify_digest};
use crate::utils::hex_to_32;

/// Adds a witness by `key` over the transaction id. Any earlier witness by the same key is replaced.
pub fn sign_tx(mut tx: Tx, key: &SecretKey) -> Result<Tx> {
    let id = tx.id()?;
    let digest = hex_to_32(id.as_str())?;
    let pub_key = public_key_hex(key);
    let signature = sign_digest(key, &digest)?;
    let pkh = PubKeyHash::new(key_hash(&pub_key)?);
    tx.add_witness(pkh, Witness { pub_key, signature });
    Ok(tx)
}

/// Signs with several keys in order.
pub fn sign_tx_with_keys<'a>(tx: Tx, keys: impl IntoIterator<Item = &'a SecretKey>) -> Result<Tx> {
    keys.into_iter().try_fold(tx, |tx, key| sign_tx(tx, key))
}

/// Checks every witness against the current body. Returns the signing key hashes, or the first key hash whose witness is invalid.
pub fn verify_witnesses(tx: &Tx) -> std::result::Result<BTreeSet<PubKeyHash>, PubKeyHash> {
    let digest = tx
        .id()
        .and_then(|id| hex_to_32(id.as_str()))
        .map_err(|_| PubKeyHash::new(String::new()))?;
    let mut signers = BTreeSet::new();
    for (pkh, witness) in tx.witnesses() {
        let valid = key_hash(&witness.pub_key).map(|h| h == pkh.as_str()).unwrap_or(false)
            && verify_digest(&digest, &witness.signature, &witness.pub_key).unwrap_or(false);
        if !valid {
            return Err(pkh.clone());
        }
        signers.insert(pkh.clone());
    }
    Ok(signers)
}

/// Public key hash of a secret key.
pub fn key_hash_of(key: &SecretKey) -> Result<PubKeyHash> {
    key_hash(&public_key_hex(key)).map(PubKeyHash::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tx::{pay_fee, spend_pub_key};
    use crate::core::utxo::{OutputRef, TxId};
    use crate::core::value::Value;

    fn secret(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn body() -> Tx {
        spend_pub_key(OutputRef::new(TxId::new("aa"), 0)) + pay_fee(Value::ada(1))
    }

    #[test]
    fn test_sign_and_verify() {
        let tx = sign_tx_with_keys(body(), [&secret(1), &secret(2)]).unwrap();
        let signers = verify_witnesses(&tx).unwrap();
        assert_eq!(signers.len(), 2);
        assert!(signers.contains(&key_hash_of(&secret(1)).unwrap()));
        assert!(signers.contains(&key_hash_of(&secret(2)).unwrap()));
    }

    #[test]
    fn test_witness_invalid_after_body_change() {
        let signed = sign_tx(body(), &secret(1)).unwrap();
        let tampered = signed + pay_fee(Value::ada(1));
        assert_eq!(verify_witnesses(&tampered), Err(key_hash_of(&secret(1)).unwrap()));
    }

    #[test]
    fn test_unsigned_has_no_signers() {
        assert!(verify_witnesses(&body()).unwrap().is_empty());
    }
}
