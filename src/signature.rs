use secp256k1::{Secp256k1, SecretKey, PublicKey, Message};
use secp256k1::ecdsa::Signature;
use sha2::{Sha256, Digest};
use crate::error::{SimError, Result};

const DOMAIN_SEPARATOR: &str = "LedgerSim:";

/// Hashes a serializable message with the domain separator
pub fn hash_message<T: serde::Serialize>(message: &T) -> Result<[u8; 32]> {
    let json = serde_json::to_string(message)
        .map_err(|e| SimError::Validation(format!("Failed to serialize message: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_SEPARATOR.as_bytes());
    hasher.update(json.as_bytes());
    let hash = hasher.finalize();

    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    Ok(result)
}

/// Signs a 32-byte digest. Returns the low-S compact signature as hex.
pub fn sign_digest(private_key: &SecretKey, digest: &[u8; 32]) -> Result<String> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(digest)
        .map_err(|e| SimError::Signature(format!("Invalid message hash: {}", e)))?;

    let mut signature = secp.sign_ecdsa(&msg, private_key);
    signature.normalize_s();
    Ok(hex::encode(signature.serialize_compact()))
}

/// Verifies a hex compact signature over a digest against a hex compressed public key
pub fn verify_digest(digest: &[u8; 32], signature_hex: &str, pub_key_hex: &str) -> Result<bool> {
    let secp = Secp256k1::new();
    let msg = Message::from_digest_slice(digest)
        .map_err(|e| SimError::Signature(format!("Invalid message hash: {}", e)))?;

    let sig_bytes = hex::decode(signature_hex)
        .map_err(|e| SimError::Signature(format!("Invalid signature hex: {}", e)))?;
    let signature = Signature::from_compact(&sig_bytes)
        .map_err(|e| SimError::Signature(format!("Invalid compact signature: {}", e)))?;

    let pub_key_bytes = hex::decode(pub_key_hex)
        .map_err(|e| SimError::Signature(format!("Invalid public key hex: {}", e)))?;
    let pub_key = PublicKey::from_slice(&pub_key_bytes)
        .map_err(|e| SimError::Signature(format!("Invalid public key: {}", e)))?;

    Ok(secp.verify_ecdsa(&msg, &signature, &pub_key).is_ok())
}

/// Hex of the compressed public key for a secret key
pub fn public_key_hex(private_key: &SecretKey) -> String {
    let secp = Secp256k1::new();
    hex::encode(PublicKey::from_secret_key(&secp, private_key).serialize())
}

/// Key hash: SHA-256 of the compressed public key bytes, truncated to 28 bytes, hex encoded
pub fn key_hash(pub_key_hex: &str) -> Result<String> {
    let bytes = hex::decode(pub_key_hex)
        .map_err(|e| SimError::Signature(format!("Invalid public key hex: {}", e)))?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(&digest[..28]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    #[test]
    fn test_hash_message_deterministic() {
        let message = serde_json::json!({"test": "data"});
        assert_eq!(hash_message(&message).unwrap(), hash_message(&message).unwrap());
        let other = serde_json::json!({"test": "other"});
        assert_ne!(hash_message(&message).unwrap(), hash_message(&other).unwrap());
    }

    #[test]
    fn test_sign_and_verify() {
        let sk = secret(2);
        let digest = hash_message(&"payload").unwrap();
        let sig = sign_digest(&sk, &digest).unwrap();
        assert_eq!(sig.len(), 128);
        assert!(verify_digest(&digest, &sig, &public_key_hex(&sk)).unwrap());
    }

    #[test]
    fn test_verify_wrong_key() {
        let digest = hash_message(&"payload").unwrap();
        let sig = sign_digest(&secret(2), &digest).unwrap();
        assert!(!verify_digest(&digest, &sig, &public_key_hex(&secret(3))).unwrap());
    }

    #[test]
    fn test_verify_malformed_signature() {
        let digest = hash_message(&"payload").unwrap();
        assert!(verify_digest(&digest, "zz", &public_key_hex(&secret(2))).is_err());
    }

    #[test]
    fn test_key_hash_length() {
        let hash = key_hash(&public_key_hex(&secret(5))).unwrap();
        assert_eq!(hash.len(), 56);
    }
}
