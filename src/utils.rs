use sha2::Sha256;
use hkdf::Hkdf;
use crate::error::{SimError, Result};

/// Default HKDF salt for staking key derivation
pub const HKDF_SALT: &[u8] = b"LedgerSimStakingKeySalt";
/// Default HKDF info prefix for staking key derivation
pub const HKDF_INFO: &[u8] = b"Staking Key Derivation";

/// Derives a 32-byte staking seed for one user index from the master seed using HKDF
pub fn derive_staking_seed(master_seed: &[u8], index: u32) -> Result<[u8; 32]> {
    if master_seed.is_empty() {
        return Err(SimError::Validation("masterSeed must be non-empty".to_string()));
    }

    let mut info = HKDF_INFO.to_vec();
    info.extend_from_slice(&index.to_be_bytes());

    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), master_seed);
    let mut okm = [0u8; 32];
    hk.expand(&info, &mut okm)
        .map_err(|e| SimError::KeyDerivation(format!("HKDF expansion failed: {}", e)))?;

    Ok(okm)
}

/// Parses a 64-character hex string into 32 bytes
pub fn hex_to_32(value: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(value)
        .map_err(|e| SimError::Validation(format!("Invalid hex: {}", e)))?;
    bytes.try_into()
        .map_err(|_| SimError::Validation("Expected 32 bytes of hex".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_staking_seed() {
        let seed = [7u8; 64];
        let a = derive_staking_seed(&seed, 0).unwrap();
        let b = derive_staking_seed(&seed, 0).unwrap();
        let c = derive_staking_seed(&seed, 1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_derive_staking_seed_empty() {
        assert!(derive_staking_seed(&[], 0).is_err());
    }

    #[test]
    fn test_hex_to_32() {
        assert_eq!(hex_to_32(&"ab".repeat(32)).unwrap(), [0xab; 32]);
        assert!(hex_to_32("abcd").is_err());
        assert!(hex_to_32("not hex").is_err());
    }
}
