use bip39::{Language, Mnemonic};
use crate::error::Result;

/// Builds the 24-word BIP39 phrase for 32 bytes of entropy. Same entropy, same phrase.
pub fn mnemonic_from_entropy(entropy: &[u8; 32]) -> Result<String> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)?;
    Ok(mnemonic.to_string())
}

/// Validates a BIP39 mnemonic phrase
pub fn validate_mnemonic(mnemonic: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, mnemonic).is_ok()
}

/// Master seed for a phrase (empty passphrase)
pub fn master_seed(mnemonic: &str) -> Result<[u8; 64]> {
    let parsed = Mnemonic::parse_in_normalized(Language::English, mnemonic)?;
    Ok(parsed.to_seed(""))
}
