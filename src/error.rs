use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("BIP39 error: {0}")]
    Bip39(String),

    #[error("BIP32 error: {0}")]
    Bip32(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl From<bip39::Error> for SimError {
    fn from(err: bip39::Error) -> Self {
        SimError::Bip39(err.to_string())
    }
}

impl From<secp256k1::Error> for SimError {
    fn from(err: secp256k1::Error) -> Self {
        SimError::Crypto(err.to_string())
    }
}

impl From<bip32::Error> for SimError {
    fn from(err: bip32::Error) -> Self {
        SimError::Bip32(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Config(err.to_string())
    }
}
