use bip32::{DerivationPath, XPrv};
use secp256k1::SecretKey;
use crate::core::address::{PubKeyHash, StakeCredential};
use crate::error::{SimError, Result};
use crate::mnemonic::{master_seed, mnemonic_from_entropy, validate_mnemonic};
use crate::signature::{key_hash, public_key_hex};
use crate::utils::derive_staking_seed;

/// BIP44 payment path; the last component is the user index.
pub const PAYMENT_PATH_PREFIX: &str = "m/44'/1815'/0'/0";

/// Signing material of one simulated user.
#[derive(Debug, Clone)]
pub struct UserKeys {
    pub index: u32,
    pub derivation_path: String,
    pub payment_key: SecretKey,
    pub payment_pub_key: String,
    pub staking_key: SecretKey,
    pub staking_pub_key: String,
    pub pub_key_hash: PubKeyHash,
    pub stake_credential: StakeCredential,
}

/// Deterministic user key derivation from a single seed phrase (BIP32 + HKDF)
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    mnemonic: String,
    master_seed: [u8; 64],
}

impl KeyGenerator {
    /// Creates a generator from 32 bytes of entropy
    pub fn from_entropy(entropy: &[u8; 32]) -> Result<Self> {
        let mnemonic = mnemonic_from_entropy(entropy)?;
        Self::from_mnemonic(&mnemonic)
    }

    /// Creates a generator from an existing BIP39 phrase
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self> {
        if !validate_mnemonic(mnemonic) {
            return Err(SimError::Validation(
                "Provided mnemonic is not valid according to BIP39".to_string(),
            ));
        }
        Ok(Self {
            mnemonic: mnemonic.to_string(),
            master_seed: master_seed(mnemonic)?,
        })
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Derives the keys for user `index`. Same seed and index, same keys.
    pub fn derive(&self, index: u32) -> Result<UserKeys> {
        const MAX_INDEX: u32 = 2u32.pow(31) - 1;
        if index >= MAX_INDEX {
            return Err(SimError::Validation(
                format!("user index must be in range [0, {}]", MAX_INDEX - 1),
            ));
        }

        let root_xprv = XPrv::new(&self.master_seed)?;
        let path = format!("{}/{}", PAYMENT_PATH_PREFIX, index);
        let derivation_path: DerivationPath = path.parse()
            .map_err(|e| SimError::Bip32(format!("Invalid derivation path: {}", e)))?;

        let node = derivation_path.iter().fold(Ok(root_xprv), |acc, child_num| {
            acc?.derive_child(child_num)
        })?;
        let payment_key = SecretKey::from_slice(&node.private_key().to_bytes())
            .map_err(|e| SimError::Crypto(format!("Invalid private key: {}", e)))?;

        let staking_seed = derive_staking_seed(&self.master_seed, index)?;
        let staking_key = SecretKey::from_slice(&staking_seed)
            .map_err(|e| SimError::Crypto(format!("Invalid staking key: {}", e)))?;

        let payment_pub_key = public_key_hex(&payment_key);
        let staking_pub_key = public_key_hex(&staking_key);
        let pub_key_hash = PubKeyHash::new(key_hash(&payment_pub_key)?);
        let stake_credential = StakeCredential::new(PubKeyHash::new(key_hash(&staking_pub_key)?));

        Ok(UserKeys {
            index,
            derivation_path: path,
            payment_key,
            payment_pub_key,
            staking_key,
            staking_pub_key,
            pub_key_hash,
            stake_credential,
        })
    }
}
