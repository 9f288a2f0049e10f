pub mod mnemonic;
pub mod key_generator;
pub mod signer;
pub mod signature;
pub mod utils;
pub mod error;
pub mod config;
pub mod logging;
pub mod core;

pub use mnemonic::{master_seed, mnemonic_from_entropy, validate_mnemonic};
pub use key_generator::{KeyGenerator, UserKeys, PAYMENT_PATH_PREFIX};
pub use signer::{key_hash_of, sign_tx, sign_tx_with_keys, verify_witnesses};
pub use signature::{hash_message, key_hash, public_key_hex, sign_digest, verify_digest};
pub use error::{SimError, Result};
pub use config::SimConfig;
pub use logging::{init_logger, LogLevel};

// Core API exports
pub use crate::core::asset::Asset;
pub use crate::core::value::Value;
pub use crate::core::address::{Address, HasAddress, PubKeyHash, ScriptHash, StakeCredential};
pub use crate::core::script::{Data, Datum, DatumHash, Redeemer, Script, ScriptContext, ScriptPurpose, Validator};
pub use crate::core::slot::{PosixTime, Slot, SlotConfig, SlotRange, TimeRange};
pub use crate::core::utxo::{OutputRef, TxId, TxOut, UtxoStore, UtxoError};
pub use crate::core::selection::{select_coins, InsufficientFunds, UserSpend};
pub use crate::core::tx::{
    Certificate,
    Mint,
    Tx,
    TxInputKind,
    Withdrawal,
    Witness,
    add_signatory,
    delegate_stake,
    deregister_stake,
    mint_value,
    pay_fee,
    pay_to_address,
    pay_to_script,
    register_stake,
    spend_pub_key,
    spend_script,
    user_spend,
    valid_in_slots,
    withdraw_stake,
};
pub use crate::core::staking::{PoolId, StakeAccount, StakeState};
pub use crate::core::ledger::{BasicLedger, LedgerFailure, LedgerParams, LedgerRules, LedgerState, TxRecord};
pub use crate::core::log::{EventLog, FailReason, LogEntry};
pub use crate::core::report::{NameTable, Report};
pub use crate::core::simulation::{
    SimSnapshot,
    Simulation,
    TxBox,
    User,
    DEFAULT_FAILURE_MESSAGE,
    DEFAULT_FAILURE_NAME,
    genesis_ref,
};
pub use crate::core::balance::{gives, owns, BalanceDiff};
