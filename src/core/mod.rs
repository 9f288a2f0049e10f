// Core simulation engine
//
// DETERMINISM GUARANTEES:
// =======================
// 1. Same sequence of simulation calls → same ledger state and event log
// 2. No randomness: user keys come from the configured seed, selection walks outputs in reference order
// 3. No system time: the slot clock moves only on explicit waits
// 4. Deterministic hashing: transaction ids hash a canonical body built from ordered collections
//
// INVARIANTS:
// - A failed submission never changes the ledger state
// - Output references are unique and never reused once consumed
// - Expected failures are log entries, not panics

pub mod asset;
pub mod value;
pub mod address;
pub mod script;
pub mod slot;
pub mod utxo;
pub mod selection;
pub mod tx;
pub mod staking;
pub mod ledger;
pub mod log;
pub mod report;
pub mod simulation;
pub mod balance;
