//! Slot clock: mapping between POSIX milliseconds and discrete slots, and validity intervals over slots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete simulated time unit.
pub type Slot = u64;

/// POSIX time in milliseconds.
pub type PosixTime = u64;

/// Slot configuration. `slot_length` is in milliseconds and must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotConfig {
    pub zero_time: PosixTime,
    pub slot_length: u64,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            zero_time: 0,
            slot_length: 1000,
        }
    }
}

impl SlotConfig {
    fn length(&self) -> u64 {
        self.slot_length.max(1)
    }

    /// Slot enclosing `time`; times before `zero_time` map to slot 0.
    pub fn time_to_slot(&self, time: PosixTime) -> Slot {
        time.saturating_sub(self.zero_time) / self.length()
    }

    pub fn slot_to_begin_time(&self, slot: Slot) -> PosixTime {
        self.zero_time.saturating_add(slot.saturating_mul(self.length()))
    }

    /// Last millisecond that still belongs to `slot`.
    pub fn slot_to_end_time(&self, slot: Slot) -> PosixTime {
        self.slot_to_begin_time(slot).saturating_add(self.length() - 1)
    }

    /// Number of whole slots in a duration.
    pub fn duration_to_slots(&self, duration_ms: u64) -> u64 {
        duration_ms / self.length()
    }

    pub fn to_slot_range(&self, range: &TimeRange) -> SlotRange {
        SlotRange {
            from: range.from.map(|t| self.time_to_slot(t)),
            to: range.to.map(|t| self.time_to_slot(t)),
        }
    }
}

/// Closed time interval in milliseconds; `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<PosixTime>,
    pub to: Option<PosixTime>,
}

impl TimeRange {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn interval(from: PosixTime, to: PosixTime) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn starting_at(from: PosixTime) -> Self {
        Self { from: Some(from), to: None }
    }

    pub fn until(to: PosixTime) -> Self {
        Self { from: None, to: Some(to) }
    }
}

/// Closed slot interval; `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotRange {
    pub from: Option<Slot>,
    pub to: Option<Slot>,
}

impl SlotRange {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn interval(from: Slot, to: Slot) -> Self {
        Self { from: Some(from), to: Some(to) }
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.from.map_or(true, |f| f <= slot) && self.to.map_or(true, |t| slot <= t)
    }

    /// Intersection; associative and commutative with `always()` as identity.
    pub fn intersect(&self, other: &SlotRange) -> SlotRange {
        let from = match (self.from, other.from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let to = match (self.to, other.to) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        SlotRange { from, to }
    }

    pub fn is_always(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = self.from.map_or("-inf".to_string(), |s| s.to_string());
        let to = self.to.map_or("+inf".to_string(), |s| s.to_string());
        write!(f, "[{}, {}]", from, to)
    }
}
