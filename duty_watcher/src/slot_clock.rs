//! Derives the current slot/epoch from an immutable genesis time and the system wall clock. No
//! monotonic offset is maintained: NTP skew at the scale of seconds is acceptable because duty
//! granularity is 12 second slots.

use crate::types::{Epoch, Slot, SECONDS_PER_SLOT};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy)]
pub struct SlotClock {
    genesis: Duration,
    slot_duration: Duration,
}

impl SlotClock {
    pub fn new(genesis_time: u64) -> Self {
        Self {
            genesis: Duration::from_secs(genesis_time),
            slot_duration: Duration::from_secs(SECONDS_PER_SLOT),
        }
    }

    fn now_since_genesis(&self) -> Option<Duration> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        now.checked_sub(self.genesis)
    }

    /// `floor((now - genesis) / slot_duration)`. `None` before genesis.
    pub fn now(&self) -> Option<Slot> {
        let elapsed = self.now_since_genesis()?;
        Some(Slot(elapsed.as_secs() / self.slot_duration.as_secs()))
    }

    /// `floor((now - genesis) / (slot_duration * slots_per_epoch))`. `None` before genesis.
    pub fn current_epoch(&self) -> Option<Epoch> {
        self.now().map(|slot| slot.epoch())
    }

    /// Unix timestamp (seconds) at the start of `slot`.
    pub fn start_of(&self, slot: Slot) -> u64 {
        self.genesis.as_secs() + slot.as_u64() * self.slot_duration.as_secs()
    }

    /// Seconds from now until the start of `slot`. Negative once the slot is in the past.
    pub fn seconds_to_slot(&self, slot: Slot) -> i64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.start_of(slot) as i64 - now
    }

    pub fn seconds_to_epoch(&self, epoch: Epoch) -> i64 {
        self.seconds_to_slot(epoch.start_slot())
    }
}
