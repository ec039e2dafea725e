use core::hint::spin_loop;
use core::sync::atomic::{AtomicU8, Ordering};

/// Period of the gate interrupt.
pub const GATE_PERIOD_MS: u32 = 100;
/// Slots used by the firmware; slot 0 paces the sequencer.
pub const SLOT_COUNT: usize = 1;

const INITIAL_LED_REPEAT: u8 = 10;

/// Heartbeat period (in gate ticks) per frequency band. Bands are checked in
/// order with `frequency < bound`; anything above the last bound uses
/// `FASTEST_LED_REPEAT`.
const HEARTBEAT_STEPS: [(f32, u8); 13] = [
    (0.5, 20),
    (2.0, 15),
    (3.0, 16),
    (15.0, 14),
    (22.0, 12),
    (40.0, 10),
    (200.0, 9),
    (400.0, 8),
    (600.0, 7),
    (1000.0, 6),
    (1200.0, 5),
    (1750.0, 4),
    (2000.0, 3),
];
const FASTEST_LED_REPEAT: u8 = 2;

pub fn repeat_count(frequency: f32) -> u8 {
    HEARTBEAT_STEPS
        .iter()
        .find(|(bound, _)| frequency < *bound)
        .map_or(FASTEST_LED_REPEAT, |(_, repeat)| *repeat)
}

/// Countdown slots decremented by a periodic interrupt, plus the heartbeat
/// LED driven from the same interrupt.
///
/// A slot is armed with a count of gate periods and its owner spins until
/// the interrupt has counted it down to zero.
pub struct SyncGate<const SLOTS: usize = SLOT_COUNT> {
    slots: [AtomicU8; SLOTS],
    led_repeat: AtomicU8,
    led_count: AtomicU8,
}

impl<const SLOTS: usize> SyncGate<SLOTS> {
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU8::new(0) }; SLOTS],
            led_repeat: AtomicU8::new(INITIAL_LED_REPEAT),
            led_count: AtomicU8::new(0),
        }
    }

    pub fn arm(&self, slot: usize, count: u8) {
        self.slots[slot].store(count, Ordering::Release);
    }

    pub fn remaining(&self, slot: usize) -> u8 {
        self.slots[slot].load(Ordering::Acquire)
    }

    /// Busy-waits until the interrupt has counted `slot` down to zero.
    pub fn wait(&self, slot: usize) {
        while self.remaining(slot) != 0 {
            spin_loop();
        }
    }

    pub fn arm_and_wait(&self, slot: usize, count: u8) {
        self.arm(slot, count);
        self.wait(slot);
    }

    /// Retunes the heartbeat from the fastest emitted frequency.
    pub fn set_heartbeat_frequency(&self, frequency: f32) {
        self.led_repeat.store(repeat_count(frequency), Ordering::Relaxed);
    }

    pub fn heartbeat_repeat(&self) -> u8 {
        self.led_repeat.load(Ordering::Relaxed)
    }

    /// Interrupt body. Decrements every armed slot and returns the new LED
    /// level when it changes.
    pub fn on_tick(&self) -> Option<bool> {
        for slot in &self.slots {
            let _ = slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
        }

        let count = self.led_count.load(Ordering::Relaxed);
        let level = match count {
            0 => Some(true),
            1 => Some(false),
            _ => None,
        };
        let next = count.wrapping_add(1);
        let next = if next >= self.led_repeat.load(Ordering::Relaxed) { 0 } else { next };
        self.led_count.store(next, Ordering::Relaxed);
        level
    }

    /// Handle for one slot, so a single owner paces on it.
    pub fn slot(&self, slot: usize) -> GateSlot<'_, SLOTS> {
        assert!(slot < SLOTS);
        GateSlot { gate: self, slot }
    }
}

impl<const SLOTS: usize> Default for SyncGate<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GateSlot<'a, const SLOTS: usize> {
    gate: &'a SyncGate<SLOTS>,
    slot: usize,
}

impl<const SLOTS: usize> GateSlot<'_, SLOTS> {
    pub fn wait_ticks(&self, count: u8) {
        self.gate.arm_and_wait(self.slot, count);
    }

    pub fn gate(&self) -> &SyncGate<SLOTS> {
        self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn heartbeat_breakpoints() {
        assert_eq!(repeat_count(0.0), 20);
        assert_eq!(repeat_count(0.49), 20);
        assert_eq!(repeat_count(0.5), 15);
        assert_eq!(repeat_count(1.0), 15);
        assert_eq!(repeat_count(2.0), 16);
        assert_eq!(repeat_count(3.0), 14);
        assert_eq!(repeat_count(15.0), 12);
        assert_eq!(repeat_count(22.0), 10);
        assert_eq!(repeat_count(40.0), 9);
        assert_eq!(repeat_count(199.9), 9);
        assert_eq!(repeat_count(200.0), 8);
        assert_eq!(repeat_count(400.0), 7);
        assert_eq!(repeat_count(600.0), 6);
        assert_eq!(repeat_count(1000.0), 5);
        assert_eq!(repeat_count(1200.0), 4);
        assert_eq!(repeat_count(1750.0), 3);
        assert_eq!(repeat_count(1999.9), 3);
        assert_eq!(repeat_count(2000.0), 2);
        assert_eq!(repeat_count(2000.5), 2);
        assert_eq!(repeat_count(7300.0), 2);
    }

    #[test]
    fn slots_floor_at_zero() {
        let gate: SyncGate<2> = SyncGate::new();
        gate.arm(0, 2);
        gate.on_tick();
        assert_eq!(gate.remaining(0), 1);
        assert_eq!(gate.remaining(1), 0);
        gate.on_tick();
        gate.on_tick();
        assert_eq!(gate.remaining(0), 0);
        assert_eq!(gate.remaining(1), 0);
    }

    #[test]
    fn led_blinks_at_repeat_rate() {
        let gate: SyncGate = SyncGate::new();
        gate.set_heartbeat_frequency(2500.0);
        assert_eq!(gate.heartbeat_repeat(), 2);
        let levels: Vec<_> = (0..6).map(|_| gate.on_tick()).collect();
        assert_eq!(levels, vec![Some(true), Some(false), Some(true), Some(false), Some(true), Some(false)]);

        gate.set_heartbeat_frequency(10.0);
        let levels: Vec<_> = (0..14).map(|_| gate.on_tick()).collect();
        assert_eq!(levels[0], Some(true));
        assert_eq!(levels[1], Some(false));
        assert!(levels[2..].iter().all(Option::is_none));
        assert_eq!(gate.on_tick(), Some(true));
    }

    #[test]
    fn wait_returns_after_interrupt_counts_down() {
        let gate: Arc<SyncGate> = Arc::new(SyncGate::new());
        let done = Arc::new(AtomicBool::new(false));
        let ticker = {
            let gate = gate.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut ticks = 0u32;
                while !done.load(Ordering::Relaxed) {
                    gate.on_tick();
                    ticks += 1;
                    thread::sleep(Duration::from_millis(1));
                }
                ticks
            })
        };

        gate.slot(0).wait_ticks(3);
        assert_eq!(gate.remaining(0), 0);
        done.store(true, Ordering::Relaxed);
        assert!(ticker.join().unwrap() >= 3);
    }
}
