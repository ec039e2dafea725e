use core::cell::RefCell;

use critical_section::Mutex;

use crate::state::{ChannelTarget, ConfigSnapshot};

pub const CHANNEL_COUNT: usize = 2;
pub const PHASE_COUNT: u8 = 4;

/// Sink for the quadrature lines, typically one GPIO port.
pub trait QuadratureOutput {
    /// Drives the lines selected by `mask` to the bits of `levels`, leaving
    /// every other line of the port untouched.
    fn write_masked(&mut self, mask: u16, levels: u16);
}

// ── Pin map / truth table ─────────────────────────────────────────────────────

/// Port bit numbers of one sensor's A and B lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPins {
    pub a: u8,
    pub b: u8,
}

impl ChannelPins {
    pub const fn new(a: u8, b: u8) -> Self {
        Self { a, b }
    }

    pub const fn mask(&self) -> u16 {
        (1 << self.a) | (1 << self.b)
    }

    /// Line levels for phases 0..3: none, A, A+B, B.
    pub const fn truth_table(&self) -> [u16; PHASE_COUNT as usize] {
        [0, 1 << self.a, (1 << self.a) | (1 << self.b), 1 << self.b]
    }
}

#[derive(Clone, Copy, Debug)]
struct ChannelOutput {
    mask: u16,
    table: [u16; PHASE_COUNT as usize],
}

impl ChannelOutput {
    const fn new(pins: ChannelPins) -> Self {
        Self { mask: pins.mask(), table: pins.truth_table() }
    }
}

// ── Phase state ───────────────────────────────────────────────────────────────

/// Tick counter and quadrature position of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseState {
    cycle_count: u32,
    /// Last applied `period_ticks`, 0 = stopped.
    max_cycle_count: u32,
    phase_index: u8,
    reverse: bool,
}

impl PhaseState {
    pub const fn new() -> Self {
        Self { cycle_count: 1, max_cycle_count: 0, phase_index: 0, reverse: false }
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn max_cycle_count(&self) -> u32 {
        self.max_cycle_count
    }

    pub fn phase_index(&self) -> u8 {
        self.phase_index
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Counts one tick. Returns the new phase when a half step is due.
    /// Phase 0 is the power-on level, so the first half step emits phase 1
    /// (phase 3 in reverse) and never re-emits phase 0.
    pub fn tick(&mut self) -> Option<u8> {
        if self.max_cycle_count == 0 {
            return None;
        }
        // cycle_count <= max_cycle_count is kept by `retarget`
        if self.cycle_count >= self.max_cycle_count {
            self.cycle_count = 1;
            self.phase_index = if self.reverse {
                (self.phase_index + PHASE_COUNT - 1) % PHASE_COUNT
            } else {
                (self.phase_index + 1) % PHASE_COUNT
            };
            Some(self.phase_index)
        } else {
            self.cycle_count += 1;
            None
        }
    }

    /// Takes a new target without losing the current phase. A shorter period
    /// pulls the counter down so the pending half step fires on the next tick
    /// instead of waiting out the old period.
    pub fn retarget(&mut self, target: ChannelTarget) {
        self.reverse = target.reverse;
        if target.period_ticks != self.max_cycle_count {
            if target.period_ticks != 0 && target.period_ticks < self.cycle_count {
                self.cycle_count = target.period_ticks;
            }
            self.max_cycle_count = target.period_ticks;
        }
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Quadrature generator for both sensors. `on_tick` runs in the tick
/// interrupt, `apply` in the snapshot consumer; both go through the same
/// critical section.
pub struct PulseEngine {
    phases: Mutex<RefCell<[PhaseState; CHANNEL_COUNT]>>,
    outputs: [ChannelOutput; CHANNEL_COUNT],
}

impl PulseEngine {
    pub const fn new(pins: [ChannelPins; CHANNEL_COUNT]) -> Self {
        Self {
            phases: Mutex::new(RefCell::new([PhaseState::new(), PhaseState::new()])),
            outputs: [ChannelOutput::new(pins[0]), ChannelOutput::new(pins[1])],
        }
    }

    /// Replaces both channel targets, one short critical section per channel.
    pub fn apply(&self, snapshot: ConfigSnapshot) {
        for (index, target) in snapshot.channels().into_iter().enumerate() {
            critical_section::with(|cs| {
                self.phases.borrow_ref_mut(cs)[index].retarget(target);
            });
        }
    }

    /// One tick of the timebase. Never blocks.
    pub fn on_tick<O: QuadratureOutput>(&self, output: &mut O) {
        critical_section::with(|cs| {
            let mut phases = self.phases.borrow_ref_mut(cs);
            for (state, channel) in phases.iter_mut().zip(self.outputs.iter()) {
                if let Some(phase) = state.tick() {
                    output.write_masked(channel.mask, channel.table[phase as usize]);
                }
            }
        });
    }

    pub fn phase_states(&self) -> [PhaseState; CHANNEL_COUNT] {
        critical_section::with(|cs| *self.phases.borrow_ref(cs))
    }
}
