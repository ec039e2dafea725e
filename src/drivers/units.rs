use core::f32::consts::PI;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::state::SpeedDefinition;

// ── Tick base ─────────────────────────────────────────────────────────────────

/// Pulse engine tick rate.
pub const TICK_HZ: f32 = 1_000_000.0;
/// A full quadrature cycle is 4 half steps.
pub const HALF_STEPS_PER_CYCLE: f32 = 4.0;
/// `period_ticks * frequency` for any emitted frequency.
pub const TICKS_PER_HZ: f32 = TICK_HZ / HALF_STEPS_PER_CYCLE;

pub const MIN_FREQUENCY: f32 = 0.1;
pub const MAX_FREQUENCY: f32 = 7300.0;

/// km/h → m/s
const KMH_PER_MS: f32 = 3.6;

/// Conversions between engineering values (km/h or Hz), signal frequency
/// and pulse engine half-step periods.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitConverter {
    definition: SpeedDefinition,
}

impl UnitConverter {
    pub fn new(definition: SpeedDefinition) -> Self {
        Self { definition }
    }

    pub fn definition(&self) -> &SpeedDefinition {
        &self.definition
    }

    /// Values are speeds in km/h rather than frequencies in Hz.
    pub fn is_speed_mode(&self) -> bool {
        self.definition.is_speed()
    }

    /// Sensor frequency for a value; the sign (direction) is dropped.
    pub fn frequency_of(&self, value: f32) -> f32 {
        let value = value.abs();
        if !self.is_speed_mode() {
            return value;
        }
        value * self.teeth_per_metre_kmh()
    }

    /// Half-step period in ticks, 0 for a stopped channel. Non-zero
    /// frequencies are clamped to `[MIN_FREQUENCY, MAX_FREQUENCY]`.
    pub fn period_ticks_of(frequency: f32) -> u32 {
        if frequency == 0.0 {
            return 0;
        }
        let frequency = frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY);
        (TICKS_PER_HZ / frequency).round() as u32
    }

    /// Value actually emitted for a period: speed in speed mode, else frequency.
    pub fn value_of(&self, period_ticks: u32) -> f32 {
        if period_ticks == 0 {
            return 0.0;
        }
        let frequency = TICKS_PER_HZ / period_ticks as f32;
        if !self.is_speed_mode() {
            return frequency;
        }
        frequency / self.teeth_per_metre_kmh()
    }

    /// Hz per km/h for the configured wheel.
    fn teeth_per_metre_kmh(&self) -> f32 {
        let d = &self.definition;
        d.gear_ratio * d.n_teeth as f32 / (PI * KMH_PER_MS / 1000.0 * d.diameter_mm as f32)
    }
}
