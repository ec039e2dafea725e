/// Shared state types passed between the control context and the pulse context.
///
/// All types are `Copy` so they cross the snapshot channel by value.
use crate::drivers::float_eq::FloatEq;
use crate::drivers::units::UnitConverter;

// ── Pulse targets ─────────────────────────────────────────────────────────────

/// Half-step duration and direction commanded to one sensor channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelTarget {
    /// Ticks per quadrature half step, 0 = stopped.
    pub period_ticks: u32,
    pub reverse: bool,
}

impl ChannelTarget {
    pub const STOPPED: Self = Self { period_ticks: 0, reverse: false };
}

/// Both channel targets taken at the same instant of the sequencer timeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigSnapshot {
    pub channel1: ChannelTarget,
    pub channel2: ChannelTarget,
}

impl ConfigSnapshot {
    pub const STOPPED: Self = Self {
        channel1: ChannelTarget::STOPPED,
        channel2: ChannelTarget::STOPPED,
    };

    pub fn channels(&self) -> [ChannelTarget; 2] {
        [self.channel1, self.channel2]
    }

    /// True when both channels emit the same waveform.
    pub fn channels_equal(&self) -> bool {
        self.channel1 == self.channel2
    }
}

// ── Sequence endpoints ────────────────────────────────────────────────────────

/// One endpoint of a ramp, in engineering units (km/h or Hz).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceValues {
    pub first_value: f32,
    pub second_value: f32,
    pub first_reverse: bool,
    pub second_reverse: bool,
    /// Ramp duration in seconds to reach these values.
    pub delay_s: u16,
}

impl SequenceValues {
    pub const ZERO: Self = Self {
        first_value: 0.0,
        second_value: 0.0,
        first_reverse: false,
        second_reverse: false,
        delay_s: 0,
    };

    /// Both sensors run at the same value in the same direction.
    pub fn sensors_equal(&self, float_eq: &FloatEq) -> bool {
        self.first_reverse == self.second_reverse
            && float_eq.equal(self.first_value, self.second_value)
    }

    pub fn direction(&self) -> Direction {
        Direction::from_flags(self.first_reverse, self.second_reverse)
    }

    pub fn set_direction(&mut self, direction: Direction) {
        let (first, second) = direction.flags();
        self.first_reverse = first;
        self.second_reverse = second;
    }
}

/// Direction pair of the two sensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Forward,
    Reverse,
    /// Second sensor reversed only.
    SecondReversed,
    /// First sensor reversed only.
    FirstReversed,
}

impl Direction {
    pub fn from_flags(first_reverse: bool, second_reverse: bool) -> Self {
        match (first_reverse, second_reverse) {
            (false, false) => Self::Forward,
            (true, true) => Self::Reverse,
            (false, true) => Self::SecondReversed,
            (true, false) => Self::FirstReversed,
        }
    }

    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::Forward => (false, false),
            Self::Reverse => (true, true),
            Self::SecondReversed => (false, true),
            Self::FirstReversed => (true, false),
        }
    }

    /// Parses the direction token typed after the values.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "+" | "++" => Some(Self::Forward),
            "-" | "--" => Some(Self::Reverse),
            "+-" => Some(Self::SecondReversed),
            "-+" => Some(Self::FirstReversed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "+",
            Self::Reverse => "-",
            Self::SecondReversed => "+-",
            Self::FirstReversed => "-+",
        }
    }
}

// ── Speed conversion ──────────────────────────────────────────────────────────

pub const MIN_N_TEETH: u16 = 13;
pub const MAX_N_TEETH: u16 = 1908;
pub const MIN_DIA_MM: u16 = 300;
pub const MAX_DIA_MM: u16 = 1500;
pub const MIN_RATIO: f32 = 0.001;
pub const MAX_RATIO: f32 = 4.0;

/// Toothed wheel seen by the sensor. `NONE` means values are frequencies.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpeedDefinition {
    pub n_teeth: u16,
    pub diameter_mm: u16,
    pub gear_ratio: f32,
}

impl SpeedDefinition {
    pub const NONE: Self = Self { n_teeth: 0, diameter_mm: 0, gear_ratio: 1.0 };

    pub fn is_speed(&self) -> bool {
        self.n_teeth != 0 && self.diameter_mm != 0
    }

    /// Checks a non-trivial definition against the wheel limits.
    pub fn in_range(&self) -> bool {
        (MIN_N_TEETH..=MAX_N_TEETH).contains(&self.n_teeth)
            && (MIN_DIA_MM..=MAX_DIA_MM).contains(&self.diameter_mm)
            && (MIN_RATIO..=MAX_RATIO).contains(&self.gear_ratio)
    }
}

impl Default for SpeedDefinition {
    fn default() -> Self {
        Self::NONE
    }
}

// ── Runtime settings ──────────────────────────────────────────────────────────

/// Settings changed by console commands, owned by the controller.
#[derive(Clone, Copy, Debug, Default)]
pub struct Settings {
    pub speed: SpeedDefinition,
    pub float_eq: FloatEq,
}

impl Settings {
    pub fn units(&self) -> UnitConverter {
        UnitConverter::new(self.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_flags_roundtrip_through_tokens() {
        for token in ["+", "-", "+-", "-+"] {
            let direction = Direction::parse(token).unwrap();
            let (first, second) = direction.flags();
            assert_eq!(Direction::from_flags(first, second), direction);
            assert_eq!(direction.as_str(), token);
        }
        assert_eq!(Direction::parse("++"), Some(Direction::Forward));
        assert_eq!(Direction::parse("--"), Some(Direction::Reverse));
        assert_eq!(Direction::parse("+++"), None);
    }

    #[test]
    fn sensors_equal_needs_same_direction() {
        let eq = FloatEq::default();
        let mut values = SequenceValues { first_value: 12.5, second_value: 12.5, ..SequenceValues::ZERO };
        assert!(values.sensors_equal(&eq));
        values.second_reverse = true;
        assert!(!values.sensors_equal(&eq));
        values.second_reverse = false;
        values.second_value = 12.6;
        assert!(!values.sensors_equal(&eq));
    }

    #[test]
    fn speed_definition_limits() {
        assert!(!SpeedDefinition::NONE.is_speed());
        let wheel = SpeedDefinition { n_teeth: 100, diameter_mm: 920, gear_ratio: 1.0 };
        assert!(wheel.is_speed());
        assert!(wheel.in_range());
        assert!(!SpeedDefinition { n_teeth: 12, ..wheel }.in_range());
        assert!(!SpeedDefinition { diameter_mm: 1501, ..wheel }.in_range());
        assert!(!SpeedDefinition { gear_ratio: 4.5, ..wheel }.in_range());
    }
}
