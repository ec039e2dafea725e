//! Linear ramps between two channel pairs, paced by the sync gate.

use crate::console::StatusConsole;
use crate::display::{write_status, Channels};
use crate::drivers::sync_gate::GateSlot;
use crate::drivers::units::UnitConverter;
use crate::link::ConfigChannel;
use crate::state::{ChannelTarget, ConfigSnapshot, SequenceValues, Settings};

/// Ramp updates per second.
pub const STEPS_PER_SECOND: u32 = 5;
/// Gate periods per ramp step (2 × 100 ms).
pub const GATE_TICKS_PER_STEP: u8 = 2;
/// Gate periods waited to line a new sequence up with the gate.
pub const RESYNC_TICKS: u8 = 1;

/// The user cancelled the sequence. The last sent snapshot stays in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Interrupted;

/// Where snapshots go: the channel to the pulse context on the board.
pub trait SnapshotSink {
    fn send(&mut self, snapshot: ConfigSnapshot);
}

impl<const N: usize> SnapshotSink for &ConfigChannel<N> {
    fn send(&mut self, snapshot: ConfigSnapshot) {
        ConfigChannel::send(self, snapshot);
    }
}

/// Step timing and the heartbeat that follows the emitted frequency.
pub trait StepPacer {
    /// Blocks for `count` gate periods.
    fn wait_ticks(&mut self, count: u8);

    fn set_heartbeat_frequency(&mut self, _frequency: f32) {}
}

impl<const SLOTS: usize> StepPacer for GateSlot<'_, SLOTS> {
    fn wait_ticks(&mut self, count: u8) {
        GateSlot::wait_ticks(self, count);
    }

    fn set_heartbeat_frequency(&mut self, frequency: f32) {
        self.gate().set_heartbeat_frequency(frequency);
    }
}

pub struct Sequencer<S, P> {
    sink: S,
    pacer: P,
    current: SequenceValues,
    last_sent: ConfigSnapshot,
}

impl<S: SnapshotSink, P: StepPacer> Sequencer<S, P> {
    pub fn new(sink: S, pacer: P) -> Self {
        Self {
            sink,
            pacer,
            current: SequenceValues::ZERO,
            last_sent: ConfigSnapshot::STOPPED,
        }
    }

    /// Point of the timeline last reached.
    pub fn current(&self) -> SequenceValues {
        self.current
    }

    /// What the pulse engine was last told to emit.
    pub fn last_sent(&self) -> ConfigSnapshot {
        self.last_sent
    }

    /// Ramps from `from` to `to` over `to.delay_s` seconds, sending
    /// `STEPS_PER_SECOND` snapshots per second, then lands exactly on `to`.
    /// Directions switch to those of `to` with the final snapshot.
    ///
    /// `resync` waits one gate period first so the ramp starts on the gate
    /// grid; use it when starting a new sequence.
    pub fn run_step<C: StatusConsole>(
        &mut self,
        from: SequenceValues,
        to: SequenceValues,
        resync: bool,
        settings: &Settings,
        console: &mut C,
    ) -> Result<(), Interrupted> {
        let units = settings.units();
        let channels = if from.sensors_equal(&settings.float_eq) && to.sensors_equal(&settings.float_eq) {
            Channels::One
        } else {
            Channels::Both
        };
        debug!("ramp {} -> {} in {}s", from.first_value, to.first_value, to.delay_s);

        self.current = from;
        if resync {
            self.pacer.wait_ticks(RESYNC_TICKS);
        }

        if to.delay_s != 0 {
            let steps = STEPS_PER_SECOND * u32::from(to.delay_s);
            let first_increment = (to.first_value - from.first_value) / steps as f32;
            let second_increment = (to.second_value - from.second_value) / steps as f32;

            // the last step is the exact landing below
            for step in 0..steps - 1 {
                let shown = (step % STEPS_PER_SECOND == 0).then_some(channels);
                self.emit(&units, shown, Some(step / STEPS_PER_SECOND), console);
                if console.poll_cancel() {
                    let _ = console.write_str("\n");
                    info!("sequence interrupted at step {}", step);
                    return Err(Interrupted);
                }
                self.current.first_value += first_increment;
                self.current.second_value += second_increment;
                self.pacer.wait_ticks(GATE_TICKS_PER_STEP);
            }
        }

        self.current = to;
        let elapsed = (to.delay_s != 0).then_some(u32::from(to.delay_s));
        // no cancel check on the landing, a pending ^C is left for the caller
        self.emit(&units, Some(channels), elapsed, console);
        let _ = console.write_str("\n");
        Ok(())
    }

    /// Sends the snapshot for `current` and optionally prints it.
    fn emit<C: StatusConsole>(
        &mut self,
        units: &UnitConverter,
        shown: Option<Channels>,
        elapsed_s: Option<u32>,
        console: &mut C,
    ) {
        let first = units.frequency_of(self.current.first_value);
        let second = units.frequency_of(self.current.second_value);
        self.pacer.set_heartbeat_frequency(first.max(second));

        let snapshot = ConfigSnapshot {
            channel1: ChannelTarget {
                period_ticks: UnitConverter::period_ticks_of(first),
                reverse: self.current.first_reverse,
            },
            channel2: ChannelTarget {
                period_ticks: UnitConverter::period_ticks_of(second),
                reverse: self.current.second_reverse,
            },
        };
        self.sink.send(snapshot);
        self.last_sent = snapshot;
        trace!("sent {}", snapshot);

        if let Some(channels) = shown {
            let _ = write_status(console, &snapshot, units, channels, elapsed_s);
        }
    }
}

#[cfg(test)]
impl<S, P> Sequencer<S, P> {
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    pub(crate) fn pacer(&self) -> &P {
        &self.pacer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::drivers::sync_gate::SyncGate;
    use crate::state::SpeedDefinition;
    use core::fmt;

    impl SnapshotSink for Vec<ConfigSnapshot> {
        fn send(&mut self, snapshot: ConfigSnapshot) {
            self.push(snapshot);
        }
    }

    /// Records every wait and heartbeat change instead of blocking.
    #[derive(Default)]
    pub(crate) struct RecordingPacer {
        pub waits: Vec<u8>,
        pub heartbeat: Vec<f32>,
    }

    impl StepPacer for RecordingPacer {
        fn wait_ticks(&mut self, count: u8) {
            self.waits.push(count);
        }

        fn set_heartbeat_frequency(&mut self, frequency: f32) {
            self.heartbeat.push(frequency);
        }
    }

    /// Collects output; reports a cancel on the n-th poll.
    #[derive(Default)]
    pub(crate) struct ScriptedConsole {
        pub output: String,
        pub polls: usize,
        pub cancel_on_poll: Option<usize>,
        pub discarded: usize,
    }

    impl fmt::Write for ScriptedConsole {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.output.push_str(s);
            Ok(())
        }
    }

    impl StatusConsole for ScriptedConsole {
        fn poll_cancel(&mut self) -> bool {
            self.polls += 1;
            self.cancel_on_poll == Some(self.polls)
        }

        fn discard_input(&mut self) {
            self.discarded += 1;
        }
    }

    fn values(first: f32, second: f32, delay_s: u16) -> SequenceValues {
        SequenceValues { first_value: first, second_value: second, delay_s, ..SequenceValues::ZERO }
    }

    fn sequencer() -> Sequencer<Vec<ConfigSnapshot>, RecordingPacer> {
        Sequencer::new(Vec::new(), RecordingPacer::default())
    }

    #[test]
    fn ramp_sends_one_snapshot_per_step() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        let target = values(100.0, 100.0, 2);
        let result = seq.run_step(values(0.0, 0.0, 0), target, true, &Settings::default(), &mut console);
        assert_eq!(result, Ok(()));

        let periods: Vec<u32> = seq.sink.iter().map(|s| s.channel1.period_ticks).collect();
        assert_eq!(
            periods,
            vec![0, 25_000, 12_500, 8_333, 6_250, 5_000, 4_167, 3_571, 3_125, 2_500]
        );
        assert_eq!(seq.current(), target);
        assert_eq!(seq.last_sent(), *seq.sink.last().unwrap());
        assert_eq!(seq.pacer.waits, [vec![RESYNC_TICKS], vec![GATE_TICKS_PER_STEP; 9]].concat());
        assert_eq!(seq.pacer.heartbeat.len(), 10);
        assert_eq!(*seq.pacer.heartbeat.last().unwrap(), 100.0);
    }

    #[test]
    fn landing_is_exact_despite_rounding() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        let target = values(33.3, 0.7, 3);
        seq.run_step(values(0.1, 91.9, 0), target, false, &Settings::default(), &mut console).unwrap();
        assert_eq!(seq.current(), target);
        assert_eq!(seq.sink.len(), 15);
        let last = seq.sink.last().unwrap();
        assert_eq!(last.channel1.period_ticks, UnitConverter::period_ticks_of(33.3));
        assert_eq!(last.channel2.period_ticks, UnitConverter::period_ticks_of(0.7));
        assert_eq!(seq.pacer.waits.len(), 14);
    }

    #[test]
    fn zero_delay_jumps_to_target() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        let target = values(50.0, 50.0, 0);
        seq.run_step(SequenceValues::ZERO, target, false, &Settings::default(), &mut console).unwrap();
        assert_eq!(seq.sink.len(), 1);
        assert_eq!(seq.sink[0].channel1.period_ticks, 5_000);
        assert!(seq.pacer.waits.is_empty());
        assert_eq!(console.output, "\rActual frequency +50.00 Hz     \n");
    }

    #[test]
    fn cancel_stops_after_current_step() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole { cancel_on_poll: Some(3), ..Default::default() };
        let result = seq.run_step(SequenceValues::ZERO, values(100.0, 100.0, 2), false, &Settings::default(), &mut console);
        assert_eq!(result, Err(Interrupted));
        assert_eq!(seq.sink.len(), 3);
        assert_eq!(seq.last_sent().channel1.period_ticks, 12_500);
        assert_eq!(seq.current().first_value, 20.0);
        assert!(console.output.ends_with('\n'));
    }

    #[test]
    fn landing_leaves_cancel_for_caller() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        seq.run_step(SequenceValues::ZERO, values(10.0, 10.0, 0), false, &Settings::default(), &mut console).unwrap();
        assert_eq!(console.polls, 0);
        seq.run_step(seq.current(), values(20.0, 20.0, 1), false, &Settings::default(), &mut console).unwrap();
        // one check per interpolated step, none on the landing
        assert_eq!(console.polls, STEPS_PER_SECOND as usize - 1);
    }

    #[test]
    fn status_printed_once_per_second() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        seq.run_step(SequenceValues::ZERO, values(30.0, 30.0, 2), false, &Settings::default(), &mut console).unwrap();
        assert_eq!(console.output.matches('\r').count(), 3);
        assert!(console.output.contains("\r0\" - Actual frequency +0.0000 Hz     "));
        assert!(console.output.contains("\r1\" - Actual frequency +15.00 Hz     "));
        assert!(console.output.contains("\r2\" - Actual frequency +30.00 Hz     \n"));
    }

    #[test]
    fn differing_channels_show_both() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        let mut target = values(20.0, 20.0, 0);
        target.second_reverse = true;
        seq.run_step(SequenceValues::ZERO, target, false, &Settings::default(), &mut console).unwrap();
        assert_eq!(console.output, "\rActual frequency +20.00 Hz : -20.00 Hz     \n");
    }

    #[test]
    fn direction_switches_with_final_snapshot() {
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        let mut target = values(10.0, 10.0, 1);
        target.first_reverse = true;
        target.second_reverse = true;
        seq.run_step(values(10.0, 10.0, 0), target, false, &Settings::default(), &mut console).unwrap();
        let (last, ramp) = seq.sink.split_last().unwrap();
        assert!(ramp.iter().all(|s| !s.channel1.reverse && !s.channel2.reverse));
        assert!(last.channel1.reverse && last.channel2.reverse);
    }

    #[test]
    fn speed_mode_converts_through_wheel() {
        let settings = Settings {
            speed: SpeedDefinition { n_teeth: 100, diameter_mm: 920, gear_ratio: 1.0 },
            ..Default::default()
        };
        let mut seq = sequencer();
        let mut console = ScriptedConsole::default();
        seq.run_step(SequenceValues::ZERO, values(36.0, 36.0, 0), false, &settings, &mut console).unwrap();
        let expected = UnitConverter::period_ticks_of(settings.units().frequency_of(36.0));
        assert_eq!(seq.sink[0].channel1.period_ticks, expected);
        // 723 ticks is the closest period, shown back as speed
        assert_eq!(expected, 723);
        assert!(console.output.starts_with("\rActual speed +35.98 km/h (345.8 Hz)"));
    }

    #[test]
    fn paces_on_sync_gate_slot() {
        let gate: SyncGate = SyncGate::new();
        let mut slot = gate.slot(0);
        // nothing armed: the wait falls through once the count is zero
        StepPacer::wait_ticks(&mut slot, 0);
        StepPacer::set_heartbeat_frequency(&mut slot, 1.0);
        assert_eq!(gate.heartbeat_repeat(), 15);
    }
}
