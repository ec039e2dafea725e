//! Foreground dispatcher: turns console commands into sequencer runs.

use core::fmt::Write;

use crate::command::{interpret, Outcome};
use crate::console::StatusConsole;
use crate::display::{write_current, write_help, write_list, write_step};
use crate::recording::Recording;
use crate::sequencer::{Interrupted, Sequencer, SnapshotSink, StepPacer};
use crate::state::{SequenceValues, Settings, SpeedDefinition};

const MSG_INTERRUPTED: &str = "^C - sequence interrupted!\n";

pub struct Controller<S, P> {
    sequencer: Sequencer<S, P>,
    settings: Settings,
    /// Values being edited by commands; applied or recorded on demand.
    next: SequenceValues,
    recording: Recording,
}

impl<S: SnapshotSink, P: StepPacer> Controller<S, P> {
    pub fn new(sink: S, pacer: P) -> Self {
        Self {
            sequencer: Sequencer::new(sink, pacer),
            settings: Settings::default(),
            next: SequenceValues::ZERO,
            recording: Recording::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn next(&self) -> SequenceValues {
        self.next
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Puts the outputs in the initial (stopped) state on the gate grid.
    pub fn start<C: StatusConsole>(&mut self, console: &mut C) {
        let _ = self.sequencer.run_step(self.next, self.next, true, &self.settings, console);
    }

    /// Runs one trimmed console line to completion.
    pub fn handle_line<C: StatusConsole>(&mut self, line: &str, console: &mut C) -> Outcome {
        let outcome = interpret(line, &mut self.next);
        match outcome {
            Outcome::Empty => {
                let units = self.settings.units();
                let _ = write_current(console, &self.sequencer.last_sent(), &units);
            }
            Outcome::NewRecord if self.recording.is_recording() => {
                if self.recording.push(self.next).is_err() {
                    warn!("recording full ({} items)", self.recording.len());
                    let _ = console.write_str("Error: recording array is full!\n");
                }
            }
            Outcome::NewRecord => {
                let from = self.sequencer.current();
                self.run_immediate(from, console);
            }
            Outcome::NewValue => {
                self.next.delay_s = 0;
                self.run_immediate(self.next, console);
            }
            Outcome::NewSpeedDefinition(definition) => self.set_speed_definition(definition, console),
            Outcome::SyntaxError => {
                let _ = console.write_str("Syntax error, ? for help\n");
            }
            Outcome::RangeError => {
                let _ = console.write_str("Value out of range, ?? for limits\n");
            }
            Outcome::InitList => self.recording.begin(),
            Outcome::CloseList => self.recording.close(),
            Outcome::ExecuteList => {
                self.recording.close();
                if self.play_list(true, console).is_err() {
                    let _ = console.write_str(MSG_INTERRUPTED);
                }
                console.discard_input();
            }
            Outcome::LoopList => {
                self.recording.close();
                self.loop_list(console);
                console.discard_input();
            }
            Outcome::PrintList => {
                let units = self.settings.units();
                let _ = write_list(console, self.recording.iter(), &units);
            }
            Outcome::Help => {
                let _ = write_help(console, false);
            }
            Outcome::ExtendedHelp => {
                let _ = write_help(console, true);
            }
        }
        outcome
    }

    fn run_immediate<C: StatusConsole>(&mut self, from: SequenceValues, console: &mut C) {
        if self.sequencer.run_step(from, self.next, true, &self.settings, console).is_err() {
            let _ = console.write_str(MSG_INTERRUPTED);
        }
        console.discard_input();
    }

    fn set_speed_definition<C: StatusConsole>(&mut self, definition: SpeedDefinition, console: &mut C) {
        self.settings.speed = definition;
        info!("speed definition {}", definition);
        if !definition.is_speed() {
            let _ = console.write_str("Speed definition cancelled (only deals with frequencies)\n");
        } else {
            let _ = writeln!(
                console,
                "New speed definition: {} teeth, diameter= {} mm, r={:.6}",
                definition.n_teeth, definition.diameter_mm, definition.gear_ratio
            );
        }
    }

    /// Plays every recorded item once, announcing each step.
    fn play_list<C: StatusConsole>(&mut self, resync: bool, console: &mut C) -> Result<(), Interrupted> {
        let units = self.settings.units();
        for index in 0..self.recording.len() {
            let Some(&to) = self.recording.get(index) else { break };
            let from = self.sequencer.current();
            self.next = to;
            let _ = write_step(console, index + 1, &from, &to, &units, &self.settings.float_eq);
            self.sequencer.run_step(from, to, resync && index == 0, &self.settings, console)?;
        }
        Ok(())
    }

    /// Plays the list until cancelled. A cancel typed while the last item
    /// lands is picked up before the next pass.
    fn loop_list<C: StatusConsole>(&mut self, console: &mut C) {
        if self.recording.is_empty() {
            return;
        }
        let mut pass = 0u32;
        loop {
            if self.play_list(pass == 0, console).is_err() || console.poll_cancel() {
                let _ = console.write_str(MSG_INTERRUPTED);
                debug!("list loop stopped after {} passes", pass);
                return;
            }
            pass = pass.wrapping_add(1);
        }
    }
}
