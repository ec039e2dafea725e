use heapless::Vec;

use crate::state::SequenceValues;

pub const SEQUENCE_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Default,
    Recording,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecordingFull;

/// Sequence items typed between `(` and `)`, replayed with `!`.
pub struct Recording {
    items: Vec<SequenceValues, SEQUENCE_CAPACITY>,
    mode: Mode,
}

impl Recording {
    pub const fn new() -> Self {
        Self { items: Vec::new(), mode: Mode::Default }
    }

    /// Starts a new list, dropping the previous one.
    pub fn begin(&mut self) {
        self.items.clear();
        self.mode = Mode::Recording;
    }

    pub fn close(&mut self) {
        self.mode = Mode::Default;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.mode == Mode::Recording
    }

    pub fn push(&mut self, values: SequenceValues) -> Result<(), RecordingFull> {
        self.items.push(values).map_err(|_| RecordingFull)
    }

    pub fn get(&self, index: usize) -> Option<&SequenceValues> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceValues> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Recording {
    fn default() -> Self {
        Self::new()
    }
}
