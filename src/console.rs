//! Line oriented console over a byte transport.

use core::fmt;
use core::hint::spin_loop;

use heapless::Deque;

pub const LINE_CAPACITY: usize = 80;
/// Bytes typed during a sequence that `poll_cancel` kept for the next
/// line. Overflow is dropped.
pub const PENDING_CAPACITY: usize = 16;

const CTRL_C: u8 = 0x03;
const CTRL_E: u8 = 0x05;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

/// Raw byte transport under the console (USB CDC pipes on the board).
pub trait ByteIo {
    /// Non-blocking read of one byte.
    fn try_read(&mut self) -> Option<u8>;
    fn write_bytes(&mut self, bytes: &[u8]);
}

/// What the sequencer needs from the console: somewhere to print status and
/// a cancel check polled between ramp steps.
pub trait StatusConsole: fmt::Write {
    /// True when the user asked to stop the running sequence.
    fn poll_cancel(&mut self) -> bool;

    /// Drops whatever the user typed while a sequence was running.
    fn discard_input(&mut self) {}
}

pub type Line = heapless::String<LINE_CAPACITY>;

pub struct Console<IO> {
    io: IO,
    /// Bytes read by `poll_cancel` that were not a cancel request.
    pending: Deque<u8, PENDING_CAPACITY>,
    echo: bool,
    last_was_cr: bool,
}

impl<IO: ByteIo> Console<IO> {
    pub fn new(io: IO) -> Self {
        Self { io, pending: Deque::new(), echo: true, last_was_cr: false }
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    fn try_read(&mut self) -> Option<u8> {
        self.pending.pop_front().or_else(|| self.io.try_read())
    }

    fn read_blocking(&mut self) -> u8 {
        loop {
            if let Some(byte) = self.try_read() {
                return byte;
            }
            spin_loop();
        }
    }

    /// Reads one line, editing as it goes. CR, LF and CR LF all end a line.
    /// Input beyond the buffer is dropped.
    pub fn read_line(&mut self) -> Line {
        let mut line = Line::new();
        loop {
            let byte = self.read_blocking();
            let after_cr = core::mem::replace(&mut self.last_was_cr, false);
            match byte {
                b'\n' if after_cr => {}
                b'\r' | b'\n' => {
                    self.last_was_cr = byte == b'\r';
                    return line;
                }
                CTRL_E => self.echo = !self.echo,
                BACKSPACE | DELETE => {
                    if line.pop().is_some() {
                        self.io.write_bytes(&[BACKSPACE, b' ', BACKSPACE]);
                    }
                }
                byte if byte.is_ascii() && !byte.is_ascii_control() => {
                    if line.push(byte as char).is_ok() && self.echo {
                        self.io.write_bytes(&[byte]);
                    }
                }
                _ => {}
            }
        }
    }
}

impl<IO: ByteIo> fmt::Write for Console<IO> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.io.write_bytes(s.as_bytes());
        Ok(())
    }
}

impl<IO: ByteIo> StatusConsole for Console<IO> {
    /// Reads the transport directly so a cancel behind already kept bytes
    /// is still seen.
    fn poll_cancel(&mut self) -> bool {
        match self.io.try_read() {
            Some(CTRL_C) => true,
            Some(other) => {
                let _ = self.pending.push_back(other);
                false
            }
            None => false,
        }
    }

    fn discard_input(&mut self) {
        self.pending.clear();
        while self.io.try_read().is_some() {}
        self.last_was_cr = false;
    }
}
