//! Splits the incoming byte stream into command units.
//!
//! ASCII input is line based: carriage return ends a line, backspace and
//! delete edit it. Binary input is block based: a block ends with [`MAGIC`].

use crate::config::{FRAME_CAPACITY, LINE_CAPACITY, MAGIC};
use crate::session::InputMode;

const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7F;
const CARRIAGE_RETURN: u8 = b'\r';

/// What one byte did to the framer.
#[derive(Debug, PartialEq, Eq)]
pub enum Framed<'a> {
    /// Buffered, nothing to show.
    Pending,
    /// Buffered ASCII character, to be echoed.
    Typed(u8),
    /// The previous character was removed.
    Erased,
    /// Complete ASCII line, with a space appended after the last token.
    Line(&'a [u8]),
    /// Complete binary block, without the trailer.
    Block(&'a [u8]),
    /// The buffer filled up before the unit ended, everything buffered was dropped.
    Overflow,
}

/// Bounded line/block buffer with a write cursor.
#[derive(Debug)]
pub struct Framer {
    buf: [u8; FRAME_CAPACITY],
    len: usize,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub const fn new() -> Self {
        Self {
            buf: [0; FRAME_CAPACITY],
            len: 0,
        }
    }

    /// Bytes buffered towards the next unit.
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn push(&mut self, byte: u8, mode: InputMode) -> Framed<'_> {
        match mode {
            InputMode::Ascii => self.push_ascii(byte),
            InputMode::Binary => self.push_binary(byte),
        }
    }

    fn push_ascii(&mut self, byte: u8) -> Framed<'_> {
        match byte {
            BACKSPACE | DELETE => {
                if self.len == 0 {
                    return Framed::Pending;
                }
                self.len -= 1;
                Framed::Erased
            }
            CARRIAGE_RETURN => {
                // Ordinary bytes stop short of LINE_CAPACITY, so the space always fits.
                self.buf[self.len] = b' ';
                let len = self.len + 1;
                self.len = 0;
                Framed::Line(&self.buf[..len])
            }
            _ => {
                self.buf[self.len] = byte;
                self.len += 1;
                if self.len >= LINE_CAPACITY {
                    self.len = 0;
                    return Framed::Overflow;
                }
                Framed::Typed(byte)
            }
        }
    }

    fn push_binary(&mut self, byte: u8) -> Framed<'_> {
        self.buf[self.len] = byte;
        self.len += 1;
        if self.buf[..self.len].ends_with(&MAGIC) {
            let len = self.len - MAGIC.len();
            self.len = 0;
            return Framed::Block(&self.buf[..len]);
        }
        if self.len == FRAME_CAPACITY {
            self.len = 0;
            return Framed::Overflow;
        }
        Framed::Pending
    }
}
