//! Rendering of results: human-readable dumps and the flow-controlled M2M stream.

use core::fmt::Write;

use log::{debug, warn};

use crate::link::{Console, Link};

/// Single-character replies used in M2M mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = b'.',
    /// Chunk boundary or more payload expected.
    Continue = b'&',
    /// Generic failure, or the host asking to abort a transfer.
    Error = b'X',
    /// The bus transaction failed.
    ProtocolError = b'~',
}

impl Status {
    pub const fn byte(self) -> u8 {
        self as u8
    }

    pub fn send<L: Link + ?Sized>(self, link: &mut L) {
        link.write_byte(self.byte());
    }
}

/// ANSI foreground colors used by human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
    Cyan,
    Reset,
}

impl Color {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Red => "\x1b[31m",
            Self::Green => "\x1b[32m",
            Self::Blue => "\x1b[34m",
            Self::Cyan => "\x1b[36m",
            Self::Reset => "\x1b[0m",
        }
    }
}

/// Writes color escapes only when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub enabled: bool,
}

impl Palette {
    pub fn paint<L: Link + ?Sized>(self, link: &mut L, color: Color) {
        if self.enabled {
            link.write(color.code().as_bytes());
        }
    }
}

const DUMP_ROW: usize = 16;

/// Dumps `buf` as rows of sixteen bytes:
///
/// ```text
/// 000: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F : ................
/// ```
pub fn hex_dump<L: Link + ?Sized>(link: &mut L, palette: Palette, buf: &[u8]) {
    for (row, chunk) in buf.chunks(DUMP_ROW).enumerate() {
        palette.paint(link, Color::Blue);
        let _ = write!(Console(&mut *link), "{:03}: ", row * DUMP_ROW);

        palette.paint(link, Color::Cyan);
        for column in 0..DUMP_ROW {
            match chunk.get(column) {
                Some(b) => {
                    let _ = write!(Console(&mut *link), "{b:02X} ");
                }
                None => link.write(b"   "),
            }
        }

        palette.paint(link, Color::Blue);
        link.write(b": ");

        palette.paint(link, Color::Green);
        for column in 0..DUMP_ROW {
            link.write_byte(match chunk.get(column) {
                Some(&c) if (32..=126).contains(&c) => c,
                Some(_) => b'.',
                None => b' ',
            });
        }
        link.write(b"\n");
    }
    palette.paint(link, Color::Reset);
}

/// How a chunked M2M transfer puts bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Two uppercase hex digits and a space per byte, 16 bytes per chunk.
    Hex,
    /// The bytes themselves, 64 per chunk.
    Raw,
}

impl Encoding {
    pub const fn chunk_len(self) -> usize {
        match self {
            Self::Hex => 16,
            Self::Raw => 64,
        }
    }
}

/// How a chunked transfer ended. The final sentinel has already been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Every byte went out, followed by OK.
    Complete,
    /// The host replied with an abort request, acknowledged with OK.
    Aborted { sent: usize },
    /// The host replied with something unexpected or not at all, answered with ERROR.
    Failed { sent: usize },
}

/// Streams `bytes` to the host, stopping after every full chunk until the
/// host replies CONTINUE.
pub fn send_chunked<L: Link + ?Sized>(
    link: &mut L,
    bytes: &[u8],
    encoding: Encoding,
    timeout_us: u32,
) -> Transfer {
    let mut sent = 0;
    for chunk in bytes.chunks(encoding.chunk_len()) {
        match encoding {
            Encoding::Hex => {
                for b in chunk {
                    let _ = write!(Console(&mut *link), "{b:02X} ");
                }
            }
            Encoding::Raw => link.write(chunk),
        }
        sent += chunk.len();

        if chunk.len() < encoding.chunk_len() {
            break;
        }

        Status::Continue.send(link);
        match link.read_byte(timeout_us) {
            Some(reply) if reply == Status::Continue.byte() => {}
            Some(reply) if reply == Status::Error.byte() => {
                debug!("host aborted transfer after {sent} bytes");
                Status::Ok.send(link);
                return Transfer::Aborted { sent };
            }
            reply => {
                warn!("transfer stopped after {sent} bytes, host replied {reply:?}");
                Status::Error.send(link);
                return Transfer::Failed { sent };
            }
        }
    }
    Status::Ok.send(link);
    Transfer::Complete
}
