//! Buffer capacities, the block trailer and runtime settings.

/// ASCII line buffer size. A line overflows when it reaches this many bytes,
/// so the longest accepted line is one byte shorter, excluding the terminator.
pub const LINE_CAPACITY: usize = 300;

/// Framer storage: a full line plus the space appended on carriage return.
pub const FRAME_CAPACITY: usize = LINE_CAPACITY + 1;

/// Largest transfer a single `send` or `recv` can move.
pub const PAYLOAD_CAPACITY: usize = 256;

/// Longest token the decoder distinguishes; longer tokens are unknown commands.
pub const TOKEN_MAX: usize = 19;

/// Marks the end of a block in binary input mode.
pub const MAGIC: [u8; 8] = [0xBA, 0xDC, 0x0F, 0xFE, 0xE0, 0x0F, 0xF0, 0x0D];

/// Runtime settings of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Reply to `device?`.
    pub identifier: &'static str,
    /// Use ANSI colors in human-readable output.
    pub color: bool,
    /// Echo typed characters at startup.
    pub echo: bool,
    /// How long one poll waits for an input byte.
    pub poll_timeout_us: u32,
    /// How long a chunked transfer waits for the host to acknowledge a chunk.
    pub handshake_timeout_us: u32,
    /// Delay between edges while bit-banging an address probe.
    pub half_bit_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identifier: "easy_adapter",
            color: true,
            echo: true,
            poll_timeout_us: 1_000,
            handshake_timeout_us: 1_000_000,
            half_bit_us: 5,
        }
    }
}
