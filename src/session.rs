//! State that persists between lines.

use embedded_hal::i2c::SevenBitAddress;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Carriage-return terminated text lines.
    #[default]
    Ascii,
    /// Blocks terminated by the magic trailer.
    Binary,
}

/// Whether the decoder is collecting payload byte tokens for a `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenProgress {
    #[default]
    None,
    Send,
}

/// Adapter state carried between tokens and lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub input_mode: InputMode,
    /// Single-character status replies instead of prose.
    pub m2m: bool,
    pub echo: bool,
    pub address: SevenBitAddress,
    /// Byte count declared with `bytes:`, zero when nothing is pending.
    pub expected: usize,
    pub progress: TokenProgress,
    /// Keep the bus for a repeated start after the pending write.
    pub repeated_start: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            input_mode: InputMode::Ascii,
            m2m: false,
            echo: config.echo,
            address: 0x00,
            expected: 0,
            progress: TokenProgress::None,
            repeated_start: false,
        }
    }

    pub fn sending(&self) -> bool {
        self.progress == TokenProgress::Send
    }

    /// Forgets any declared or half-collected transfer.
    pub fn reset_transfer(&mut self) {
        self.expected = 0;
        self.progress = TokenProgress::None;
        self.repeated_start = false;
    }

    /// Drops a send that is still waiting for payload bytes.
    pub fn abandon_send(&mut self) {
        self.progress = TokenProgress::None;
        self.repeated_start = false;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
