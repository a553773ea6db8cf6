//! Firmware core of a serial-to-I2C adapter.
//!
//! The host talks to the adapter over a byte stream ([`Link`]) using short text
//! commands such as `addr:0x50`, `bytes:2`, `send 00 10` and `recv`. The
//! [`Bridge`] frames the stream, decodes the commands and runs them on an I2C
//! master ([`Bus`]), or probes an address by bit-banging the bus lines
//! ([`Bitbang`]). Replies are either human-readable text or, in M2M mode,
//! single-character status codes with a flow-controlled data stream.
//!
//! Everything is generic over `embedded-hal` 1.0 traits; the board supplies the
//! transport, the I2C peripheral and the pin switching.

#![cfg_attr(not(test), no_std)]

pub mod bridge;
pub mod bus;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod framer;
pub mod link;
pub mod output;
pub mod probe;
pub mod session;
pub mod status;

pub use bridge::{Activity, Bridge};
pub use bus::{Bus, HalBus};
pub use config::Config;
pub use error::Error;
pub use link::Link;
pub use output::Status;
pub use probe::{AddressProbe, Bitbang, BusLines};
pub use session::{InputMode, Session, TokenProgress};
pub use status::StatusLed;
