//! One step of the adapter loop: a byte from the host through the framer
//! and, once a line or block is complete, through the decoder.

use log::warn;

use crate::bus::Bus;
use crate::config::Config;
use crate::engine::Decoder;
use crate::framer::{Framed, Framer};
use crate::link::Link;
use crate::output;
use crate::probe::AddressProbe;
use crate::session::Session;

const ERASE: &[u8] = b"\x08 \x08";

/// What one [`Bridge::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// No byte arrived before the poll timeout.
    Idle,
    /// A byte was consumed.
    Busy,
    /// The host sent `device?`; the status indicator should show it.
    Identified,
}

/// The adapter: reads commands from the host link and runs them against the bus.
///
/// ```ignore
/// let mut bridge = Bridge::new(usb, HalBus::new(i2c), Bitbang::new(lines, delay, 5), Config::default());
/// loop {
///     if bridge.poll() == Activity::Identified {
///         led.identify()?;
///     }
///     led.tick(&mut timer)?;
///     timer.delay_ms(1);
/// }
/// ```
pub struct Bridge<L, B, P> {
    framer: Framer,
    decoder: Decoder<L, B, P>,
}

impl<L, B, P> Bridge<L, B, P>
where
    L: Link,
    B: Bus,
    P: AddressProbe,
{
    pub fn new(link: L, bus: B, probe: P, config: Config) -> Self {
        Self {
            framer: Framer::new(),
            decoder: Decoder::new(link, bus, probe, config),
        }
    }

    pub fn session(&self) -> &Session {
        self.decoder.session()
    }

    pub fn payload(&self) -> &[u8] {
        self.decoder.payload()
    }

    pub fn link(&mut self) -> &mut L {
        &mut self.decoder.link
    }

    pub fn bus(&mut self) -> &mut B {
        &mut self.decoder.bus
    }

    pub fn probe(&mut self) -> &mut P {
        &mut self.decoder.probe
    }

    pub fn free(self) -> (L, B, P) {
        (self.decoder.link, self.decoder.bus, self.decoder.probe)
    }

    /// Reads at most one byte from the host and acts on it.
    pub fn poll(&mut self) -> Activity {
        let timeout = self.decoder.config.poll_timeout_us;
        match self.decoder.link.read_byte(timeout) {
            Some(byte) => self.feed(byte),
            None => Activity::Idle,
        }
    }

    /// Pushes one byte through the framer, running the decoder when a line or
    /// block completes.
    pub fn feed(&mut self, byte: u8) -> Activity {
        let session = &self.decoder.session;
        let echo = session.echo && !session.m2m;
        let mode = session.input_mode;

        match self.framer.push(byte, mode) {
            Framed::Pending => {}
            Framed::Typed(c) => {
                if echo {
                    self.decoder.link.write_byte(c);
                }
            }
            Framed::Erased => {
                if echo {
                    self.decoder.link.write(ERASE);
                }
            }
            Framed::Line(line) => {
                if echo {
                    self.decoder.link.write(b"\n");
                }
                self.decoder.process_line(line);
            }
            Framed::Block(block) => {
                let palette = self.decoder.palette();
                output::hex_dump(&mut self.decoder.link, palette, block);
                self.decoder.process_line(block);
            }
            Framed::Overflow => warn!("input overflowed {mode:?} buffer, discarded"),
        }

        if self.decoder.take_identified() {
            Activity::Identified
        } else {
            Activity::Busy
        }
    }

    /// Runs one complete line as if it had been typed, without echo.
    pub fn process_line(&mut self, line: &[u8]) -> Activity {
        self.decoder.process_line(line);
        if self.decoder.take_identified() {
            Activity::Identified
        } else {
            Activity::Busy
        }
    }
}
