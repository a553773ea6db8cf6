//! Token decoder and command state machine.
//!
//! A completed line is split into space-terminated tokens, each token is parsed
//! into a [`Command`] and run against the [`Session`]. A `send` switches the
//! decoder into collecting payload byte tokens, which may span several lines;
//! the bus write happens when the last declared byte arrives.

use core::fmt::{self, Write};

use embedded_hal::i2c::SevenBitAddress;
use heapless::Vec;
use log::{debug, trace, warn};

use crate::bus::Bus;
use crate::command::{Command, END_TOK};
use crate::config::{Config, PAYLOAD_CAPACITY};
use crate::error::Error;
use crate::link::{Console, Link, Printable};
use crate::output::{self, Color, Encoding, Palette, Status, Transfer};
use crate::probe::AddressProbe;
use crate::session::{InputMode, Session, TokenProgress};

/// What the decoder does after a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep decoding the rest of the line.
    Continue,
    /// Ignore the rest of the line.
    LineComplete,
}

/// Space-terminated tokens of `line`. Text after the last space is not a token.
pub fn tokens<'a>(line: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
    line.iter()
        .rposition(|&b| b == b' ')
        .map(|end| &line[..end])
        .into_iter()
        .flat_map(|terminated| terminated.split(|&b| b == b' '))
}

pub struct Decoder<L, B, P> {
    pub(crate) link: L,
    pub(crate) bus: B,
    pub(crate) probe: P,
    pub(crate) config: Config,
    pub(crate) session: Session,
    payload: Vec<u8, PAYLOAD_CAPACITY>,
    identified: bool,
}

impl<L, B, P> Decoder<L, B, P>
where
    L: Link,
    B: Bus,
    P: AddressProbe,
{
    pub fn new(link: L, bus: B, probe: P, config: Config) -> Self {
        Self {
            link,
            bus,
            probe,
            session: Session::new(&config),
            config,
            payload: Vec::new(),
            identified: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Payload bytes collected for a send, or the bytes of the last receive.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether `device?` arrived since the last call.
    pub fn take_identified(&mut self) -> bool {
        core::mem::take(&mut self.identified)
    }

    pub(crate) fn palette(&self) -> Palette {
        Palette {
            enabled: self.config.color,
        }
    }

    /// Runs every token of one completed line or block.
    pub fn process_line(&mut self, line: &[u8]) {
        if line.is_empty() {
            return;
        }
        for token in tokens(line) {
            let command = Command::parse(token, self.session.progress);
            trace!("token '{}' -> {:?}", Printable(token), command);
            if self.execute(command, token) == Flow::LineComplete {
                return;
            }
        }
        self.execute(Command::EndOfTokens, END_TOK.as_bytes());
    }

    fn execute(&mut self, command: Command, token: &[u8]) -> Flow {
        match self.dispatch(command) {
            Ok(flow) => flow,
            Err(err) => {
                self.report(err, token);
                Flow::LineComplete
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> Result<Flow, Error> {
        match command {
            Command::DeviceQuery => self.device_query(),
            Command::Binary => self.binary(),
            Command::ExpectBytes(count) => self.expect_bytes(count),
            Command::Send { hold } => self.send(hold),
            Command::TryAddress(address) => self.try_address(address),
            Command::Receive => self.receive(),
            Command::M2m(on) => self.m2m(on),
            Command::Address(address) => self.address(address),
            Command::NoEcho => self.no_echo(),
            Command::EndOfTokens => self.end_of_tokens(),
            Command::PayloadByte(byte) => self.payload_byte(byte),
            Command::InvalidByte => {
                // Bytes already collected stay in the payload buffer.
                self.session.abandon_send();
                Err(Error::InvalidByte)
            }
            Command::InvalidArgument => Err(Error::InvalidArgument),
            Command::Unknown => Err(Error::UnknownCommand),
        }
    }

    fn device_query(&mut self) -> Result<Flow, Error> {
        let _ = write!(Console(&mut self.link), "{}\n\r", self.config.identifier);
        self.session.reset_transfer();
        self.payload.clear();
        if let Err(err) = self.bus.release() {
            warn!("held write failed on reset: {err:?}");
        }
        self.identified = true;
        Ok(Flow::LineComplete)
    }

    fn binary(&mut self) -> Result<Flow, Error> {
        debug!("switching to binary input");
        self.session.input_mode = InputMode::Binary;
        if self.session.m2m {
            self.status(Status::Ok);
        } else {
            self.print(format_args!("Switching to binary mode\n"));
        }
        Ok(Flow::LineComplete)
    }

    fn expect_bytes(&mut self, count: usize) -> Result<Flow, Error> {
        if count > PAYLOAD_CAPACITY {
            return Err(Error::TooManyBytes {
                max: PAYLOAD_CAPACITY,
            });
        }
        if self.session.sending() {
            warn!(
                "byte count changed with {} of {} payload bytes collected, send dropped",
                self.payload.len(),
                self.session.expected
            );
            self.session.abandon_send();
            self.payload.clear();
        }
        self.session.expected = count;
        if self.session.m2m {
            self.status(Status::Ok);
        } else {
            self.say(Color::Blue, format_args!("Expecting {count} bytes\n"));
        }
        Ok(Flow::LineComplete)
    }

    fn send(&mut self, hold: bool) -> Result<Flow, Error> {
        if self.session.expected == 0 {
            return Err(Error::NoBytesExpected);
        }
        self.payload.clear();
        self.session.progress = TokenProgress::Send;
        self.session.repeated_start = hold;
        Ok(Flow::Continue)
    }

    fn try_address(&mut self, address: SevenBitAddress) -> Result<Flow, Error> {
        let found = self.probe.probe(address);
        if self.session.m2m && self.session.input_mode == InputMode::Binary {
            debug!("probe result not reported in binary mode: {found:?}");
            return Ok(Flow::LineComplete);
        }
        if !found? {
            return Err(Error::NoDevice);
        }
        if self.session.m2m {
            self.status(Status::Ok);
        } else {
            self.say(
                Color::Blue,
                format_args!("Device found at address 0x{address:02X}\n"),
            );
        }
        Ok(Flow::LineComplete)
    }

    fn receive(&mut self) -> Result<Flow, Error> {
        let count = self.session.expected;
        if count == 0 {
            return Err(Error::NoBytesExpected);
        }
        if self.session.sending() {
            warn!("receive with a send pending, send dropped");
            self.session.abandon_send();
        }

        self.payload.clear();
        self.payload
            .resize(count, 0)
            .map_err(|_| Error::TooManyBytes {
                max: PAYLOAD_CAPACITY,
            })?;
        let address = self.session.address;
        if let Err(err) = self.bus.read(address, &mut self.payload) {
            warn!("read of {count} bytes from {address:#04x} failed: {err:?}");
            self.payload.clear();
            return Err(Error::BusRead);
        }
        debug!("read {count} bytes from {address:#04x}");

        if self.session.m2m {
            let encoding = match self.session.input_mode {
                InputMode::Ascii => Encoding::Hex,
                InputMode::Binary => Encoding::Raw,
            };
            let timeout = self.config.handshake_timeout_us;
            match output::send_chunked(&mut self.link, &self.payload, encoding, timeout) {
                Transfer::Complete => trace!("transfer complete"),
                outcome => debug!("transfer ended early: {outcome:?}"),
            }
        } else {
            let palette = self.palette();
            output::hex_dump(&mut self.link, palette, &self.payload);
        }
        Ok(Flow::LineComplete)
    }

    fn m2m(&mut self, on: bool) -> Result<Flow, Error> {
        debug!("m2m responses {}", if on { "on" } else { "off" });
        self.session.m2m = on;
        if on {
            self.status(Status::Ok);
        } else {
            self.print(format_args!("M2M response off\n"));
        }
        Ok(Flow::LineComplete)
    }

    fn address(&mut self, address: SevenBitAddress) -> Result<Flow, Error> {
        self.session.address = address;
        if self.session.m2m {
            self.status(Status::Ok);
        } else {
            self.say(
                Color::Blue,
                format_args!("I2C address set to 0x{address:02X}\n"),
            );
        }
        Ok(Flow::LineComplete)
    }

    fn no_echo(&mut self) -> Result<Flow, Error> {
        self.session.echo = false;
        if !self.session.m2m {
            self.say(Color::Blue, format_args!("Echo off\n"));
        }
        Ok(Flow::Continue)
    }

    fn end_of_tokens(&mut self) -> Result<Flow, Error> {
        if self.session.sending() {
            let remaining = self.session.expected - self.payload.len();
            if self.session.m2m {
                self.status(Status::Continue);
            } else {
                self.say(
                    Color::Blue,
                    format_args!("Remaining bytes expected: {remaining}\n"),
                );
            }
        }
        Ok(Flow::LineComplete)
    }

    fn payload_byte(&mut self, byte: u8) -> Result<Flow, Error> {
        if self.payload.push(byte).is_err() {
            warn!("payload full at {} bytes, send dropped", self.payload.len());
            self.session.abandon_send();
            return Err(Error::TooManyBytes {
                max: PAYLOAD_CAPACITY,
            });
        }
        if self.payload.len() < self.session.expected {
            return Ok(Flow::Continue);
        }

        let count = self.payload.len();
        let address = self.session.address;
        let hold = self.session.repeated_start;
        if !self.session.m2m {
            self.say(Color::Blue, format_args!("Sending {count} bytes\n"));
            let palette = self.palette();
            output::hex_dump(&mut self.link, palette, &self.payload);
        }

        let result = self.bus.write(address, &self.payload, hold);
        self.payload.clear();
        self.session.reset_transfer();

        if let Err(err) = result {
            warn!("write of {count} bytes to {address:#04x} failed: {err:?}");
            return Err(Error::BusWrite);
        }
        debug!("wrote {count} bytes to {address:#04x} (hold: {hold})");
        if self.session.m2m {
            self.status(Status::Ok);
        }
        Ok(Flow::LineComplete)
    }

    fn report(&mut self, err: Error, token: &[u8]) {
        debug!("{err} (token '{}')", Printable(token));
        if self.session.m2m {
            self.status(err.status());
        } else if err.quotes_token() {
            self.say(Color::Red, format_args!("{err}: {}\n", Printable(token)));
        } else {
            self.say(Color::Red, format_args!("{err}\n"));
        }
    }

    fn status(&mut self, status: Status) {
        status.send(&mut self.link);
    }

    fn print(&mut self, args: fmt::Arguments<'_>) {
        let _ = Console(&mut self.link).write_fmt(args);
    }

    /// Colored human-readable message.
    fn say(&mut self, color: Color, args: fmt::Arguments<'_>) {
        let palette = self.palette();
        palette.paint(&mut self.link, color);
        self.print(args);
        palette.paint(&mut self.link, Color::Reset);
    }
}
