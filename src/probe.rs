//! Address probing by bit-banging the bus lines.
//!
//! The probe takes SDA and SCL away from the I2C peripheral, clocks out an
//! address byte by hand and samples the acknowledge bit. Lines are treated as
//! open drain: driving high releases the line to its pull-up.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::SevenBitAddress;
use log::{trace, warn};

use crate::error::Error;

/// Checks whether a device acknowledges an address.
pub trait AddressProbe {
    fn probe(&mut self, address: SevenBitAddress) -> Result<bool, Error>;
}

impl<P: AddressProbe + ?Sized> AddressProbe for &mut P {
    fn probe(&mut self, address: SevenBitAddress) -> Result<bool, Error> {
        (**self).probe(address)
    }
}

/// Board hook that moves the two bus lines between the I2C peripheral and GPIO.
pub trait BusLines {
    type Sda: InputPin + OutputPin;
    type Scl: OutputPin;

    /// Switches both lines to GPIO, released high with pull-ups.
    fn detach(&mut self);

    /// Hands both lines back to the I2C peripheral and re-enables the pull-ups.
    fn attach(&mut self);

    fn sda(&mut self) -> &mut Self::Sda;

    fn scl(&mut self) -> &mut Self::Scl;
}

/// Lines detached for bit-banging. Dropping it gives them back to the peripheral.
struct Detached<'a, L: BusLines>(&'a mut L);

impl<'a, L: BusLines> Detached<'a, L> {
    fn new(lines: &'a mut L) -> Self {
        lines.detach();
        Self(lines)
    }

    fn sda(&mut self, high: bool) -> Result<(), Error> {
        let sda = self.0.sda();
        let driven = if high { sda.set_high() } else { sda.set_low() };
        driven.map_err(|_| Error::Pin)
    }

    fn scl(&mut self, high: bool) -> Result<(), Error> {
        let scl = self.0.scl();
        let driven = if high { scl.set_high() } else { scl.set_low() };
        driven.map_err(|_| Error::Pin)
    }

    fn sda_is_low(&mut self) -> Result<bool, Error> {
        self.0.sda().is_low().map_err(|_| Error::Pin)
    }
}

impl<L: BusLines> Drop for Detached<'_, L> {
    fn drop(&mut self) {
        self.0.attach();
    }
}

/// Bit-banged [`AddressProbe`].
pub struct Bitbang<L, D> {
    lines: L,
    delay: D,
    half_bit_us: u32,
}

impl<L: BusLines, D: DelayNs> Bitbang<L, D> {
    pub fn new(lines: L, delay: D, half_bit_us: u32) -> Self {
        Self {
            lines,
            delay,
            half_bit_us,
        }
    }

    pub fn free(self) -> (L, D) {
        (self.lines, self.delay)
    }

    fn clock_out(&mut self, address: SevenBitAddress) -> Result<bool, Error> {
        let half_bit = self.half_bit_us;
        let delay = &mut self.delay;
        let mut bus = Detached::new(&mut self.lines);

        // Start: SDA falls while SCL is high.
        bus.sda(true)?;
        bus.scl(true)?;
        bus.sda(false)?;
        delay.delay_us(half_bit);
        bus.scl(false)?;
        delay.delay_us(half_bit);

        let mut byte = (address << 1) | 1;
        for _ in 0..8 {
            bus.sda(byte & 0x80 != 0)?;
            delay.delay_us(half_bit);
            bus.scl(true)?;
            delay.delay_us(half_bit);
            bus.scl(false)?;
            delay.delay_us(half_bit);
            byte <<= 1;
        }

        // Acknowledge: the device pulls SDA low while SCL is high.
        bus.sda(true)?;
        delay.delay_us(half_bit);
        bus.scl(true)?;
        delay.delay_us(half_bit);
        let ack = bus.sda_is_low()?;
        bus.scl(false)?;
        delay.delay_us(half_bit);

        // Stop: SDA rises while SCL is high.
        bus.sda(false)?;
        delay.delay_us(half_bit);
        bus.scl(true)?;
        delay.delay_us(half_bit);
        bus.sda(true)?;
        delay.delay_us(half_bit);

        Ok(ack)
    }
}

impl<L: BusLines, D: DelayNs> AddressProbe for Bitbang<L, D> {
    fn probe(&mut self, address: SevenBitAddress) -> Result<bool, Error> {
        let ack = self.clock_out(address).inspect_err(|err| {
            warn!("probe of {address:#04x} abandoned: {err}");
        })?;
        trace!("probe of {address:#04x}: ack {ack}");
        Ok(ack)
    }
}
