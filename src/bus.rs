//! Hardware I2C transactions.

use core::fmt::Debug;

use embedded_hal::i2c::{I2c, Operation, SevenBitAddress};
use heapless::Vec;
use log::{debug, trace};

use crate::config::PAYLOAD_CAPACITY;

/// Blocking I2C master as the command engine sees it.
///
/// A failed transaction is one opaque error: address not acknowledged or a bus
/// fault, with no count of the bytes that made it.
pub trait Bus {
    type Error: Debug;

    /// Writes `bytes` to `address`. With `hold` the bus is kept for a repeated
    /// start instead of ending with a stop condition.
    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        hold: bool,
    ) -> Result<(), Self::Error>;

    /// Fills `buf` from `address`.
    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Ends a held transaction with a stop condition.
    fn release(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<B: Bus + ?Sized> Bus for &mut B {
    type Error = B::Error;

    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        hold: bool,
    ) -> Result<(), Self::Error> {
        (**self).write(address, bytes, hold)
    }

    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(address, buf)
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        (**self).release()
    }
}

#[derive(Debug)]
struct Held {
    address: SevenBitAddress,
    bytes: Vec<u8, PAYLOAD_CAPACITY>,
}

/// [`Bus`] over any `embedded-hal` I2C master.
///
/// `embedded-hal` only expresses a repeated start inside one transaction, so a
/// held write is kept back and becomes the first operation of the next
/// transaction to the same address. A held write followed by traffic to a
/// different address, or by [`Bus::release`], goes out on its own.
///
/// A held write reports success before anything reaches the bus. A device that
/// does not acknowledge it is only noticed by the transaction that carries it,
/// so that transaction's error covers both halves.
#[derive(Debug)]
pub struct HalBus<I2C> {
    i2c: I2C,
    held: Option<Held>,
}

impl<I2C: I2c> HalBus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c, held: None }
    }

    pub fn free(self) -> I2C {
        self.i2c
    }

    /// Whether a write is waiting for its repeated start.
    pub fn holding(&self) -> bool {
        self.held.is_some()
    }

    /// Takes the held write if it targets `address`, flushing it otherwise.
    fn take_held(&mut self, address: SevenBitAddress) -> Result<Option<Held>, I2C::Error> {
        match self.held.take() {
            Some(held) if held.address == address => Ok(Some(held)),
            Some(held) => {
                debug!("flushing held write to {:#04x}", held.address);
                self.i2c.write(held.address, &held.bytes)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl<I2C: I2c> Bus for HalBus<I2C> {
    type Error = I2C::Error;

    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        hold: bool,
    ) -> Result<(), Self::Error> {
        if hold {
            self.release()?;
            if let Ok(bytes) = Vec::from_slice(bytes) {
                trace!("holding {} bytes for {:#04x}", bytes.len(), address);
                self.held = Some(Held { address, bytes });
                return Ok(());
            }
        }

        match self.take_held(address)? {
            Some(held) => self.i2c.transaction(
                address,
                &mut [Operation::Write(&held.bytes), Operation::Write(bytes)],
            ),
            None => self.i2c.write(address, bytes),
        }
    }

    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        match self.take_held(address)? {
            Some(held) => self.i2c.write_read(address, &held.bytes, buf),
            None => self.i2c.read(address, buf),
        }
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        match self.held.take() {
            Some(held) => self.i2c.write(held.address, &held.bytes),
            None => Ok(()),
        }
    }
}
