//! The byte stream between the adapter and the host.

use core::fmt;

/// Serial-style transport to the host, usually USB CDC or a UART.
///
/// Writes are fire-and-forget: a transport that cannot deliver a byte drops it,
/// the same way the firmware's stdio does.
pub trait Link {
    /// Waits up to `timeout_us` for one byte from the host.
    fn read_byte(&mut self, timeout_us: u32) -> Option<u8>;

    fn write(&mut self, bytes: &[u8]);

    fn write_byte(&mut self, byte: u8) {
        self.write(&[byte]);
    }
}

impl<L: Link + ?Sized> Link for &mut L {
    fn read_byte(&mut self, timeout_us: u32) -> Option<u8> {
        (**self).read_byte(timeout_us)
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }
}

/// Formatted text output over a [`Link`].
pub struct Console<'a, L: ?Sized>(pub &'a mut L);

impl<L: Link + ?Sized> fmt::Write for Console<'_, L> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write(s.as_bytes());
        Ok(())
    }
}

/// Renders raw token bytes, replacing anything unprintable with `.`.
pub struct Printable<'a>(pub &'a [u8]);

impl fmt::Display for Printable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        for &b in self.0 {
            f.write_char(if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            })?;
        }
        Ok(())
    }
}
