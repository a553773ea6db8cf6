//! Command failures and how they are reported.

use thiserror::Error;

use crate::output::Status;

/// Everything a command can fail with. None of these are fatal: the current
/// line or transfer is dropped and the loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("No bytes expected")]
    NoBytesExpected,
    #[error("Invalid byte")]
    InvalidByte,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Unknown command")]
    UnknownCommand,
    #[error("Too many bytes, at most {max} fit in one transfer")]
    TooManyBytes { max: usize },
    #[error("Protocol error sending bytes! Does the I2C device exist?")]
    BusWrite,
    #[error("Protocol error reading bytes! Does the I2C device exist?")]
    BusRead,
    #[error("Protocol error! Does the I2C device exist?")]
    NoDevice,
    #[error("Bus line could not be driven")]
    Pin,
}

impl Error {
    /// Sentinel sent in place of the message in M2M mode.
    pub const fn status(self) -> Status {
        match self {
            Self::BusWrite | Self::BusRead | Self::NoDevice | Self::Pin => Status::ProtocolError,
            _ => Status::Error,
        }
    }

    /// Whether the offending token belongs after the message.
    pub(crate) const fn quotes_token(self) -> bool {
        matches!(
            self,
            Self::InvalidByte | Self::InvalidArgument | Self::UnknownCommand
        )
    }
}
