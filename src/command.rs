//! Turns one token into a command.

use core::str;

use easy_i2c_macros::keyword_table;
use embedded_hal::i2c::SevenBitAddress;

use crate::config::TOKEN_MAX;
use crate::session::TokenProgress;

// Matched top to bottom, first hit wins.
keyword_table! {
    | "device?"   | DeviceQuery | exact  |,
    | "bin"       | Binary      | exact  |,
    | "bytes:"    | Bytes       | prefix |,
    | "send+hold" | SendHold    | exact  |,
    | "send"      | Send        | exact  |,
    | "tryaddr:"  | TryAddr     | prefix |,
    | "recv"      | Recv        | exact  |,
    | "m2m_resp:" | M2mResp     | prefix |,
    | "addr:"     | Addr        | prefix |,
    | "noecho"    | NoEcho      | exact  |,
    | "end_tok"   | EndTok      | exact  |,
}

const HEX_PREFIX: &[u8] = b"0x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `device?`
    DeviceQuery,
    /// `bin`
    Binary,
    /// `bytes:<n>`, not yet checked against the payload capacity.
    ExpectBytes(usize),
    /// `send` or `send+hold`
    Send { hold: bool },
    /// `tryaddr:<addr>`
    TryAddress(SevenBitAddress),
    /// `recv`
    Receive,
    /// `m2m_resp:<0|1>`
    M2m(bool),
    /// `addr:<addr>`
    Address(SevenBitAddress),
    /// `noecho`
    NoEcho,
    /// `end_tok`, also synthesized after the last token of a line.
    EndOfTokens,
    /// Two hex digits while a send is collecting payload.
    PayloadByte(u8),
    /// Anything else while a send is collecting payload.
    InvalidByte,
    /// A known keyword with an argument it cannot use.
    InvalidArgument,
    Unknown,
}

impl Command {
    pub fn parse(token: &[u8], progress: TokenProgress) -> Self {
        if token.len() > TOKEN_MAX {
            return match progress {
                TokenProgress::Send => Self::InvalidByte,
                TokenProgress::None => Self::Unknown,
            };
        }

        if let Some((keyword, argument)) = Keyword::split(token) {
            return Self::from_keyword(keyword, argument).unwrap_or(Self::InvalidArgument);
        }

        match progress {
            TokenProgress::Send => parse_hex_byte(token).map_or(Self::InvalidByte, Self::PayloadByte),
            TokenProgress::None => Self::Unknown,
        }
    }

    fn from_keyword(keyword: Keyword, argument: &[u8]) -> Option<Self> {
        Some(match keyword {
            Keyword::DeviceQuery => Self::DeviceQuery,
            Keyword::Binary => Self::Binary,
            Keyword::Bytes => Self::ExpectBytes(parse_decimal(argument)?),
            Keyword::SendHold => Self::Send { hold: true },
            Keyword::Send => Self::Send { hold: false },
            Keyword::TryAddr => Self::TryAddress(parse_address(argument)?),
            Keyword::Recv => Self::Receive,
            Keyword::M2mResp => Self::M2m(argument.first() == Some(&b'1')),
            Keyword::Addr => Self::Address(parse_address(argument)?),
            Keyword::NoEcho => Self::NoEcho,
            Keyword::EndTok => Self::EndOfTokens,
        })
    }
}

fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    str::from_utf8(digits).ok()?.parse().ok()
}

fn parse_hex(digits: &[u8]) -> Option<u8> {
    if digits.is_empty() || digits.len() > 2 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(str::from_utf8(digits).ok()?, 16).ok()
}

/// `0x`-prefixed hex (one or two digits) or decimal, limited to 7 bits.
fn parse_address(argument: &[u8]) -> Option<SevenBitAddress> {
    let value = match argument.strip_prefix(HEX_PREFIX) {
        Some(digits) => parse_hex(digits)?,
        None => u8::try_from(parse_decimal(argument)?).ok()?,
    };
    (value <= 0x7F).then_some(value)
}

fn parse_hex_byte(token: &[u8]) -> Option<u8> {
    match token.len() {
        2 => parse_hex(token),
        _ => None,
    }
}
