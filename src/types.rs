//! This module defines range-checked types for the bridge's bus address and
//! the end-of-message policy, meant to simplify correct usage of the API.

use snafu::{ensure, OptionExt, Snafu};

use core::convert::{TryFrom, TryInto};
use core::ops::Deref;

/// Error type for this module
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid GPIB primary address.
    #[snafu(display("Invalid address"))]
    InvalidAddress,
    /// The value doesn't name an end-of-message policy.
    #[snafu(display("Invalid end-of-message policy"))]
    InvalidMsgEnd,
}

const fn invalid_address() -> InvalidAddressSnafu {
    InvalidAddressSnafu
}

/// Universal unlisten command byte (UNL, ASCII `?`).
pub const UNLISTEN: u8 = 0x3f;

/// Address is a range-checked [0, 30] integer, the bridge's primary bus
/// address.
///
/// ## Example
/// ```
/// use gpib_bridge::Address;
/// use std::convert::TryInto;
/// let addr = Address::new(10).unwrap();
/// let addr: Address = 10.try_into().unwrap();
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Address(u8);

/// Create a new [`Address`], panics if it is out of range.
pub const fn addr(a: u8) -> Address {
    if a <= 30 {
        return Address(a);
    }
    panic!("Invalid address.")
}

impl Address {
    /// Address the bridge answers to unless reconfigured.
    pub const DEFAULT: Address = Address(21);

    /// Create a new address, checking that the address is in \[0, 30\].
    /// # Errors
    /// Returns [`Error::InvalidAddress`] if `address` is out of range.
    pub fn new(address: impl TryInto<u8>) -> Result<Self, Error> {
        let address = address.try_into().ok().with_context(invalid_address)?;
        ensure!(address <= 30, invalid_address());
        Ok(Self(address))
    }

    /// The "my listen address" command byte. Seeing it in command-framed
    /// traffic puts the bridge into listen mode.
    pub const fn listen_token(self) -> u8 {
        0x20 + self.0
    }

    /// The "my talk address" command byte. Seeing it (or [`UNLISTEN`]) in
    /// command-framed traffic takes the bridge out of listen mode.
    pub const fn talk_token(self) -> u8 {
        0x40 + self.0
    }
}

impl Deref for Address {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<u8> for Address {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

/// Trait to convert `T: TryInto<u8>` into an [`Address`].
pub trait IntoAddress {
    /// Convert self to an Address.
    /// # Errors
    /// Returns `Error:InvalidAddress` if self isn't a valid address.
    fn into_address(self) -> Result<Address, Error>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address, Error> {
        Ok(self)
    }
}

impl<T> IntoAddress for T
where
    T: TryInto<u8>,
{
    fn into_address(self) -> Result<Address, Error> {
        Address::new(self)
    }
}

impl TryFrom<usize> for Address {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}


/// End-of-message byte sequence appended to outgoing payloads before
/// transmission, and trimmed back off the working buffer afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MsgEnd {
    /// Send the payload as-is.
    None,
    /// Append a carriage return.
    Cr,
    /// Append a line feed.
    Lf,
    /// Append carriage return plus line feed.
    CrLf,
}

impl MsgEnd {
    /// Parse the single-digit policy selector used on the command line.
    /// # Errors
    /// Returns [`Error::InvalidMsgEnd`] for anything but `'0'..='3'`.
    pub fn from_digit(digit: u8) -> Result<Self, Error> {
        match digit {
            b'0' => Ok(MsgEnd::None),
            b'1' => Ok(MsgEnd::Cr),
            b'2' => Ok(MsgEnd::Lf),
            b'3' => Ok(MsgEnd::CrLf),
            _ => InvalidMsgEndSnafu.fail(),
        }
    }

    /// The policy selector digit, as reported to the operator.
    pub const fn digit(self) -> u8 {
        match self {
            MsgEnd::None => b'0',
            MsgEnd::Cr => b'1',
            MsgEnd::Lf => b'2',
            MsgEnd::CrLf => b'3',
        }
    }

    /// The bytes this policy appends to an outgoing message.
    pub const fn bytes(self) -> &'static [u8] {
        match self {
            MsgEnd::None => b"",
            MsgEnd::Cr => b"\r",
            MsgEnd::Lf => b"\n",
            MsgEnd::CrLf => b"\r\n",
        }
    }
}

impl Default for MsgEnd {
    fn default() -> Self {
        MsgEnd::None
    }
}
