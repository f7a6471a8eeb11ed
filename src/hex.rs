//! Codec for hex-framed transmit payloads.
//!
//! The payload is a leading `0`, a framing tag (`C` for command framing,
//! `D` for data), then two hex digits per byte: `0D4142` sends the data
//! bytes `AB`, `0C3F` sends the unlisten command. A data payload may carry a
//! trailing `;`, which holds off the end marker on the resulting
//! transmission.

use arrayvec::ArrayVec;
use nom::branch::alt;
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, map, opt, value};
use nom::multi::fold_many1;
use nom::IResult;
use snafu::{ensure, Snafu};

use crate::buffer::LINE_CAP;

/// Largest decodable payload: a full command line of digit pairs.
pub const HEX_MSG_CAP: usize = LINE_CAP / 2;

pub type HexBytes = ArrayVec<u8, HEX_MSG_CAP>;

type Buf = [u8];

/// Error type for this module
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum HexError {
    /// The payload doesn't follow the `0C…`/`0D…;` grammar.
    #[snafu(display("Malformed hex payload"))]
    Malformed,
}

/// Framing selected by the payload tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Command framing: transmitted with ATN asserted.
    Command,
    /// Data framing: ordinary device traffic.
    Data,
}

/// A decoded hex payload.
#[derive(Debug, PartialEq)]
pub struct HexMessage {
    pub framing: Framing,
    pub bytes: HexBytes,
    /// False when a data payload carried the trailing `;`, holding off the
    /// end marker on transmission.
    pub end_marker: bool,
}

/// Validate and decode a hex payload.
/// # Errors
/// Returns [`HexError::Malformed`] on any deviation from the grammar: bad
/// leading byte or tag, odd or missing digits, a non-hex digit, or a `;`
/// on anything but a data payload.
pub fn parse(payload: &Buf) -> Result<HexMessage, HexError> {
    // The digit fold below cannot overflow its store for any payload that
    // fits on a command line.
    ensure!(payload.len() <= LINE_CAP, MalformedSnafu);
    match all_consuming(hex_message)(payload) {
        Ok((_, message)) => Ok(message),
        Err(_) => MalformedSnafu.fail(),
    }
}

fn hex_message(buf: &Buf) -> IResult<&Buf, HexMessage> {
    let (buf, _) = char('0')(buf)?;
    let (buf, framing) = framing_tag(buf)?;
    let (buf, bytes) = fold_many1(hex_digit_pair, HexBytes::new, |mut acc, byte| {
        acc.push(byte);
        acc
    })(buf)?;
    let (buf, hold_off) = match framing {
        Framing::Data => opt(char(';'))(buf)?,
        Framing::Command => (buf, None),
    };
    Ok((
        buf,
        HexMessage {
            framing,
            bytes,
            end_marker: hold_off.is_none(),
        },
    ))
}

fn framing_tag(buf: &Buf) -> IResult<&Buf, Framing> {
    alt((
        value(Framing::Command, one_of("Cc")),
        value(Framing::Data, one_of("Dd")),
    ))(buf)
}

fn hex_digit_pair(buf: &Buf) -> IResult<&Buf, u8> {
    map(
        take_while_m_n(2, 2, |c: u8| c.is_ascii_hexdigit()),
        |pair: &Buf| (nibble(pair[0]) << 4) | nibble(pair[1]),
    )(buf)
}

fn nibble(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}
