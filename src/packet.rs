//! Binary packet framing.
//!
//! Every field of a serialized macaroon is a packet of the form
//!
//! ```text
//! XXXX<field name> <data>\n
//! ```
//!
//! where `XXXX` is the total length of the packet (including those four
//! digits and the trailing newline) as lowercase ASCII hex. A packet can
//! therefore never be longer than 65535 bytes.
//!
//! Packets are stored back to back in one byte buffer, and a `Packet` is
//! only a view (offset and lengths) into that buffer.

use crate::error::{MacaroonError, Result};


/// The largest total packet length the four hex digits can express.
pub const MAX_PACKET_LEN: usize = 0xffff;

const SIZE_LEN: usize = 4;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";


/// The closed set of field names a packet may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Location,
    Identifier,
    CaveatId,
    VerificationId,
    CaveatLocation,
    Signature,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Location => "location",
            Field::Identifier => "identifier",
            Field::CaveatId => "cid",
            Field::VerificationId => "vid",
            Field::CaveatLocation => "cl",
            Field::Signature => "signature",
        }
    }

    pub fn from_name(name: &[u8]) -> Option<Field> {
        let field = match name {
            b"location" => Field::Location,
            b"identifier" => Field::Identifier,
            b"cid" => Field::CaveatId,
            b"vid" => Field::VerificationId,
            b"cl" => Field::CaveatLocation,
            b"signature" => Field::Signature,
            _ => return None,
        };
        Some(field)
    }
}


/// A view of a single packet inside a shared buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    start: usize,
    total_len: u16,
    header_len: u16,
}

impl Packet {
    /// Total length of the packet in bytes, framing included.
    pub fn len(&self) -> usize {
        self.total_len as usize
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Offset of the first byte after this packet.
    pub fn end(&self) -> usize {
        self.start + self.len()
    }

    /// The field name of the packet, read out of `buf`.
    pub fn field_name<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start + SIZE_LEN..self.start + self.header_len as usize - 1]
    }

    /// The payload of the packet, read out of `buf`.
    pub fn data<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start + self.header_len as usize..self.end() - 1]
    }
}


/// Size of the packet that would hold `data` under `field`.
pub fn packet_size(field: Field, data: &[u8]) -> usize {
    SIZE_LEN + field.name().len() + 1 + data.len() + 1
}

/// Appends a packet to the end of `buf` and returns a view of it.
///
/// Nothing is written if the packet would be too large.
pub fn append_packet(buf: &mut Vec<u8>, field: Field, data: &[u8]) -> Result<Packet> {
    let name = field.name();
    let size = packet_size(field, data);
    if size > MAX_PACKET_LEN {
        return Err(MacaroonError::PacketTooLarge(name, size));
    }

    let packet = Packet {
        start: buf.len(),
        total_len: size as u16,
        header_len: (SIZE_LEN + name.len() + 1) as u16,
    };

    buf.reserve(size);
    buf.extend_from_slice(&[
        HEX_DIGITS[size >> 12],
        HEX_DIGITS[(size >> 8) & 0xf],
        HEX_DIGITS[(size >> 4) & 0xf],
        HEX_DIGITS[size & 0xf],
    ]);
    buf.extend_from_slice(name.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(data);
    buf.push(b'\n');

    Ok(packet)
}

/// Parses the packet starting at `offset` in `buf`.
///
/// Only the framing is checked here; whether the field name is one we
/// expect is up to the caller.
pub fn parse_packet(buf: &[u8], offset: usize) -> Result<Packet> {
    let rest = buf.get(offset..).unwrap_or(&[]);
    if rest.len() < 6 {
        return Err(format_error("packet too short"));
    }

    let size = parse_size(&rest[..SIZE_LEN])
        .ok_or_else(|| format_error("cannot parse size"))?;
    if size > rest.len() {
        return Err(format_error("packet size too big"));
    }
    if size < 6 {
        return Err(format_error("packet size too small"));
    }

    let body = &rest[SIZE_LEN..size];
    let space = match body.iter().position(|&c| c == b' ') {
        Some(i) if i > 0 => i,
        _ => return Err(format_error("cannot parse field name")),
    };
    if body[body.len() - 1] != b'\n' {
        return Err(format_error("no terminating newline found"));
    }

    Ok(Packet {
        start: offset,
        total_len: size as u16,
        header_len: (SIZE_LEN + space + 1) as u16,
    })
}

fn parse_size(digits: &[u8]) -> Option<usize> {
    digits.iter().try_fold(0usize, |acc, &c| {
        let d = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => return None,
        };
        Some(acc << 4 | d as usize)
    })
}

fn format_error(msg: &str) -> MacaroonError {
    MacaroonError::PacketFormat(msg.to_owned())
}
