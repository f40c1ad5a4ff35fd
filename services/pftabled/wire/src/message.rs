//! Fixed-size control message layout, encoding and decoding.
//!
//! Every command travels as exactly one [`MESSAGE_SIZE`]-byte UDP datagram.
//! The authentication tag covers the first [`SIGNED_LEN`] bytes in their wire
//! byte order, so signing and verification always operate on encoded bytes,
//! never on decoded host-order values.

use crate::auth::{AuthTag, TAG_SIZE};
use crate::error::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::net::Ipv4Addr;

/// Current wire protocol version
pub const WIRE_VERSION: u8 = 2;

/// Oldest version still accepted; predates per-entry prefix lengths
pub const LEGACY_VERSION: u8 = 1;

/// Fixed width of the table name field in bytes
pub const TABLE_NAME_SIZE: usize = 32;

/// Number of leading wire bytes covered by the authentication tag
pub const SIGNED_LEN: usize = 4 + 4 + TABLE_NAME_SIZE + 4;

/// Total message size in bytes
pub const MESSAGE_SIZE: usize = SIGNED_LEN + TAG_SIZE;

/// Command codes as defined in the wire protocol
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Add an address to a table
    Add = 0x01,
    /// Remove an address from a table
    Remove = 0x02,
    /// Flush all addresses from a table
    Flush = 0x03,
}

impl TryFrom<u8> for Command {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Command::Add),
            0x02 => Ok(Command::Remove),
            0x03 => Ok(Command::Flush),
            _ => Err(WireError::Command(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Add => write!(f, "add"),
            Command::Remove => write!(f, "del"),
            Command::Flush => write!(f, "flush"),
        }
    }
}

/// Fixed-capacity table name.
///
/// The wire field is a fixed-width byte buffer with no terminator guarantee.
/// Construction is length-bounded and comparisons cover the whole buffer, so
/// names are never treated as C strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableName([u8; TABLE_NAME_SIZE]);

impl TableName {
    /// Create a table name from text, failing if it exceeds the fixed width
    pub fn new(name: &str) -> Result<Self, WireError> {
        let bytes = name.as_bytes();
        if bytes.len() > TABLE_NAME_SIZE {
            return Err(WireError::TableName(bytes.len()));
        }
        let mut buf = [0u8; TABLE_NAME_SIZE];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(buf))
    }

    /// Create a table name from a raw wire field
    pub fn from_wire(raw: [u8; TABLE_NAME_SIZE]) -> Self {
        Self(raw)
    }

    /// Raw fixed-width bytes as they appear on the wire
    pub fn as_bytes(&self) -> &[u8; TABLE_NAME_SIZE] {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(TABLE_NAME_SIZE);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

impl fmt::Debug for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableName({})", self)
    }
}

/// Decoded control message, excluding the authentication tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlMessage {
    /// Protocol version from the wire
    pub version: u8,
    /// Requested command
    pub command: Command,
    /// CIDR prefix length; meaningful for Add/Remove only
    pub mask: u8,
    /// IPv4 address the command applies to
    pub addr: Ipv4Addr,
    /// Target table name
    pub table: TableName,
    /// Sender timestamp, seconds since the Unix epoch
    pub timestamp: u32,
}

impl ControlMessage {
    /// Encode the signed region (everything before the tag) in wire order
    pub fn signed_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(SIGNED_LEN);
        self.put_signed(&mut buf);
        buf.freeze()
    }

    /// Encode the full message including the given tag
    pub fn encode(&self, tag: &AuthTag) -> Bytes {
        let mut buf = BytesMut::with_capacity(MESSAGE_SIZE);
        self.put_signed(&mut buf);
        buf.put_slice(tag.as_bytes());
        buf.freeze()
    }

    fn put_signed(&self, buf: &mut BytesMut) {
        buf.put_u8(self.version);
        buf.put_u8(self.command as u8);
        buf.put_u8(0); // reserved
        buf.put_u8(self.mask);
        buf.put_slice(&self.addr.octets());
        buf.put_slice(self.table.as_bytes());
        buf.put_u32(self.timestamp);
    }

    /// Decode a datagram into a message and its authentication tag.
    ///
    /// Rejects any input whose length differs from [`MESSAGE_SIZE`], versions
    /// newer than [`WIRE_VERSION`] or older than [`LEGACY_VERSION`], and
    /// unknown command codes. The tag is returned unverified; callers check
    /// it against the raw signed region of the datagram.
    pub fn decode(datagram: &[u8]) -> Result<(Self, AuthTag), WireError> {
        if datagram.len() != MESSAGE_SIZE {
            return Err(WireError::Length(datagram.len()));
        }

        let mut buf = datagram;

        let version = buf.get_u8();
        if version > WIRE_VERSION || version < LEGACY_VERSION {
            return Err(WireError::Version(version));
        }

        let command = Command::try_from(buf.get_u8())?;
        let _reserved = buf.get_u8();
        let mask = buf.get_u8();

        let mut octets = [0u8; 4];
        buf.copy_to_slice(&mut octets);
        let addr = Ipv4Addr::from(octets);

        let mut table = [0u8; TABLE_NAME_SIZE];
        buf.copy_to_slice(&mut table);

        let timestamp = buf.get_u32();

        let mut tag = [0u8; TAG_SIZE];
        buf.copy_to_slice(&mut tag);

        Ok((
            Self {
                version,
                command,
                mask,
                addr,
                table: TableName::from_wire(table),
                timestamp,
            },
            AuthTag::from_bytes(tag),
        ))
    }

    /// Apply version-dependent field defaults.
    ///
    /// [`LEGACY_VERSION`] messages carry no meaningful prefix length, so the
    /// mask is forced to a single host regardless of the wire byte.
    pub fn normalize(&mut self) {
        if self.version == LEGACY_VERSION {
            self.mask = 32;
        }
    }
}

/// Zero all address bits past the first `mask` bits.
///
/// Applied to every Add/Remove address before it reaches the backend,
/// whether or not the sender supplied it already clean. Masks of 32 and
/// above leave the address untouched; a mask of 0 clears it entirely
/// (callers reject 0 before dispatch).
pub fn clean_mask(addr: Ipv4Addr, mask: u8) -> Ipv4Addr {
    if mask >= 32 {
        return addr;
    }
    if mask == 0 {
        return Ipv4Addr::UNSPECIFIED;
    }
    let bits = u32::from(addr) & (u32::MAX << (32 - u32::from(mask)));
    Ipv4Addr::from(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthTag;

    fn sample() -> ControlMessage {
        ControlMessage {
            version: WIRE_VERSION,
            command: Command::Add,
            mask: 24,
            addr: Ipv4Addr::new(10, 1, 2, 3),
            table: TableName::new("blocked").unwrap(),
            timestamp: 0x1122_3344,
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let msg = sample();
        let tag = AuthTag::from_bytes([0xAB; TAG_SIZE]);

        let wire = msg.encode(&tag);
        assert_eq!(wire.len(), MESSAGE_SIZE);

        let (decoded, decoded_tag) = ControlMessage::decode(&wire).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded_tag, tag);
    }

    #[test]
    fn test_wire_layout() {
        let msg = sample();
        let wire = msg.encode(&AuthTag::zero());

        assert_eq!(wire[0], WIRE_VERSION);
        assert_eq!(wire[1], 0x01); // add
        assert_eq!(wire[2], 0x00); // reserved
        assert_eq!(wire[3], 24);
        assert_eq!(&wire[4..8], &[10, 1, 2, 3]);
        assert_eq!(&wire[8..15], b"blocked");
        assert_eq!(&wire[40..44], &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(&wire[44..], &[0u8; TAG_SIZE]);
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        let wire = sample().encode(&AuthTag::zero());

        assert_eq!(
            ControlMessage::decode(&wire[..MESSAGE_SIZE - 1]),
            Err(WireError::Length(MESSAGE_SIZE - 1))
        );
        assert_eq!(ControlMessage::decode(&[]), Err(WireError::Length(0)));

        let mut long = wire.to_vec();
        long.push(0);
        assert_eq!(
            ControlMessage::decode(&long),
            Err(WireError::Length(MESSAGE_SIZE + 1))
        );
    }

    #[test]
    fn test_decode_rejects_unsupported_version() {
        let mut wire = sample().encode(&AuthTag::zero()).to_vec();
        wire[0] = WIRE_VERSION + 1;
        assert_eq!(
            ControlMessage::decode(&wire),
            Err(WireError::Version(WIRE_VERSION + 1))
        );

        wire[0] = 0;
        assert_eq!(ControlMessage::decode(&wire), Err(WireError::Version(0)));
    }

    #[test]
    fn test_decode_rejects_unknown_command() {
        let mut wire = sample().encode(&AuthTag::zero()).to_vec();
        wire[1] = 0x7F;
        assert_eq!(ControlMessage::decode(&wire), Err(WireError::Command(0x7F)));
    }

    #[test]
    fn test_legacy_version_forces_host_mask() {
        let mut wire = sample().encode(&AuthTag::zero()).to_vec();
        wire[0] = LEGACY_VERSION;
        wire[3] = 7; // garbage mask byte on the wire

        let (mut msg, _) = ControlMessage::decode(&wire).unwrap();
        msg.normalize();
        assert_eq!(msg.mask, 32);
    }

    #[test]
    fn test_normalize_keeps_current_version_mask() {
        let mut msg = sample();
        msg.normalize();
        assert_eq!(msg.mask, 24);
    }

    #[test]
    fn test_clean_mask() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        assert_eq!(clean_mask(addr, 24), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(clean_mask(addr, 32), addr);

        let addr = Ipv4Addr::new(192, 168, 255, 255);
        assert_eq!(clean_mask(addr, 16), Ipv4Addr::new(192, 168, 0, 0));
        assert_eq!(clean_mask(addr, 20), Ipv4Addr::new(192, 168, 240, 0));
        assert_eq!(clean_mask(addr, 1), Ipv4Addr::new(128, 0, 0, 0));

        // already-clean addresses stay unchanged
        let net = Ipv4Addr::new(172, 16, 0, 0);
        assert_eq!(clean_mask(net, 12), net);
    }

    #[test]
    fn test_table_name_bounds() {
        assert!(TableName::new(&"x".repeat(TABLE_NAME_SIZE)).is_ok());
        assert_eq!(
            TableName::new(&"x".repeat(TABLE_NAME_SIZE + 1)),
            Err(WireError::TableName(TABLE_NAME_SIZE + 1))
        );
    }

    #[test]
    fn test_table_name_display() {
        let name = TableName::new("spammers").unwrap();
        assert_eq!(name.to_string(), "spammers");

        // full-width name without a terminator
        let full = TableName::from_wire([b'a'; TABLE_NAME_SIZE]);
        assert_eq!(full.to_string().len(), TABLE_NAME_SIZE);
    }

    #[test]
    fn test_table_name_comparison_covers_whole_buffer() {
        let mut raw = [0u8; TABLE_NAME_SIZE];
        raw[..4].copy_from_slice(b"name");
        let clean = TableName::from_wire(raw);

        // same visible prefix, garbage after the NUL
        raw[10] = 0xFF;
        let dirty = TableName::from_wire(raw);

        assert_ne!(clean, dirty);
    }
}
