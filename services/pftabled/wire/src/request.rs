//! Sender-side request construction.
//!
//! Builds the final wire bytes for one command: stamps the current time,
//! encodes the message, and signs it when a key is configured. Unsigned
//! requests carry an all-zero digest. Mask normalization stays the
//! receiver's job, but a well-formed sender never emits a prefix length
//! outside 1..=32 for Add/Remove.

use crate::auth::{self, AuthKey, AuthTag};
use crate::error::WireError;
use crate::freshness::unix_now;
use crate::message::{Command, ControlMessage, TableName, WIRE_VERSION};
use bytes::Bytes;
use std::net::Ipv4Addr;

/// Build a request datagram stamped with the current time
pub fn build_request(
    command: Command,
    table: TableName,
    addr: Ipv4Addr,
    mask: u8,
    key: Option<&AuthKey>,
) -> Result<Bytes, WireError> {
    build_request_at(command, table, addr, mask, unix_now(), key)
}

/// Build a request datagram with an explicit timestamp
pub fn build_request_at(
    command: Command,
    table: TableName,
    addr: Ipv4Addr,
    mask: u8,
    timestamp: u32,
    key: Option<&AuthKey>,
) -> Result<Bytes, WireError> {
    if command != Command::Flush && !(1..=32).contains(&mask) {
        return Err(WireError::Mask(mask));
    }

    let msg = ControlMessage {
        version: WIRE_VERSION,
        command,
        mask,
        addr,
        table,
        timestamp,
    };

    let tag = match key {
        Some(key) => auth::sign(key, &msg.signed_bytes()),
        None => AuthTag::zero(),
    };

    Ok(msg.encode(&tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AUTH_KEY_SIZE;
    use crate::message::{MESSAGE_SIZE, SIGNED_LEN};

    fn test_key() -> AuthKey {
        AuthKey::from_slice(&[7u8; AUTH_KEY_SIZE]).unwrap()
    }

    #[test]
    fn test_signed_request_verifies() {
        let key = test_key();
        let table = TableName::new("blocked").unwrap();
        let wire = build_request_at(
            Command::Add,
            table,
            Ipv4Addr::new(192, 168, 1, 5),
            32,
            1234,
            Some(&key),
        )
        .unwrap();

        assert_eq!(wire.len(), MESSAGE_SIZE);
        let (msg, tag) = ControlMessage::decode(&wire).unwrap();
        assert_eq!(msg.command, Command::Add);
        assert_eq!(msg.addr, Ipv4Addr::new(192, 168, 1, 5));
        assert_eq!(msg.timestamp, 1234);
        assert!(auth::verify(&key, &wire[..SIGNED_LEN], &tag));
    }

    #[test]
    fn test_unsigned_request_has_zero_digest() {
        let table = TableName::new("t").unwrap();
        let wire =
            build_request_at(Command::Remove, table, Ipv4Addr::new(10, 0, 0, 1), 24, 1, None)
                .unwrap();
        let (_, tag) = ControlMessage::decode(&wire).unwrap();
        assert_eq!(tag, AuthTag::zero());
    }

    #[test]
    fn test_sender_rejects_bad_mask() {
        let table = TableName::new("t").unwrap();
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        assert_eq!(
            build_request_at(Command::Add, table, addr, 0, 1, None),
            Err(WireError::Mask(0))
        );
        assert_eq!(
            build_request_at(Command::Remove, table, addr, 33, 1, None),
            Err(WireError::Mask(33))
        );
    }

    #[test]
    fn test_flush_ignores_mask() {
        let table = TableName::new("t").unwrap();
        let wire =
            build_request_at(Command::Flush, table, Ipv4Addr::UNSPECIFIED, 0, 1, None).unwrap();
        let (msg, _) = ControlMessage::decode(&wire).unwrap();
        assert_eq!(msg.command, Command::Flush);
    }
}
