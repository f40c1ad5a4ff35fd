//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Datagram length does not match the fixed message size
    #[error("bad datagram length: {0}")]
    Length(usize),

    /// Unsupported protocol version
    #[error("version unsupported: {0}")]
    Version(u8),

    /// Unknown command code
    #[error("unknown command {0}")]
    Command(u8),

    /// Prefix length outside 1..=32
    #[error("mask out of range: {0}")]
    Mask(u8),

    /// Table name longer than the fixed buffer
    #[error("table name too long: {0} bytes")]
    TableName(usize),

    /// Authentication key has the wrong length
    #[error("key must be {expected} bytes, got {actual}")]
    KeyLength {
        /// Required key length in bytes
        expected: usize,
        /// Length actually supplied
        actual: usize,
    },
}
