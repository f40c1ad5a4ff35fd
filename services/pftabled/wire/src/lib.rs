//! Wire protocol for the pftabled control channel.
//!
//! This crate implements the single-datagram command protocol spoken between
//! `pftabled-client` and the `pftabled` daemon: the fixed 64-byte message
//! layout, the keyed authentication tag covering it, and the timestamp
//! freshness check bounding replay exposure.
//!
//! ## Wire Format
//!
//! ```text
//! +-------------+--------------------------------------+
//! | version  u8 | protocol version (currently 2)       |
//! | command  u8 | 1=add, 2=del, 3=flush                |
//! | reserved u8 | must be zero on send, ignored        |
//! | mask     u8 | CIDR prefix length (1..=32)          |
//! | address  u32| IPv4 address, big-endian             |
//! | table    32B| table name, fixed width, no NUL req. |
//! | timestamp u32| seconds since Unix epoch, big-endian|
//! | digest   20B| HMAC-SHA1 over the 44 bytes above    |
//! +-------------+--------------------------------------+
//! ```
//!
//! All components here are pure and stateless; encoding, signing and
//! verification are safe to reuse across calls without synchronization.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod error;
pub mod freshness;
pub mod message;
pub mod request;

pub use auth::{sign, verify, AuthKey, AuthTag, AUTH_KEY_SIZE, TAG_SIZE};
pub use error::WireError;
pub use freshness::{is_fresh, unix_now, MAX_CLOCK_SKEW_SECS};
pub use message::{
    clean_mask, Command, ControlMessage, TableName, LEGACY_VERSION, MESSAGE_SIZE, SIGNED_LEN,
    TABLE_NAME_SIZE, WIRE_VERSION,
};
pub use request::{build_request, build_request_at};
