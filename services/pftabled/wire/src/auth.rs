//! Keyed message authentication.
//!
//! Tags are HMAC-SHA1 over the signed region of the wire message, computed
//! with a fixed 20-byte shared key. The key is loaded once at start-up and
//! never travels on the wire. Verification recomputes the tag from scratch
//! and compares in constant time.

use crate::error::WireError;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

/// Shared authentication key length in bytes (one SHA-1 digest)
pub const AUTH_KEY_SIZE: usize = 20;

/// Authentication tag length in bytes
pub const TAG_SIZE: usize = 20;

/// Fixed-length shared secret.
///
/// Held for the process lifetime; both sides must load the same bytes
/// out-of-band.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthKey([u8; AUTH_KEY_SIZE]);

impl AuthKey {
    /// Create a key from raw bytes, failing on any length other than
    /// [`AUTH_KEY_SIZE`]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let raw: [u8; AUTH_KEY_SIZE] =
            bytes.try_into().map_err(|_| WireError::KeyLength {
                expected: AUTH_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(raw))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; AUTH_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never log key material
        write!(f, "AuthKey(..)")
    }
}

/// Authentication tag carried in the digest field of a message
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AuthTag([u8; TAG_SIZE]);

impl AuthTag {
    /// All-zero tag, used for unsigned messages
    pub fn zero() -> Self {
        Self([0u8; TAG_SIZE])
    }

    /// Wrap raw tag bytes
    pub fn from_bytes(bytes: [u8; TAG_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw tag bytes
    pub fn as_bytes(&self) -> &[u8; TAG_SIZE] {
        &self.0
    }
}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthTag(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Compute the tag over an encoded signed region
pub fn sign(key: &AuthKey, data: &[u8]) -> AuthTag {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    AuthTag(mac.finalize().into_bytes().into())
}

/// Verify a received tag against an independent recomputation.
///
/// Constant-time comparison of the full tag; callers learn only pass/fail.
pub fn verify(key: &AuthKey, data: &[u8], tag: &AuthTag) -> bool {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.verify_slice(tag.as_bytes()).is_ok()
}
