//! Timestamp freshness checking.
//!
//! The only replay defense is a bounded clock-skew window: a message is
//! fresh iff its timestamp is no further than the skew budget behind the
//! receiver's clock. There is no nonce or sequence number, so identical
//! messages inside the window are all accepted; that is a deliberate
//! trade-off of the protocol, not a gap.

use std::time::{SystemTime, UNIX_EPOCH};

/// Default maximum clock difference plus network delay in seconds between
/// sender and receiver. The receiver drops the message if exceeded.
pub const MAX_CLOCK_SKEW_SECS: u32 = 60;

/// Check whether a message timestamp is within the skew window.
///
/// Uses wrapping subtraction at the wire integer width, so a timestamp from
/// the "future" (sender clock ahead, or epoch wraparound) computes a large
/// difference and is rejected rather than underflowing.
pub fn is_fresh(timestamp: u32, now: u32, max_skew: u32) -> bool {
    now.wrapping_sub(timestamp) <= max_skew
}

/// Current time as seconds since the Unix epoch at wire width
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default()
}
