//! Filter table backend implementations.

pub mod mem;
pub mod pfctl;
