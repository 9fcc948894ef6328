//! Conversion between POSIX time and the device clock.
//!
//! The Viiiiva counts seconds since the ANT epoch, 1989-12-31T00:00:00Z.
//! ANT+ times are theoretically TAI seconds since that instant; TAI can
//! drift relative to UTC, but no adjustment is applied (for consistency
//! with the vendor's own app, which doesn't either).

/// The ANT epoch (1989-12-31) in seconds since 1970-01-01.
pub const DEVICE_EPOCH_OFFSET: i64 = 631_065_600;

/// Convert a POSIX timestamp to device seconds, wrapping modulo 2^32.
pub fn to_device(posix_time: i64) -> u32 {
    posix_time.wrapping_sub(DEVICE_EPOCH_OFFSET) as u32
}

/// Convert device seconds to a POSIX timestamp.
pub fn to_posix(device_time: u32) -> i64 {
    i64::from(device_time) + DEVICE_EPOCH_OFFSET
}
