//! Byte order of the 4 byte length fields.
//!
//! Long lengths are always stored little endian so a blob written on one host
//! reads back unchanged on any other.

/// Converts a host order value into storage order.
#[inline]
pub const fn to_storage_order(value: u32) -> u32 {
    value.to_le()
}

/// Converts a storage order value back into host order.
#[inline]
pub const fn from_storage_order(value: u32) -> u32 {
    u32::from_le(value)
}
