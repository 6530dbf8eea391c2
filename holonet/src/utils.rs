#[must_use]
#[inline]
/// Convert bytes into a u16 value in network byte order (big-endian).
pub const fn u16_from_inet_bytes(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

#[must_use]
#[inline]
/// Convert a u16 value into bytes in network byte order (big-endian).
pub const fn u16_to_inet_bytes(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}
