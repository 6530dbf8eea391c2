//! Ethernet II framing.
//!
//! NB: the `EtherType` field is big-endian on the wire, like every multi-byte header field.

use crate::{
    NetworkError, NetworkResult,
    utils::{u16_from_inet_bytes, u16_to_inet_bytes},
};
use core::ops::{Range, RangeFrom};

const DESTINATION: Range<usize> = 0..6;
const SOURCE: Range<usize> = 6..12;
const ETHERTYPE: Range<usize> = 12..14;
const PAYLOAD: RangeFrom<usize> = 14..;

/// Length of the Ethernet II header (no 802.1Q tag).
pub const HEADER_LEN: usize = PAYLOAD.start;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
/// Protocol carried by a frame.
pub enum EtherType {
    IpV4 = 0x0800,
    Arp = 0x0806,
    IpV6 = 0x86DD,
}

impl TryFrom<u16> for EtherType {
    type Error = NetworkError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        match raw {
            0x0800 => Ok(Self::IpV4),
            0x0806 => Ok(Self::Arp),
            0x86DD => Ok(Self::IpV6),
            _ => Err(NetworkError::Unsupported),
        }
    }
}

impl From<EtherType> for u16 {
    #[inline]
    fn from(value: EtherType) -> Self {
        value as Self
    }
}

/// A six-octet hardware address.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The broadcast address.
    pub const BROADCAST: Self = Self([0xff; 6]);
    /// The all-zero address, reported by controllers without a programmed address.
    pub const UNSPECIFIED: Self = Self([0; 6]);

    #[must_use]
    #[inline]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    #[must_use]
    #[inline]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    #[must_use]
    #[inline]
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    #[must_use]
    #[inline]
    /// Whether the group bit of the first octet is set.
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    #[must_use]
    #[inline]
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }
}

impl From<[u8; 6]> for MacAddress {
    #[inline]
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl core::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// A read/write view over a buffer holding an Ethernet II frame.
#[derive(Debug, Clone)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    #[must_use]
    #[inline]
    /// Wraps a buffer without checking its length.
    ///
    /// Accessors panic if the buffer is shorter than `HEADER_LEN`.
    pub const fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// # Errors
    ///
    /// Returns `Invalid` if the buffer cannot hold a header.
    pub fn new(buffer: T) -> NetworkResult<Self> {
        if buffer.as_ref().len() < HEADER_LEN {
            return Err(NetworkError::Invalid);
        }
        Ok(Self::new_unchecked(buffer))
    }

    #[must_use]
    #[inline]
    pub fn into_inner(self) -> T {
        self.buffer
    }

    #[must_use]
    pub fn dst_addr(&self) -> MacAddress {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[DESTINATION]);
        MacAddress(bytes)
    }

    #[must_use]
    pub fn src_addr(&self) -> MacAddress {
        let mut bytes = [0; 6];
        bytes.copy_from_slice(&self.buffer.as_ref()[SOURCE]);
        MacAddress(bytes)
    }

    #[must_use]
    #[inline]
    /// The raw type field, which may not be a known `EtherType`.
    pub fn ethertype_raw(&self) -> u16 {
        let mut bytes = [0; 2];
        bytes.copy_from_slice(&self.buffer.as_ref()[ETHERTYPE]);
        u16_from_inet_bytes(bytes)
    }

    /// # Errors
    ///
    /// Returns `Unsupported` for any type field other than IPv4, IPv6 and ARP.
    #[inline]
    pub fn ethertype(&self) -> NetworkResult<EtherType> {
        EtherType::try_from(self.ethertype_raw())
    }

    #[must_use]
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[PAYLOAD]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    #[inline]
    pub fn set_dst_addr(&mut self, value: MacAddress) {
        self.buffer.as_mut()[DESTINATION].copy_from_slice(&value.0);
    }

    #[inline]
    pub fn set_src_addr(&mut self, value: MacAddress) {
        self.buffer.as_mut()[SOURCE].copy_from_slice(&value.0);
    }

    #[inline]
    pub fn set_ethertype(&mut self, value: EtherType) {
        self.buffer.as_mut()[ETHERTYPE].copy_from_slice(&u16_to_inet_bytes(value.into()));
    }

    #[must_use]
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[PAYLOAD]
    }
}

impl<T: AsRef<[u8]>> AsRef<[u8]> for Frame<T> {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}
