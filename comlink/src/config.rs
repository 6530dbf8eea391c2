//! Driver configuration.
//!
//! Durations are expressed in ticks of the embedding kernel's timer, the same
//! unit `Comlink::on_tick` is fed with.

use crate::{
    error::{ComlinkError, ComlinkResult},
    watchdog::Tick,
};
use core::num::NonZeroU32;
use holonet::l2::ethernet::{EtherType, HEADER_LEN};

/// Default timer frequency.
pub const TICKS_PER_SEC: u32 = 100;
/// Default period of the poll timer, in seconds.
pub const POLL_INTERVAL_SECS: u32 = 1;
/// Default time handed to the stack on each periodic poll, in half-seconds.
pub const POLL_HALF_SECS: u16 = 2;
/// Default delay before a transmit with no completion is considered stalled, in seconds.
pub const TX_TIMEOUT_SECS: u32 = 60;

pub const DEFAULT_MTU: usize = 1500;
/// Smallest MTU an IPv4 host must accept.
pub const MIN_MTU: usize = 68;
/// Jumbo frames.
pub const MAX_MTU: usize = 9000;

/// Timers available to the driver. Each interface uses two.
pub const DEFAULT_TIMER_CAPACITY: usize = 32;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
/// Network-layer protocol the stack is built for.
pub enum IpFamily {
    #[default]
    V4,
    V6,
}

impl IpFamily {
    #[must_use]
    #[inline]
    pub const fn ethertype(self) -> EtherType {
        match self {
            Self::V4 => EtherType::IpV4,
            Self::V6 => EtherType::IpV6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Period of the poll timer.
    pub poll_interval_ticks: Tick,
    /// Elapsed time reported to the stack on each periodic poll.
    pub poll_half_secs: u16,
    /// Delay after which an uncompleted transmit resets the controller.
    pub tx_timeout_ticks: Tick,
    /// Largest payload carried by a frame, excluding the link-layer header.
    pub mtu: usize,
    pub ip_family: IpFamily,
    /// Consecutive transmit timeouts after which the interface is brought down.
    ///
    /// `None` retries forever.
    pub max_consecutive_timeouts: Option<NonZeroU32>,
    /// Size of the timer pool.
    pub timer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_tick_rate(TICKS_PER_SEC)
    }
}

impl Config {
    #[must_use]
    /// Default configuration for a timer running at `ticks_per_sec`.
    pub const fn with_tick_rate(ticks_per_sec: u32) -> Self {
        Self {
            poll_interval_ticks: ticks_per_sec as Tick * POLL_INTERVAL_SECS as Tick,
            poll_half_secs: POLL_HALF_SECS,
            tx_timeout_ticks: ticks_per_sec as Tick * TX_TIMEOUT_SECS as Tick,
            mtu: DEFAULT_MTU,
            ip_family: IpFamily::V4,
            max_consecutive_timeouts: None,
            timer_capacity: DEFAULT_TIMER_CAPACITY,
        }
    }

    #[must_use]
    #[inline]
    /// Size of the packet buffer: a full frame with its header.
    pub const fn frame_capacity(&self) -> usize {
        self.mtu + HEADER_LEN
    }

    /// Checks that every value can drive the timers and the buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a period is zero or the MTU is out of bounds.
    pub fn validate(&self) -> ComlinkResult<()> {
        let valid = self.poll_interval_ticks > 0
            && self.tx_timeout_ticks > 0
            && (MIN_MTU..=MAX_MTU).contains(&self.mtu);

        if valid {
            Ok(())
        } else {
            Err(ComlinkError::InvalidConfig)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.poll_interval_ticks, 100);
        assert_eq!(config.tx_timeout_ticks, 6000);
        assert_eq!(config.frame_capacity(), 1514);
        assert_eq!(config.ip_family.ethertype(), EtherType::IpV4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tick_rate() {
        let config = Config::with_tick_rate(1000);
        assert_eq!(config.poll_interval_ticks, 1000);
        assert_eq!(config.tx_timeout_ticks, 60_000);
        assert_eq!(config.poll_half_secs, 2);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            Config::with_tick_rate(0).validate(),
            Err(ComlinkError::InvalidConfig)
        );

        let mut config = Config::default();
        config.mtu = MIN_MTU - 1;
        assert!(config.validate().is_err());
        config.mtu = MAX_MTU;
        assert!(config.validate().is_ok());
        config.mtu = MAX_MTU + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tx_timeout_ticks = 0;
        assert!(config.validate().is_err());
    }
}
