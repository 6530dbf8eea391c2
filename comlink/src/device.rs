use crate::{
    buffer::PacketBuffer,
    nic::Nic,
    stack::NetStack,
    stats::Statistics,
    watchdog::TimerHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Index of an interface, in the order the controllers were handed to `Comlink::new`.
pub struct DeviceId(usize);

impl DeviceId {
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "eth{}", self.0)
    }
}

/// State of one interface.
///
/// Only ever reached through the interface's lock.
pub struct Device<N, S> {
    pub(crate) id: DeviceId,
    pub(crate) nic: N,
    pub(crate) stack: S,
    pub(crate) buffer: PacketBuffer,
    pub(crate) stats: Statistics,
    /// Set between `ifup` and `ifdown`.
    pub(crate) link_up: bool,
    /// A frame was handed to the controller and neither its completion nor its timeout happened.
    pub(crate) tx_outstanding: bool,
    pub(crate) consecutive_timeouts: u32,
    pub(crate) poll_timer: TimerHandle,
    pub(crate) tx_timeout_timer: TimerHandle,
}

impl<N: Nic, S: NetStack> Device<N, S> {
    pub(crate) fn new(
        id: DeviceId,
        nic: N,
        stack: S,
        buffer_capacity: usize,
        poll_timer: TimerHandle,
        tx_timeout_timer: TimerHandle,
    ) -> Self {
        Self {
            id,
            nic,
            stack,
            buffer: PacketBuffer::new(buffer_capacity),
            stats: Statistics::new(),
            link_up: false,
            tx_outstanding: false,
            consecutive_timeouts: 0,
            poll_timer,
            tx_timeout_timer,
        }
    }

    #[must_use]
    #[inline]
    pub const fn id(&self) -> DeviceId {
        self.id
    }

    #[must_use]
    #[inline]
    pub const fn nic(&self) -> &N {
        &self.nic
    }

    #[must_use]
    #[inline]
    pub const fn stack(&self) -> &S {
        &self.stack
    }

    #[must_use]
    #[inline]
    pub const fn buffer(&self) -> &PacketBuffer {
        &self.buffer
    }

    #[must_use]
    #[inline]
    pub const fn statistics(&self) -> &Statistics {
        &self.stats
    }

    #[must_use]
    #[inline]
    pub const fn is_up(&self) -> bool {
        self.link_up
    }

    #[must_use]
    #[inline]
    pub const fn tx_outstanding(&self) -> bool {
        self.tx_outstanding
    }

    #[must_use]
    #[inline]
    pub const fn poll_timer(&self) -> TimerHandle {
        self.poll_timer
    }

    #[must_use]
    #[inline]
    pub const fn tx_timeout_timer(&self) -> TimerHandle {
        self.tx_timeout_timer
    }
}
