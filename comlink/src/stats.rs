/// Per-interface traffic counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Statistics {
    /// Frames drained from the controller.
    pub rx_packets: u64,
    /// Frames of the configured IP family handed to the stack.
    pub rx_ip: u64,
    /// ARP frames handed to the stack.
    pub rx_arp: u64,
    /// Frames lost to controller errors, or too short or too long.
    pub rx_errors: u64,
    /// Frames of an unhandled protocol.
    pub rx_dropped: u64,
    /// Frames handed to the controller.
    pub tx_packets: u64,
    /// Transmit completions.
    pub tx_done: u64,
    /// Frames the controller refused.
    pub tx_errors: u64,
    /// Replies dropped because the controller had no room.
    pub tx_dropped: u64,
    pub tx_timeouts: u64,
}

impl Statistics {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            rx_packets: 0,
            rx_ip: 0,
            rx_arp: 0,
            rx_errors: 0,
            rx_dropped: 0,
            tx_packets: 0,
            tx_done: 0,
            tx_errors: 0,
            tx_dropped: 0,
            tx_timeouts: 0,
        }
    }
}
