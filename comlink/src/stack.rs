//! What the driver core needs from the IP stack.
//!
//! Every call hands the stack the interface's packet buffer. When the call returns,
//! a non-empty buffer holds a frame the driver must send.

use crate::buffer::PacketBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Answer of the poll hook to the stack.
pub enum PollAction {
    /// The driver can take another frame.
    Continue,
    /// The controller is full, stop polling.
    Stop,
}

/// Driver-side callback invoked by the stack each time it may have written a frame.
pub type PollHook<'a> = &'a mut dyn FnMut(&mut dyn LinkResolver, &mut PacketBuffer) -> PollAction;

/// Address resolution of outgoing frames.
pub trait LinkResolver {
    /// Fills in the link-layer header of the outgoing IP packet held by `buffer`.
    ///
    /// When the destination is not resolved yet, the packet is replaced by an ARP request.
    fn arp_out(&mut self, buffer: &mut PacketBuffer);
}

pub trait NetStack: LinkResolver {
    /// Processes a received IP frame.
    fn input(&mut self, buffer: &mut PacketBuffer);

    /// Updates the ARP cache from the source of a received IP frame.
    fn arp_ipin(&mut self, buffer: &mut PacketBuffer);

    /// Processes a received ARP frame. Requests are answered in place.
    fn arp_input(&mut self, buffer: &mut PacketBuffer);

    /// Lets every connection write its pending data, calling `hook` after each frame.
    fn poll(&mut self, buffer: &mut PacketBuffer, hook: PollHook<'_>);

    /// Same as `poll`, also advancing the stack's timers by `half_secs` half-seconds.
    fn timer_poll(&mut self, buffer: &mut PacketBuffer, hook: PollHook<'_>, half_secs: u16);
}
