//! Register-level access to a network controller.

use crate::error::NicError;
use bitflags::bitflags;
use holonet::l2::ethernet::MacAddress;

bitflags! {
    /// Interrupt sources of a controller, used both as status and as mask.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interrupts: u32 {
        /// At least one frame was received.
        const RX = 1 << 0;
        /// A transmit completed.
        const TX_DONE = 1 << 1;
    }
}

/// Operations the driver core needs from a controller.
///
/// Implementations only touch registers: they never call back into the driver.
pub trait Nic {
    fn mac_address(&self) -> MacAddress;

    /// Interrupt line of the controller.
    fn irq(&self) -> u8;

    /// Installs the driver's handler on the controller's line, still masked.
    ///
    /// # Errors
    ///
    /// `Hardware` if the line cannot be attached.
    fn attach_irq(&mut self) -> Result<(), NicError>;

    /// Resets the chip and brings it back to a state ready to send and receive.
    ///
    /// Interrupt sources are masked after a reset.
    fn reset(&mut self);

    /// Unmasks the controller's line at the interrupt controller.
    fn enable_irq(&mut self);
    fn disable_irq(&mut self);

    /// Interrupt sources currently enabled on the controller.
    fn interrupt_mask(&self) -> Interrupts;
    fn set_interrupt_mask(&mut self, mask: Interrupts);

    /// Reads and acknowledges the pending interrupt sources.
    fn take_status(&mut self) -> Interrupts;

    /// Whether a received frame is waiting to be drained.
    fn rx_pending(&self) -> bool;

    /// Drains one received frame into `buffer` and returns its length.
    ///
    /// # Errors
    ///
    /// The frame is consumed even when an error is returned:
    /// `Oversized` if it does not fit in `buffer`, `Hardware` if the chip flagged it as bad.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, NicError>;

    /// Whether the controller can accept another frame.
    fn tx_ready(&self) -> bool;

    /// Hands a frame to the controller.
    ///
    /// # Errors
    ///
    /// `Busy` if there is no room, `Hardware` if the chip refused it.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), NicError>;
}
