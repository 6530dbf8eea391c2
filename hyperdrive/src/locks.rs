//! Locks related utilities.
//!
//! ## Modules
//!
//! - `irq` : Provides a ticket lock that masks interrupts while it is held.
//!
//! ## Interrupt masking
//!
//! Code running in interrupt context and code running in task context share
//! state. Spinning on a lock that the interrupted code already holds would
//! deadlock, so every acquisition first saves and disables interrupts through
//! an `InterruptMask` implementation and restores them once released.
//!
//! Hosted builds (and tests) have no interrupt controller: `NoMask` is the
//! default and only serializes through the ticket lock itself.
//!
//! ## Back-off Strategy
//!
//! `BackOff` defines what a thread does while it waits for its ticket.
//! The default, `Spin`, is a spin-wait loop.

pub mod irq;

/// A trait that defines a back-off strategy for locks.
pub trait BackOff {
    /// Performs the back-off operation.
    fn back_off();
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A back-off strategy that uses `core::hint::spin_loop`.
pub struct Spin;

impl BackOff for Spin {
    #[inline]
    fn back_off() {
        core::hint::spin_loop();
    }
}

/// Saves, disables and restores the interrupt state of the current CPU.
///
/// Implementations must make `restore` undo exactly one `save_and_disable`,
/// so that nested critical sections only re-enable interrupts at the outermost level.
pub trait InterruptMask {
    /// Opaque snapshot of the interrupt state before it was disabled.
    type State: Copy;

    /// Disables interrupts and returns the previous state.
    fn save_and_disable() -> Self::State;

    /// Restores a state returned by `save_and_disable`.
    fn restore(state: Self::State);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// An interrupt mask that does nothing.
///
/// Used where interrupts are simulated, e.g. in hosted tests.
pub struct NoMask;

impl InterruptMask for NoMask {
    type State = ();

    #[inline]
    fn save_and_disable() -> Self::State {}

    #[inline]
    fn restore((): Self::State) {}
}
