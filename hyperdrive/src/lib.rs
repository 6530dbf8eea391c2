//! Hyperdrive holds the synchronization primitives shared by the comlink crates.
//!
//! The only locking primitive the driver core relies on is a critical section:
//! interrupts are masked for the duration of the lock, so that interrupt context
//! and task context never observe a half-updated device record.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]

pub mod locks;
