//! Comlink sits between a network controller and an IP stack.
//!
//! It owns one shared packet buffer per interface and decides when frames move
//! in either direction:
//!
//! - the interrupt dispatcher drains received frames into the stack and sends its replies,
//! - the poll timer and `tx_available` let the stack push outgoing traffic,
//! - the transmit timeout resets a stalled controller.
//!
//! Hardware is reached through the `Nic` trait and the stack through `NetStack`,
//! so that the core can be driven by a real kernel as well as by mocks.
//!
//! The embedding kernel wires its IRQ handler to `Comlink::on_interrupt`
//! and its tick source to `Comlink::on_tick`, and installs a `log` logger.
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]

extern crate alloc;

pub mod buffer;
pub mod config;
mod device;
mod driver;
pub mod error;
pub mod nic;
pub mod stack;
pub mod stats;
pub mod watchdog;

pub use device::{Device, DeviceId};
pub use driver::Comlink;
pub use error::{ComlinkError, ComlinkResult};
