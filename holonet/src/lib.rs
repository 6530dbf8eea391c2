#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic, clippy::nursery)]
//! Holonet describes what travels on the wire: link-layer addressing and framing.
//!
//! The protocol stack proper lives above the driver; the driver only needs to
//! look at a frame's header to decide where it goes.

use thiserror::Error;

pub mod l2;
pub mod utils;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when decoding frames
pub enum NetworkError {
    #[error("Input is invalid")]
    /// The input is too short or malformed
    Invalid,
    #[error("Unsupported protocol")]
    /// The protocol field holds a value this crate does not know
    Unsupported,
}

pub type NetworkResult<T> = Result<T, NetworkError>;
