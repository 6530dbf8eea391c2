//! Link layer.

pub mod ethernet;
