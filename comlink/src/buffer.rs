//! The packet buffer shared by the receive and transmit paths.
//!
//! Each interface owns exactly one buffer. A received frame is processed in place,
//! and the stack writes its reply (or any outgoing frame) over it. Whatever the
//! buffer holds when the stack returns is sent: a non-empty buffer means
//! "there is a frame to transmit".

use crate::error::NicError;
use alloc::{boxed::Box, vec};
use holonet::{NetworkError, NetworkResult};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
/// What the buffer currently holds.
pub enum BufferState {
    #[default]
    Empty,
    /// A received frame being processed.
    Inbound,
    /// A frame waiting to be sent.
    Outbound,
}

#[derive(Debug)]
pub struct PacketBuffer {
    storage: Box<[u8]>,
    len: usize,
    state: BufferState,
}

impl PacketBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0; capacity].into_boxed_slice(),
            len: 0,
            state: BufferState::Empty,
        }
    }

    #[must_use]
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    #[inline]
    pub const fn state(&self) -> BufferState {
        self.state
    }

    #[must_use]
    #[inline]
    /// The frame currently held.
    pub fn frame(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    #[must_use]
    #[inline]
    pub fn frame_mut(&mut self) -> &mut [u8] {
        &mut self.storage[..self.len]
    }

    /// Claims the first `len` bytes for an outgoing frame.
    ///
    /// The previous content is left in place, so that a reply can be built over
    /// the frame it answers.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if `len` exceeds the capacity.
    pub fn prepare(&mut self, len: usize) -> NetworkResult<&mut [u8]> {
        if len > self.capacity() {
            return Err(NetworkError::Invalid);
        }
        self.len = len;
        self.state = if len == 0 {
            BufferState::Empty
        } else {
            BufferState::Outbound
        };
        Ok(&mut self.storage[..len])
    }

    #[inline]
    /// Drops the frame held, if any.
    pub const fn clear(&mut self) {
        self.len = 0;
        self.state = BufferState::Empty;
    }

    /// Lets `receive` write a frame into the whole storage.
    ///
    /// On error the buffer is left empty.
    pub(crate) fn receive_with<F>(&mut self, receive: F) -> Result<usize, NicError>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, NicError>,
    {
        self.clear();
        let len = receive(&mut self.storage)?;
        if len > self.capacity() {
            return Err(NicError::Oversized);
        }
        self.len = len;
        if len > 0 {
            self.state = BufferState::Inbound;
        }
        Ok(len)
    }
}
