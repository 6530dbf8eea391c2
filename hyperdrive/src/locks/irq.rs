//! Interrupt-safe ticket lock.
//!
//! `IrqLock` is a ticket lock whose guard also owns an interrupt-state snapshot.
//! Acquiring it disables interrupts first, then waits for the ticket;
//! dropping the guard releases the ticket, then restores interrupts.
//! Because the guard is a value, every exit path (early return, `?`, panic unwinding
//! in hosted builds) releases the critical section.
//!
//! ```rust
//! # use hyperdrive::locks::irq::IrqLock;
//! let lock = IrqLock::<u8>::new(0);
//!
//! lock.with_locked(|value| *value = 42);
//! assert_eq!(*lock.lock(), 42);
//! ```
//!
//! The lock is not reentrant: locking it again from the same context while a
//! guard is alive spins forever. Use `try_lock` where reentrance is possible.
//!
//! ```rust
//! # use hyperdrive::locks::irq::IrqLock;
//! let lock = IrqLock::<u8>::new(0);
//!
//! let guard = lock.lock();
//! assert!(lock.try_lock().is_none());
//! drop(guard);
//! assert!(lock.try_lock().is_some());
//! ```

use super::{BackOff, InterruptMask, NoMask, Spin};
use core::{
    cell::UnsafeCell,
    marker::PhantomData,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU32, Ordering},
};

/// A ticket lock that masks interrupts while held.
pub struct IrqLock<T, M: InterruptMask = NoMask, B: BackOff = Spin> {
    /// Ticket handed to the next acquirer.
    next_ticket: AtomicU32,
    /// Ticket currently allowed in the critical section.
    now_serving: AtomicU32,
    /// The inner data protected by the lock.
    data: UnsafeCell<T>,
    _strategy: PhantomData<(M, B)>,
}

// Safety:
// Access to `data` is serialized by the ticket protocol.
unsafe impl<T: Send, M: InterruptMask, B: BackOff> Send for IrqLock<T, M, B> {}
unsafe impl<T: Send, M: InterruptMask, B: BackOff> Sync for IrqLock<T, M, B> {}

impl<T: Default, M: InterruptMask, B: BackOff> Default for IrqLock<T, M, B> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, M: InterruptMask, B: BackOff> IrqLock<T, M, B> {
    #[must_use]
    #[inline]
    /// Creates a new unlocked lock.
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
            _strategy: PhantomData,
        }
    }

    #[must_use]
    /// Disables interrupts, then waits for the lock.
    pub fn lock(&self) -> IrqGuard<'_, T, M, B> {
        let saved = M::save_and_disable();

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != ticket {
            B::back_off();
        }

        IrqGuard { lock: self, saved }
    }

    #[must_use]
    /// Takes the lock only if nobody holds or waits for it.
    ///
    /// Interrupts are left untouched when the lock is not acquired.
    pub fn try_lock(&self) -> Option<IrqGuard<'_, T, M, B>> {
        let saved = M::save_and_disable();

        let serving = self.now_serving.load(Ordering::Acquire);
        if self
            .next_ticket
            .compare_exchange(
                serving,
                serving.wrapping_add(1),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
        {
            Some(IrqGuard { lock: self, saved })
        } else {
            M::restore(saved);
            None
        }
    }

    #[inline]
    /// Runs `f` inside the critical section.
    pub fn with_locked<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    #[inline]
    /// Runs `f` inside the critical section if the lock is free.
    pub fn try_with_locked<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> Option<R> {
        self.try_lock().map(|mut guard| f(&mut guard))
    }

    #[must_use]
    #[inline]
    /// Whether a guard is currently alive or a waiter is queued.
    pub fn is_locked(&self) -> bool {
        self.next_ticket.load(Ordering::Relaxed) != self.now_serving.load(Ordering::Relaxed)
    }

    #[must_use]
    #[inline]
    /// Exclusive access without locking, through an exclusive borrow of the lock.
    pub const fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[must_use]
    #[inline]
    /// Consumes the lock and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }

    #[inline]
    /// # Safety
    ///
    /// The caller must own the current ticket.
    unsafe fn unlock(&self) {
        self.now_serving.fetch_add(1, Ordering::Release);
    }
}

/// RAII guard of an `IrqLock`.
///
/// Dropping it releases the lock and restores the saved interrupt state.
pub struct IrqGuard<'l, T, M: InterruptMask, B: BackOff> {
    lock: &'l IrqLock<T, M, B>,
    saved: M::State,
}

impl<T, M: InterruptMask, B: BackOff> Drop for IrqGuard<'_, T, M, B> {
    #[inline]
    fn drop(&mut self) {
        // Safety: If the guard exists, we own the ticket.
        unsafe { self.lock.unlock() };
        M::restore(self.saved);
    }
}

impl<T, M: InterruptMask, B: BackOff> Deref for IrqGuard<'_, T, M, B> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // Safety: If the guard exists, we own the ticket.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, M: InterruptMask, B: BackOff> DerefMut for IrqGuard<'_, T, M, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // Safety: If the guard exists, we own the ticket.
        unsafe { &mut *self.lock.data.get() }
    }
}
