//! One-shot timers driven by the kernel tick.
//!
//! Timers are allocated once from a fixed-size pool and then armed, rearmed and
//! cancelled any number of times. Armed timers sit in a min-heap keyed by their
//! deadline. Rearming or cancelling bumps the timer's generation instead of
//! searching the heap: outdated entries are skipped when they surface, and
//! purged once they would grow the heap past twice the pool size.
//!
//! Callbacks are plain functions receiving a shared context and the argument
//! given when the timer was armed. `expire` runs them with the watchdog unlocked,
//! so a callback may rearm its own timer.

use crate::error::{WatchdogError, WatchdogResult};
use alloc::{collections::binary_heap::BinaryHeap, vec::Vec};
use core::cmp::Reverse;
use hyperdrive::locks::{BackOff, InterruptMask, irq::IrqLock};

/// Absolute time, in kernel ticks.
pub type Tick = u64;

/// Function run when a timer expires.
pub type Callback<C, A> = fn(&C, A);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u32);

struct Armed<C, A> {
    deadline: Tick,
    callback: Callback<C, A>,
    arg: A,
}

struct Slot<C, A> {
    generation: u64,
    armed: Option<Armed<C, A>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Expiry {
    deadline: Tick,
    /// Breaks ties in arming order.
    seq: u64,
    handle: TimerHandle,
    generation: u64,
}

pub struct Watchdog<C, A> {
    now: Tick,
    capacity: usize,
    slots: Vec<Slot<C, A>>,
    queue: BinaryHeap<Reverse<Expiry>>, // Min-heap via Reverse.
    next_seq: u64,
}

impl<C, A: Copy> Watchdog<C, A> {
    #[must_use]
    #[inline]
    pub const fn new(capacity: usize) -> Self {
        Self {
            now: 0,
            capacity,
            slots: Vec::new(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    #[must_use]
    #[inline]
    /// Time of the latest expiry pass.
    pub const fn now(&self) -> Tick {
        self.now
    }

    /// Allocates an unarmed timer.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` once the pool is used up.
    pub fn create(&mut self) -> WatchdogResult<TimerHandle> {
        if self.slots.len() >= self.capacity {
            return Err(WatchdogError::Exhausted);
        }
        let handle =
            TimerHandle(u32::try_from(self.slots.len()).map_err(|_| WatchdogError::Exhausted)?);
        self.slots.push(Slot {
            generation: 0,
            armed: None,
        });
        // Arming never allocates.
        self.queue
            .reserve((2 * self.slots.len()).saturating_sub(self.queue.len()));
        Ok(handle)
    }

    /// Arms `handle` to run `callback(ctx, arg)` `delay` ticks from now.
    ///
    /// A pending expiry is replaced. A zero delay is rounded up to one tick,
    /// so that a callback rearming its own timer never runs twice in the same pass.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTimer` if `handle` was not created by this watchdog.
    pub fn start(
        &mut self,
        handle: TimerHandle,
        delay: Tick,
        callback: Callback<C, A>,
        arg: A,
    ) -> WatchdogResult<()> {
        let deadline = self.now.saturating_add(delay.max(1));
        Self::slot_mut(&mut self.slots, handle)?;

        if self.queue.len() >= 2 * self.slots.len() {
            self.purge();
        }

        let slot = Self::slot_mut(&mut self.slots, handle)?;

        slot.generation += 1;
        slot.armed = Some(Armed {
            deadline,
            callback,
            arg,
        });

        self.queue.push(Reverse(Expiry {
            deadline,
            seq: self.next_seq,
            handle,
            generation: slot.generation,
        }));
        self.next_seq += 1;

        Ok(())
    }

    /// Disarms `handle`. Returns whether an expiry was pending.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTimer` if `handle` was not created by this watchdog.
    pub fn cancel(&mut self, handle: TimerHandle) -> WatchdogResult<bool> {
        let slot = Self::slot_mut(&mut self.slots, handle)?;
        let was_armed = slot.armed.take().is_some();
        if was_armed {
            slot.generation += 1;
        }
        Ok(was_armed)
    }

    /// # Errors
    ///
    /// Returns `UnknownTimer` if `handle` was not created by this watchdog.
    pub fn is_armed(&self, handle: TimerHandle) -> WatchdogResult<bool> {
        Ok(self.deadline(handle)?.is_some())
    }

    /// # Errors
    ///
    /// Returns `UnknownTimer` if `handle` was not created by this watchdog.
    pub fn deadline(&self, handle: TimerHandle) -> WatchdogResult<Option<Tick>> {
        self.slots
            .get(handle.0 as usize)
            .map(|slot| slot.armed.as_ref().map(|armed| armed.deadline))
            .ok_or(WatchdogError::UnknownTimer)
    }

    #[must_use]
    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|slot| slot.armed.is_some()).count()
    }

    /// Advances the clock to `now` and disarms the earliest timer due by then.
    fn pop_due(&mut self, now: Tick) -> Option<(Callback<C, A>, A)> {
        self.now = self.now.max(now);

        loop {
            let Reverse(expiry) = self.queue.peek()?;
            if expiry.deadline > self.now {
                return None;
            }

            let Reverse(expiry) = self.queue.pop()?;
            let Some(slot) = self.slots.get_mut(expiry.handle.0 as usize) else {
                continue;
            };
            if slot.generation != expiry.generation {
                continue;
            }
            if let Some(armed) = slot.armed.take() {
                slot.generation += 1;
                return Some((armed.callback, armed.arg));
            }
        }
    }

    /// Drops the heap entries of cancelled or rearmed timers.
    fn purge(&mut self) {
        let slots = &self.slots;
        self.queue.retain(|Reverse(expiry)| {
            slots
                .get(expiry.handle.0 as usize)
                .is_some_and(|slot| slot.armed.is_some() && slot.generation == expiry.generation)
        });
    }

    fn slot_mut(slots: &mut [Slot<C, A>], handle: TimerHandle) -> WatchdogResult<&mut Slot<C, A>> {
        slots
            .get_mut(handle.0 as usize)
            .ok_or(WatchdogError::UnknownTimer)
    }
}

/// Runs every timer due by `now`, in deadline order, and returns how many ran.
///
/// The lock is only held to pick the next timer: callbacks run unlocked.
pub fn expire<C, A, M, B>(timers: &IrqLock<Watchdog<C, A>, M, B>, now: Tick, ctx: &C) -> usize
where
    A: Copy,
    M: InterruptMask,
    B: BackOff,
{
    let mut fired = 0;
    while let Some((callback, arg)) = timers.with_locked(|watchdog| watchdog.pop_due(now)) {
        callback(ctx, arg);
        fired += 1;
    }
    fired
}
