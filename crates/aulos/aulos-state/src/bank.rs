//! Multi-slot state publication: two independent writer lanes, one realtime
//! reader.
//!
//! Where [`pair`](crate::pair) serializes all writers behind one staging
//! slot, the bank gives each writer stream its own *lane*. Lanes stage
//! concurrently; each lane's update is promoted individually, and the most
//! recently promoted lane defines the current state.
//!
//! # Protocol
//!
//! The packed counter holds four bytes (see `counter`): the current slot id,
//! one "written" flag per lane, and a switch ticket.
//!
//! **Writer on lane `p`** (`begin_write(p)` / `end_write(p)`):
//! 1. CAS `written(p) := 0`, reserving lane `p`'s staging slot and
//!    discarding any unconsumed update on that lane.
//! 2. If the flag was already clear (slot freshly recycled by a switch, or
//!    never written), reseed the staging slot from the current slot.
//! 3. Mutate in place, then CAS `written(p) := 1`.
//!
//! **Reader** (`try_switch(p)`): if `written(p)` is set, CAS in one step:
//! current slot := lane `p`'s staging slot, `written(p) := 0`, ticket += 1.
//!
//! # Slot rotation
//!
//! Lane `p` stages into slot `p`, except when slot `p` is current, in which
//! case it stages into slot 0 (see `counter::staging_slot` for the full
//! table). A successful switch therefore recycles the previously current
//! slot as the lane's next staging slot.
//!
//! One consequence bounds the usage contract: a write region on lane `p`
//! opened while `p` is current stages into slot 0, and slot 0 becomes
//! current again only after two further switches on the other lane. Write
//! regions must be short relative to the switch cadence (in the server,
//! switches happen once per cycle and regions are a few field stores), so
//! the window does not arise.

use crate::counter::{BankCounter, staging_slot};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of physical slots.
pub const BANK_SLOTS: usize = 3;

/// Number of writer lanes. Lane ids are `1..=BANK_LANES`.
pub const BANK_LANES: usize = 2;

/// A three-slot state cell with two independently promoted writer lanes.
///
/// # Contracts
///
/// At most one thread at a time may run write regions on a given lane, and
/// at most one thread at a time may act as the switching reader; distinct
/// lanes may be driven from distinct threads concurrently. Any number of
/// threads may use [`read_coherent`](Self::read_coherent).
///
/// References returned by [`read_current`](Self::read_current)/
/// [`try_switch`](Self::try_switch) must be dropped before the reader's next
/// switch.
pub struct StateBank<T: Copy> {
    slots: [UnsafeCell<T>; BANK_SLOTS],
    counter: CachePadded<AtomicU32>,
}

// SAFETY: slot access follows the lane protocol above; the counter word is
// the only cross-thread mutable state outside reserved slots, and it is
// atomic.
unsafe impl<T: Copy + Send> Sync for StateBank<T> {}

impl<T: Copy> StateBank<T> {
    /// Creates the bank with every slot holding `initial`. Slot 0 is
    /// current; no lane has a staged update.
    pub fn new(initial: T) -> Self {
        Self {
            slots: [
                UnsafeCell::new(initial),
                UnsafeCell::new(initial),
                UnsafeCell::new(initial),
            ],
            counter: CachePadded::new(AtomicU32::new(0)),
        }
    }

    #[inline(always)]
    fn snapshot(&self) -> BankCounter {
        BankCounter(self.counter.load(Ordering::SeqCst))
    }

    #[inline(always)]
    fn slot_ptr(&self, idx: usize) -> *mut T {
        self.slots[idx].get()
    }

    #[inline(always)]
    fn cas(&self, old: BankCounter, new: BankCounter) -> bool {
        self.counter
            .compare_exchange(old.0, new.0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[inline(always)]
    fn check_lane(lane: usize) {
        debug_assert!(
            (1..=BANK_LANES).contains(&lane),
            "lane {lane} outside 1..={BANK_LANES}"
        );
    }

    /// Returns the current state. RT reader only; wait-free.
    #[inline(always)]
    pub fn read_current(&self) -> &T {
        let c = BankCounter(self.counter.load(Ordering::Acquire));
        // SAFETY: the current slot is never any lane's staging slot while it
        // stays current (see module protocol and rotation table).
        unsafe { &*self.slot_ptr(c.cur_slot()) }
    }

    /// Returns the switch ticket: incremented on every successful switch,
    /// never otherwise. Non-RT readers bracket a read with two ticket loads
    /// and retry on mismatch (see [`read_coherent`](Self::read_coherent)).
    #[inline(always)]
    pub fn ticket(&self) -> u8 {
        BankCounter(self.counter.load(Ordering::Acquire)).ticket()
    }

    /// `true` when lane `p`'s staged update is complete and switchable.
    pub fn has_pending(&self, lane: usize) -> bool {
        Self::check_lane(lane);
        self.snapshot().written(lane)
    }

    /// Promotes lane `p`'s staged update, if complete, and returns the
    /// current state.
    #[inline]
    pub fn try_switch(&self, lane: usize) -> &T {
        self.try_switch_checked(lane).0
    }

    /// Like [`try_switch`](Self::try_switch), also reporting whether an
    /// update was promoted.
    pub fn try_switch_checked(&self, lane: usize) -> (&T, bool) {
        Self::check_lane(lane);
        let switched = loop {
            let old = self.snapshot();
            let new = if old.written(lane) {
                old.with_byte(0, staging_slot(old.cur_slot(), lane) as u8)
                    .with_byte(lane, 0)
                    .with_ticket_bumped()
            } else {
                old
            };
            if self.cas(old, new) {
                break old.written(lane);
            }
        };
        let c = self.snapshot();
        // SAFETY: as in `read_current`.
        (unsafe { &*self.slot_ptr(c.cur_slot()) }, switched)
    }

    /// Opens a write region on lane `p` and returns its staging slot.
    ///
    /// Reserves the staging slot, discarding any complete-but-unconsumed
    /// update on the lane, and reseeds it from the current slot when the
    /// slot was freshly recycled (its contents are then stale). Pair with
    /// [`end_write`](Self::end_write), or use [`write`](Self::write).
    pub fn begin_write(&self, lane: usize) -> &mut T {
        self.begin_write_checked(lane).0
    }

    /// Like [`begin_write`](Self::begin_write), also reporting whether a
    /// complete update on this lane was discarded (overwritten in place).
    pub fn begin_write_checked(&self, lane: usize) -> (&mut T, bool) {
        Self::check_lane(lane);
        loop {
            let old = self.snapshot();
            let was_staged = old.written(lane);
            let cur_idx = old.cur_slot();
            let staging_idx = staging_slot(cur_idx, lane);
            // A clear flag means a switch just recycled this slot (or it was
            // never written): its contents are stale. A still-set flag means
            // the slot holds the lane's previous staged state, already
            // derived from a coherent base.
            let need_copy = !was_staged;
            let new = old.with_byte(lane, 0);
            if self.cas(old, new) {
                if need_copy {
                    // SAFETY: the CAS reserved `staging_idx` for this lane;
                    // the source slot is only concurrently read. The
                    // rotation table guarantees the indices differ.
                    unsafe {
                        ptr::copy_nonoverlapping(
                            self.slot_ptr(cur_idx) as *const T,
                            self.slot_ptr(staging_idx),
                            1,
                        );
                    }
                }
                // SAFETY: reserved above, released by end_write.
                return (unsafe { &mut *self.slot_ptr(staging_idx) }, was_staged);
            }
        }
    }

    /// Closes the write region on lane `p`, making the staged state
    /// switchable. Idempotent.
    pub fn end_write(&self, lane: usize) {
        Self::check_lane(lane);
        loop {
            let old = self.snapshot();
            let new = old.with_byte(lane, 1);
            if self.cas(old, new) {
                return;
            }
        }
    }

    /// Opens a write region on lane `p` that closes when the guard drops.
    pub fn write(&self, lane: usize) -> BankWriteGuard<'_, T> {
        let slot = self.begin_write(lane) as *mut T;
        BankWriteGuard {
            owner: self,
            slot,
            lane,
        }
    }

    /// Coherent full copy for non-RT observers, bracketed by ticket loads.
    pub fn read_coherent(&self) -> T {
        loop {
            let before = BankCounter(self.counter.load(Ordering::Acquire));
            // SAFETY: raw read; validated by the ticket re-check. A slot
            // that stayed current was not concurrently written.
            let value = unsafe { ptr::read(self.slot_ptr(before.cur_slot())) };
            let after = BankCounter(self.counter.load(Ordering::Acquire));
            if before.ticket() == after.ticket() {
                return value;
            }
            std::hint::spin_loop();
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for StateBank<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.snapshot();
        f.debug_struct("StateBank")
            .field("cur_slot", &c.cur_slot())
            .field("staged", &[c.written(1), c.written(2)])
            .field("ticket", &c.ticket())
            .finish()
    }
}

/// Scoped write region for one [`StateBank`] lane.
pub struct BankWriteGuard<'a, T: Copy> {
    owner: &'a StateBank<T>,
    slot: *mut T,
    lane: usize,
}

impl<T: Copy> Deref for BankWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the slot stays reserved while the region is open.
        unsafe { &*self.slot }
    }
}

impl<T: Copy> DerefMut for BankWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above.
        unsafe { &mut *self.slot }
    }
}

impl<T: Copy> Drop for BankWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.end_write(self.lane);
    }
}
