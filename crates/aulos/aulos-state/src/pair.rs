//! Two-slot state publication: one writer, one realtime reader.
//!
//! The writer prepares the next state in the slot the reader is not
//! observing, then publishes it; the reader promotes a published state at a
//! point of its own choosing (typically once per cycle) and reads the current
//! slot for the rest of the cycle.
//!
//! # Protocol
//!
//! The packed counter holds two 16-bit fields, `cur` and `next` (see
//! `counter`). The low bit of `cur` selects the current slot.
//!
//! **Writer** (`begin_write` / `end_write`):
//! 1. CAS `next := cur`. This reserves the staging slot and atomically
//!    discards any published-but-unconsumed update.
//! 2. If there was no update in flight (`cur == next` before the CAS), the
//!    staging slot holds stale data: reseed it with a bytewise copy of the
//!    current slot.
//! 3. Mutate the staging slot in place.
//! 4. CAS `next := next + 1`. Now `next != cur`: the update is switchable.
//!
//! **Reader** (`try_switch`):
//! 1. CAS `cur := next`. A no-op when nothing is pending.
//! 2. Read the slot selected by `cur`.
//!
//! Writes are reentrant: only the outermost `begin_write`/`end_write` pair
//! moves the counter, so a nested region mutates the same staging slot and
//! publishes exactly once.
//!
//! # Memory ordering
//!
//! All CAS loops and the loads feeding them are sequentially consistent; the
//! read-only paths (`read_current`, `current_index`, `read_coherent`) use
//! acquire loads, which is what makes `read_current` a single load plus an
//! indexed access on the hot path.

use crate::counter::PairCounter;
use crossbeam_utils::CachePadded;
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};

/// A two-slot state cell for single-writer, single-RT-reader publication.
///
/// # Contracts
///
/// The structure is `Sync` but the roles are not: at most one thread may be
/// inside `begin_write`/`end_write` regions (the write depth counter is
/// deliberately not atomic), and at most one thread at a time may act as the
/// switching reader. Any number of threads may use [`read_coherent`].
///
/// References returned by [`read_current`]/[`try_switch`] must be dropped
/// before the reader's next `try_switch`: a switch recycles the previously
/// current slot as the writer's next staging slot.
///
/// [`read_current`]: StatePair::read_current
/// [`try_switch`]: StatePair::try_switch
/// [`read_coherent`]: StatePair::read_coherent
pub struct StatePair<T: Copy> {
    slots: [UnsafeCell<T>; 2],
    /// The serialization point: every transition is a CAS on this word.
    /// Padded so contended CAS traffic stays off the payload lines.
    counter: CachePadded<AtomicU32>,
    /// Reentrant-write depth. Touched only by the single writer thread.
    write_depth: Cell<i32>,
}

// SAFETY: slot access follows the publication protocol above; the counter
// word is the only shared mutable state touched from more than one thread
// without reservation, and it is atomic. `write_depth` is confined to the
// writer thread by contract.
unsafe impl<T: Copy + Send> Sync for StatePair<T> {}

impl<T: Copy> StatePair<T> {
    /// Creates the cell with both slots holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            slots: [UnsafeCell::new(initial), UnsafeCell::new(initial)],
            counter: CachePadded::new(AtomicU32::new(0)),
            write_depth: Cell::new(0),
        }
    }

    #[inline(always)]
    fn snapshot(&self) -> PairCounter {
        PairCounter(self.counter.load(Ordering::SeqCst))
    }

    #[inline(always)]
    fn slot_ptr(&self, idx: usize) -> *mut T {
        self.slots[idx].get()
    }

    #[inline(always)]
    fn cas(&self, old: PairCounter, new: PairCounter) -> bool {
        self.counter
            .compare_exchange(old.0, new.0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Returns the current state. RT reader only; wait-free.
    #[inline(always)]
    pub fn read_current(&self) -> &T {
        let c = PairCounter(self.counter.load(Ordering::Acquire));
        // SAFETY: the current slot is never a staging slot, so no thread
        // writes it while it stays current (see module protocol).
        unsafe { &*self.slot_ptr(c.cur_slot()) }
    }

    /// Returns the raw `cur` field. Advances on every successful switch, so
    /// non-RT readers can use it as a coherency ticket (see
    /// [`read_coherent`](Self::read_coherent) for the packaged loop).
    #[inline(always)]
    pub fn current_index(&self) -> u16 {
        PairCounter(self.counter.load(Ordering::Acquire)).cur()
    }

    /// `true` when a completed update is waiting to be switched in.
    pub fn has_pending(&self) -> bool {
        self.snapshot().has_pending()
    }

    /// Promotes the pending update, if any, and returns the current state.
    #[inline]
    pub fn try_switch(&self) -> &T {
        self.try_switch_checked().0
    }

    /// Like [`try_switch`](Self::try_switch), also reporting whether a
    /// pending update was promoted.
    pub fn try_switch_checked(&self) -> (&T, bool) {
        let switched = loop {
            let old = self.snapshot();
            let new = old.with_cur(old.next());
            if self.cas(old, new) {
                break old.has_pending();
            }
        };
        // Re-read the counter for slot selection; our CAS fixed `cur`.
        let c = self.snapshot();
        // SAFETY: as in `read_current`.
        (unsafe { &*self.slot_ptr(c.cur_slot()) }, switched)
    }

    /// Opens a write region and returns the staging slot.
    ///
    /// On the outermost call this reserves the staging slot, discarding any
    /// published-but-unconsumed update, and reseeds it from the current slot
    /// when no update was in flight: a first write after a switch must see
    /// the reader's state, not stale slot contents. Nested calls return the
    /// same slot and leave the counter untouched.
    ///
    /// Every `begin_write` must be paired with exactly one
    /// [`end_write`](Self::end_write); prefer [`write`](Self::write) for
    /// scope-guaranteed pairing.
    pub fn begin_write(&self) -> &mut T {
        let depth = self.write_depth.get();
        let idx = if depth == 0 {
            self.reserve_staging()
        } else {
            // The outer region owns the staging slot; the counter cannot
            // move under us, so the derived index is stable.
            self.snapshot().staging_slot()
        };
        self.write_depth.set(depth + 1);
        // SAFETY: the staging slot is reserved for this writer until the
        // outermost end_write, and it is never the current slot.
        unsafe { &mut *self.slot_ptr(idx) }
    }

    /// Closes a write region. When the outermost region closes, the staged
    /// state becomes switchable.
    pub fn end_write(&self) {
        let depth = self.write_depth.get() - 1;
        debug_assert!(depth >= 0, "end_write without matching begin_write");
        self.write_depth.set(depth);
        if depth == 0 {
            self.publish_staging();
        }
    }

    /// Opens a write region that closes when the guard drops.
    pub fn write(&self) -> PairWriteGuard<'_, T> {
        let slot = self.begin_write() as *mut T;
        PairWriteGuard { owner: self, slot }
    }

    /// Coherent full copy for non-RT observers: read the ticket, copy the
    /// current slot, re-read the ticket; retry until stable.
    ///
    /// `cur` only ever advances (it is set to `next`, which is always one
    /// ahead of it while pending), so an unchanged ticket means no switch
    /// completed during the copy, and the slot that was copied stayed
    /// current, hence unwritten, throughout.
    pub fn read_coherent(&self) -> T {
        loop {
            let before = PairCounter(self.counter.load(Ordering::Acquire));
            // SAFETY: raw read; coherency is validated by the ticket
            // re-check below, and a slot that stayed current was not
            // concurrently written.
            let value = unsafe { ptr::read(self.slot_ptr(before.cur_slot())) };
            let after = PairCounter(self.counter.load(Ordering::Acquire));
            if before.cur() == after.cur() {
                return value;
            }
            std::hint::spin_loop();
        }
    }

    fn reserve_staging(&self) -> usize {
        loop {
            let old = self.snapshot();
            let cur_idx = old.cur_slot();
            let staging_idx = old.staging_slot();
            // No update in flight means the staging slot holds whatever was
            // current two switches ago: reseed it. A superseded update is
            // already derived from a coherent base and needs no copy.
            let need_copy = !old.has_pending();
            let new = old.with_next(old.cur());
            if self.cas(old, new) {
                if need_copy {
                    // SAFETY: the CAS reserved `staging_idx` for this
                    // writer; the source slot is only concurrently read.
                    // The two indices always differ.
                    unsafe {
                        ptr::copy_nonoverlapping(
                            self.slot_ptr(cur_idx) as *const T,
                            self.slot_ptr(staging_idx),
                            1,
                        );
                    }
                }
                return staging_idx;
            }
        }
    }

    fn publish_staging(&self) {
        loop {
            let old = self.snapshot();
            let new = old.with_next(old.next().wrapping_add(1));
            if self.cas(old, new) {
                return;
            }
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for StatePair<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.snapshot();
        f.debug_struct("StatePair")
            .field("cur", &c.cur())
            .field("next", &c.next())
            .field("current", &self.read_coherent())
            .finish()
    }
}

/// Scoped write region for [`StatePair`]. Dereferences to the staging slot;
/// dropping the guard closes the region (and publishes, if outermost).
pub struct PairWriteGuard<'a, T: Copy> {
    owner: &'a StatePair<T>,
    slot: *mut T,
}

impl<T: Copy> Deref for PairWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the slot stays reserved while the region is open.
        unsafe { &*self.slot }
    }
}

impl<T: Copy> DerefMut for PairWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; nested guards target the same slot, so callers
        // must not hold references from two live guards at once.
        unsafe { &mut *self.slot }
    }
}

impl<T: Copy> Drop for PairWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.end_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_publish_and_switch() {
        let pair = StatePair::new(0u32);

        *pair.begin_write() = 42;
        pair.end_write();
        assert!(pair.has_pending());

        let (v, switched) = pair.try_switch_checked();
        assert!(switched);
        assert_eq!(*v, 42);
        assert_eq!(*pair.read_current(), 42);

        // Idempotent: nothing staged, second switch is a no-op.
        let (v, switched) = pair.try_switch_checked();
        assert!(!switched);
        assert_eq!(*v, 42);
    }

    #[test]
    fn restarted_write_supersedes_unswitched_update() {
        let pair = StatePair::new(0u32);

        *pair.begin_write() = 10;
        pair.end_write();
        *pair.begin_write() = 20;
        pair.end_write();

        let (v, switched) = pair.try_switch_checked();
        assert!(switched, "exactly one update must be observable");
        assert_eq!(*v, 20, "the later write wins");
        assert!(!pair.has_pending());
    }

    #[test]
    fn nested_write_publishes_once() {
        let pair = StatePair::new(0u32);
        let index_before = pair.current_index();

        let outer = pair.begin_write();
        *outer = 7;
        {
            let inner = pair.begin_write();
            assert_eq!(*inner, 7, "nested region sees the outer slot");
            *inner = 8;
            pair.end_write();
        }
        // Inner end_write must not have published.
        assert!(!pair.has_pending());
        pair.end_write();
        assert!(pair.has_pending());

        assert_eq!(*pair.try_switch(), 8);
        assert_eq!(
            pair.current_index(),
            index_before.wrapping_add(1),
            "one publish, one switch"
        );
    }

    #[test]
    fn first_write_is_seeded_from_current() {
        #[derive(Clone, Copy, Debug, PartialEq)]
        struct Pane {
            a: u32,
            b: u32,
        }

        let pair = StatePair::new(Pane { a: 5, b: 9 });

        // Publish a full update, switch it in, then mutate a single field:
        // the untouched field must survive the slot rotation.
        {
            let mut w = pair.write();
            w.b = 10;
        }
        pair.try_switch();

        {
            let mut w = pair.write();
            w.b = 99;
        }
        assert_eq!(*pair.try_switch(), Pane { a: 5, b: 99 });
    }

    #[test]
    fn guard_publishes_on_drop() {
        let pair = StatePair::new(0u64);
        {
            let mut w = pair.write();
            *w = 1234;
        }
        assert!(pair.has_pending());
        assert_eq!(*pair.try_switch(), 1234);
    }

    #[test]
    fn nested_guards() {
        let pair = StatePair::new(0u32);
        {
            let mut outer = pair.write();
            *outer = 1;
            drop(outer);
            // Re-staging before any switch keeps the staged value.
            let mut again = pair.write();
            *again += 1;
        }
        assert_eq!(*pair.try_switch(), 2);
    }

    #[test]
    fn current_index_advances_per_switch() {
        let pair = StatePair::new(0u8);
        let mut last = pair.current_index();
        for i in 0..10u8 {
            *pair.begin_write() = i;
            pair.end_write();
            pair.try_switch();
            let now = pair.current_index();
            assert_eq!(now, last.wrapping_add(1));
            last = now;
        }
    }

    #[test]
    fn read_coherent_matches_published() {
        let pair = StatePair::new(11u32);
        assert_eq!(pair.read_coherent(), 11);

        *pair.begin_write() = 22;
        pair.end_write();
        // Not yet switched: coherent readers still see the current state.
        assert_eq!(pair.read_coherent(), 11);
        pair.try_switch();
        assert_eq!(pair.read_coherent(), 22);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "end_write without matching begin_write")]
    fn unbalanced_end_write_is_detected() {
        let pair = StatePair::new(0u32);
        pair.end_write();
    }
}
