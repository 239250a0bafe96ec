//! `aulos-state`: lock-free state publication primitives for Aulos.
//!
//! This crate provides the two structures the server uses to publish mutable
//! control/graph state from non-realtime writer threads to the realtime cycle
//! thread without locks, without allocation after construction, and without
//! torn reads:
//!
//! - [`StatePair`]: two slots, one writer (reentrant), one realtime reader.
//!   One update can be pending at a time; restarting a write supersedes an
//!   unconsumed update.
//! - [`StateBank`]: three slots and two independent writer *lanes*. Each lane
//!   stages updates concurrently with the others and is promoted individually.
//!
//! # Architecture
//!
//! ```text
//!  control thread            cycle (RT) thread            inspector thread
//!  ──────────────            ─────────────────            ────────────────
//!  begin_write()                                          read_coherent()
//!    mutate slot   ──────▶   try_switch()   ──────▶         ticket loop,
//!  end_write()               read_current()                 full copy
//! ```
//!
//! Every transition goes through a compare-and-swap on a single packed 32-bit
//! word; payload slots are only ever touched by the thread that reserved them.
//! Readers are wait-free, writers and switchers are lock-free.
//!
//! # Payload requirements
//!
//! `T` must be `Copy`: reseeding a staging slot is a raw bytewise copy, so the
//! payload must tolerate bitwise duplication. Payloads with interior pointers
//! or non-trivial invariants must wrap them behind a trivially copyable
//! indirection.
//!
//! # Internal Modules
//!
//! - `counter`: packed counter snapshots and their shift/mask accessors
//! - `pair`: the two-slot publication primitive
//! - `bank`: the three-slot, two-lane publication primitive

mod counter;

pub mod bank;
pub mod pair;

pub use bank::{BANK_LANES, BANK_SLOTS, BankWriteGuard, StateBank};
pub use pair::{PairWriteGuard, StatePair};
