//! Indirect register windows
//!
//! On-chip tables and remote buses (PHYs over SMI, AVB/TSN blocks, FRER
//! tables) are reached through a command register with a busy bit and one
//! or more data registers. [`IndirectWindow`] runs the handshake over any
//! [`RegisterBus`]; [`layout`] holds the per-chip register tables and the
//! [`smi`], [`avb`] and [`frer`] modules give typed access with one lock per
//! block family.
//!
//! ```no_run
//! use msd_indirect::{RegisterBus, SmiPhy};
//! use std::sync::Arc;
//!
//! fn phy_id<B: RegisterBus>(bus: Arc<B>) -> msd_core::Result<u32> {
//!     let smi = SmiPhy::new(bus);
//!     let hi = smi.read_c22(0x01, 0x02)? as u32;
//!     let lo = smi.read_c22(0x01, 0x03)? as u32;
//!     Ok((hi << 16) | lo)
//! }
//! ```

pub mod avb;
pub mod bus;
pub mod frer;
pub mod layout;
pub mod retry;
pub mod smi;
pub mod window;


pub use avb::{Avb, QbvGateEntry};
pub use bus::RegisterBus;
pub use frer::{
    CounterBank, Frer, FrerTable, IndvRcvyEntry, ResetCounters, SeqGenEntry, SeqRcvyEntry,
    SeqRcvyViolation,
};
pub use layout::WindowLayout;
pub use retry::{Backoff, RetryPolicy};
pub use smi::SmiPhy;
pub use window::IndirectWindow;
