//! Remote Management Unit protocol
//!
//! The RMU tunnels register operations and table dumps inside DSA or
//! EtherType-DSA tagged Ethernet frames. This crate provides:
//!
//! - [`frame`], [`request`], [`response`] - the frame codec
//! - [`dump`], [`atu`], [`ecid`], [`tcam`], [`mib`] - table-dump parsers
//! - [`batch`] - register command lists closed by a sentinel
//! - [`session`] - sequence-matched request/response over a [`FrameTransport`]
//!
//! # Example
//!
//! ```no_run
//! use msd_capture::PcapTransport;
//! use msd_rmu::{RmuConfig, RmuSession};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = PcapTransport::open("eth0")?;
//! let mut session = RmuSession::new(transport, RmuConfig::default().with_target_device(1))?;
//! for entry in session.dump_atu_all()? {
//!     println!("{}", entry);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`FrameTransport`]: msd_capture::FrameTransport

pub mod atu;
pub mod batch;
pub mod dump;
pub mod ecid;
pub mod frame;
pub mod mib;
pub mod request;
pub mod response;
pub mod session;
pub mod tcam;

#[cfg(test)]
mod tests;

pub use atu::{parse_atu, AtuEntry, MAX_ATUS};
pub use batch::MAX_REGCMDS;
pub use dump::{DumpPage, DumpRecord, TableDumpCursor};
pub use ecid::{parse_ecid, EcidEntry, MAX_ECIDS};
pub use frame::PACKET_PREFIX_SIZE;
pub use mib::{parse_mib, StatCounter, StatsCounterSet};
pub use request::{decode_request, encode_request, RmuCommand, RmuRequest};
pub use response::{decode_response, encode_response, FirmwareVersion, RmuIdentity, RmuResponse};
pub use session::{RmuConfig, RmuSession};
pub use tcam::{parse_tcam, parse_tcam_entry, TcamEntry, TcamOp, MAX_TCAMS};
