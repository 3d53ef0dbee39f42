//! Raw frame transport for switch management traffic
//!
//! ## Features
//!
//! - **Transport trait**: [`FrameTransport`] is all the RMU session needs
//! - **pcap backend**: [`PcapTransport`] sends and receives on one interface
//! - **BPF Filters**: builders that keep unrelated traffic in the kernel
//! - **Statistics**: frame, drop and timeout counters
//!
//! ## Example
//!
//! ```no_run
//! use msd_capture::{filters, FrameTransport, PcapTransport};
//! use msd_packet::DsaFraming;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transport = PcapTransport::open("eth0")?;
//! transport.set_filter(&filters::rmu_filter(&DsaFraming::default(), 0))?;
//!
//! if let Some(frame) = transport.recv()? {
//!     println!("Got frame: {} bytes", frame.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod filters;
pub mod interface;
pub mod stats;
pub mod transport;

// Re-export main types
pub use interface::{default_interface, get_interface, list_interfaces, InterfaceInfo};
pub use stats::{StatsAccumulator, TransportStats};
pub use transport::{FrameTransport, PcapTransport, TransportConfig};
