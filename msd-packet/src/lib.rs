//! Frame construction and parsing for switch management traffic
//!
//! This crate provides the layer-2 pieces the RMU codec is built from:
//!
//! - [`ethernet`] - MAC header, source stamping and minimum-size padding
//! - [`dsa`] - DSA / EtherType-DSA tags and their per-mode byte offsets
//!
//! # Example
//!
//! ```rust
//! use bytes::BytesMut;
//! use msd_core::{FramingMode, MacAddr};
//! use msd_packet::dsa::{DsaFraming, DsaTag};
//! use msd_packet::ethernet::EthernetHeader;
//!
//! let framing = DsaFraming::new(FramingMode::EtherTypeDsa, 0xDADA);
//! let mut buf = BytesMut::new();
//! EthernetHeader::new(MacAddr([0x01, 0x50, 0x43, 0, 0, 0]), MacAddr::zero()).write(&mut buf);
//! framing.write_tag(&mut buf, &DsaTag::from_cpu(2, 9).unwrap()).unwrap();
//! assert_eq!(buf[framing.sequence_offset()], 9);
//! ```

pub mod dsa;
pub mod ethernet;

// Re-export commonly used types for convenience
pub use dsa::{DsaFraming, DsaTag, TagCommand, DEFAULT_EDSA_ETHERTYPE, DSA_TAG_SIZE};
pub use ethernet::{pad_to_minimum, stamp_source, EtherType, EthernetHeader};
