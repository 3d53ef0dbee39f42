//! Ethernet header construction and parsing
//!
//! Management frames carry a tag between the source MAC and the payload, so
//! this module only deals with the two MAC addresses and frame sizing; the
//! tag itself lives in [`crate::dsa`].

use bytes::BufMut;
use msd_core::{Error, MacAddr, Result};
use std::fmt;

/// Common EtherType values seen on a switch management port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800), also the RMU length/type marker
    IPv4,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// EtherType-DSA (0xDADA)
    EDSA,
    /// Custom EtherType
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to u16 value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::VLAN => 0x8100,
            EtherType::EDSA => 0xDADA,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from u16 value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x8100 => EtherType::VLAN,
            0xDADA => EtherType::EDSA,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::EDSA => write!(f, "EDSA"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Destination and source MAC addresses at the start of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address
    pub destination: MacAddr,
    /// Source MAC address
    pub source: MacAddr,
}

impl EthernetHeader {
    /// Minimum Ethernet frame size (without FCS)
    pub const MIN_FRAME_SIZE: usize = 60;

    /// Maximum Ethernet frame size (without FCS)
    pub const MAX_FRAME_SIZE: usize = 1514;

    /// Size of the two MAC addresses
    pub const SIZE: usize = 12;

    /// Offset of the source MAC address
    pub const SOURCE_OFFSET: usize = 6;

    /// Create a new header
    pub fn new(destination: MacAddr, source: MacAddr) -> Self {
        Self {
            destination,
            source,
        }
    }

    /// Append the header to a buffer
    pub fn write(&self, buf: &mut impl BufMut) {
        buf.put_slice(self.destination.as_bytes());
        buf.put_slice(self.source.as_bytes());
    }

    /// Parse the header from the start of a frame
    pub fn parse(frame: &[u8]) -> Result<Self> {
        if frame.len() < Self::SIZE {
            return Err(Error::parsing(format!(
                "frame of {} bytes shorter than Ethernet header",
                frame.len()
            )));
        }
        let destination = MacAddr::from_slice(&frame[0..6])
            .ok_or_else(|| Error::parsing("bad destination MAC"))?;
        let source = MacAddr::from_slice(&frame[6..12])
            .ok_or_else(|| Error::parsing("bad source MAC"))?;
        Ok(Self {
            destination,
            source,
        })
    }
}

/// Overwrite the source MAC of an encoded frame
///
/// Requests are encoded before the adapter is known; the transport owner
/// stamps its own address just before sending.
pub fn stamp_source(frame: &mut [u8], source: MacAddr) -> Result<()> {
    let slot = frame
        .get_mut(EthernetHeader::SOURCE_OFFSET..EthernetHeader::SIZE)
        .ok_or_else(|| Error::bad_param("frame", "too short to carry a source MAC"))?;
    slot.copy_from_slice(source.as_bytes());
    Ok(())
}

/// Pad a frame with zeros to the minimum Ethernet size
pub fn pad_to_minimum(frame: &mut Vec<u8>) {
    if frame.len() < EthernetHeader::MIN_FRAME_SIZE {
        frame.resize(EthernetHeader::MIN_FRAME_SIZE, 0);
    }
}
