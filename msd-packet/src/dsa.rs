//! DSA and EtherType-DSA tag framing
//!
//! A management frame addresses one chip of a cascade through a 4-byte DSA
//! tag placed right after the source MAC. With EtherType-DSA the tag is
//! preceded by a configurable EtherType and two reserved bytes:
//!
//! ```text
//! EtherType-DSA:  DA(6) SA(6) EtherType(2) 0x0000(2) Tag(4) ...
//! DSA:            DA(6) SA(6) Tag(4) ...
//!
//! Tag byte 0:  | cmd (2) | 0 | device (5) |
//! Tag byte 1:  port / flags (zero for management requests)
//! Tag byte 2:  priority / flags
//! Tag byte 3:  sequence number
//! ```

use bytes::BufMut;
use msd_core::{BitField, Error, FramingMode, Result};

use crate::ethernet::{EtherType, EthernetHeader};

/// Size of a DSA tag in bytes
pub const DSA_TAG_SIZE: usize = 4;

/// Size of the EtherType plus reserved bytes that precede an EDSA tag
pub const EDSA_PREAMBLE_SIZE: usize = 4;

/// Default EtherType for EtherType-DSA framing
pub const DEFAULT_EDSA_ETHERTYPE: u16 = 0xDADA;

/// Largest device number that fits the tag
pub const MAX_DEVICE: u8 = 0x1F;

const TAG_COMMAND: BitField = BitField::new(6, 2);
const TAG_DEVICE: BitField = BitField::new(0, 5);

/// DSA tag command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCommand {
    /// Frame trapped to the CPU
    ToCpu,
    /// Frame sent by the CPU to a device
    FromCpu,
    /// Mirrored frame
    ToSniffer,
    /// Normal forwarded frame
    Forward,
}

impl TagCommand {
    /// Two-bit wire code
    pub fn code(self) -> u8 {
        match self {
            TagCommand::ToCpu => 0,
            TagCommand::FromCpu => 1,
            TagCommand::ToSniffer => 2,
            TagCommand::Forward => 3,
        }
    }

    /// Decode a two-bit wire code
    pub fn from_code(code: u8) -> Self {
        match code & 0x03 {
            0 => TagCommand::ToCpu,
            1 => TagCommand::FromCpu,
            2 => TagCommand::ToSniffer,
            _ => TagCommand::Forward,
        }
    }
}

/// Decoded 4-byte DSA tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsaTag {
    /// Tag command
    pub command: TagCommand,
    /// Target (requests) or source (responses) device number
    pub device: u8,
    /// Byte 1: port / flags
    pub flags: u8,
    /// Byte 2: priority / flags
    pub priority: u8,
    /// Byte 3: sequence number
    pub sequence: u8,
}

impl DsaTag {
    /// FROM_CPU tag addressing `device` with the given sequence number
    pub fn from_cpu(device: u8, sequence: u8) -> Result<Self> {
        if device > MAX_DEVICE {
            return Err(Error::bad_param(
                "target_device",
                format!("{} exceeds {}", device, MAX_DEVICE),
            ));
        }
        Ok(Self {
            command: TagCommand::FromCpu,
            device,
            flags: 0,
            priority: 0,
            sequence,
        })
    }

    /// Serialize the tag
    pub fn to_bytes(&self) -> Result<[u8; DSA_TAG_SIZE]> {
        let byte0 = TAG_COMMAND.pack(self.command.code() as u32)?
            | TAG_DEVICE.pack(self.device as u32)?;
        Ok([byte0 as u8, self.flags, self.priority, self.sequence])
    }

    /// Parse a tag from exactly four bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DSA_TAG_SIZE {
            return Err(Error::parsing("DSA tag truncated"));
        }
        let byte0 = bytes[0] as u32;
        Ok(Self {
            command: TagCommand::from_code(TAG_COMMAND.extract(byte0) as u8),
            device: TAG_DEVICE.extract(byte0) as u8,
            flags: bytes[1],
            priority: bytes[2],
            sequence: bytes[3],
        })
    }
}

/// Tag framing of one management link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsaFraming {
    mode: FramingMode,
    ether_type: u16,
}

impl DsaFraming {
    /// Create framing; `ether_type` only matters for EtherType-DSA
    pub fn new(mode: FramingMode, ether_type: u16) -> Self {
        Self { mode, ether_type }
    }

    /// Framing mode
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Configured EDSA EtherType
    pub fn ether_type(&self) -> u16 {
        self.ether_type
    }

    /// Offset correction relative to EtherType-DSA offsets
    pub fn delta(&self) -> usize {
        self.mode.delta()
    }

    /// Offset of the DSA tag inside the frame (16 for EDSA, 12 for DSA)
    pub fn tag_offset(&self) -> usize {
        EthernetHeader::SIZE + EDSA_PREAMBLE_SIZE - self.delta()
    }

    /// Offset of the sequence byte (19 for EDSA, 15 for DSA)
    pub fn sequence_offset(&self) -> usize {
        self.tag_offset() + 3
    }

    /// Offset of the first byte after the tag
    pub fn header_len(&self) -> usize {
        self.tag_offset() + DSA_TAG_SIZE
    }

    /// Append the EDSA preamble (if any) and the tag
    pub fn write_tag(&self, buf: &mut impl BufMut, tag: &DsaTag) -> Result<()> {
        if self.mode == FramingMode::EtherTypeDsa {
            buf.put_u16(self.ether_type);
            buf.put_u16(0x0000);
        }
        buf.put_slice(&tag.to_bytes()?);
        Ok(())
    }

    /// Parse the tag of a received frame, checking the EDSA EtherType
    pub fn read_tag(&self, frame: &[u8]) -> Result<DsaTag> {
        if frame.len() < self.header_len() {
            return Err(Error::parsing(format!(
                "frame of {} bytes too short for {} tag",
                frame.len(),
                self.mode
            )));
        }
        if self.mode == FramingMode::EtherTypeDsa {
            let ether_type = u16::from_be_bytes([frame[12], frame[13]]);
            if ether_type != self.ether_type {
                return Err(Error::parsing(format!(
                    "EtherType {} is not the configured EDSA type {}",
                    EtherType::from_u16(ether_type),
                    EtherType::from_u16(self.ether_type)
                )));
            }
        }
        let offset = self.tag_offset();
        DsaTag::from_bytes(&frame[offset..offset + DSA_TAG_SIZE])
    }

    /// Read only the sequence byte, without validating anything else
    pub fn peek_sequence(&self, frame: &[u8]) -> Option<u8> {
        frame.get(self.sequence_offset()).copied()
    }
}

impl Default for DsaFraming {
    fn default() -> Self {
        Self::new(FramingMode::EtherTypeDsa, DEFAULT_EDSA_ETHERTYPE)
    }
}
