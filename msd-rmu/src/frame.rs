//! RMU frame constants and the common header
//!
//! Offsets below are for EtherType-DSA framing; with plain DSA every offset
//! past the source MAC is `delta` (4) bytes smaller.
//!
//! ```text
//!  0  DA 01:50:43:00:00:00
//!  6  SA (stamped at send time)
//! 12  EtherType            (EDSA only)
//! 14  0x0000               (EDSA only)
//! 16  DSA tag, sequence in the last byte
//! 20  length/type 0x0800
//! 22  format
//! 24  pad (request) / product number (response)
//! 26  request / response code
//! 28  body
//! ```

use bytes::{BufMut, BytesMut};
use msd_core::{Error, MacAddr, Result, WordReader};
use msd_packet::{pad_to_minimum, DsaFraming, DsaTag, EthernetHeader};

/// Destination MAC of every RMU request
pub const RMU_DEST_MAC: MacAddr = MacAddr([0x01, 0x50, 0x43, 0x00, 0x00, 0x00]);

/// Length/type word following the DSA tag
pub const RMU_LENGTH_TYPE: u16 = 0x0800;

/// Bytes in front of the body with EtherType-DSA framing
pub const PACKET_PREFIX_SIZE: usize = 28;

/// EDSA offset of the length/type word
pub const LENGTH_TYPE_OFFSET: usize = 20;
/// EDSA offset of the format word
pub const FORMAT_OFFSET: usize = 22;
/// EDSA offset of the product number (responses)
pub const PRODUCT_OFFSET: usize = 24;
/// EDSA offset of the request / response code
pub const CODE_OFFSET: usize = 26;

/// Request and response formats
pub mod format {
    /// GetID request
    pub const GET_ID: u16 = 0x0000;
    /// Every other request
    pub const REQUEST: u16 = 0x0001;
    /// Response to a regular request
    pub const RESPONSE: u16 = 0x0001;
    /// Response carrying extended data
    pub const RESPONSE_EXTENDED: u16 = 0x0002;
}

/// Request codes (echoed as response codes)
pub mod codes {
    /// Read the product number
    pub const GET_ID: u16 = 0x0000;
    /// Dump ATU or ECID entries
    pub const DUMP_ATU: u16 = 0x1000;
    /// Dump MIB-II counters
    pub const DUMP_MIB2: u16 = 0x1020;
    /// Dump MIB-II counters and clear them
    pub const DUMP_MIB2_CLEAR: u16 = 0x1021;
    /// Batched register read/write
    pub const REG_RW: u16 = 0x2000;
    /// Dump TCAM entries
    pub const DUMP_TCAM: u16 = 0x3000;
    /// Read/write one TCAM entry
    pub const TCAM_RW: u16 = 0x3001;
    /// Read the firmware version
    pub const FW_VERSION_GET: u16 = 0x4000;
}

/// Offset of the body for the given framing
pub fn body_offset(framing: &DsaFraming) -> usize {
    PACKET_PREFIX_SIZE - framing.delta()
}

/// Fixed header fields that follow the DSA tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmuHeader {
    /// DSA tag, including the sequence number
    pub tag: DsaTag,
    /// Format word
    pub format: u16,
    /// Pad (requests) or product number (responses)
    pub product: u16,
    /// Request / response code
    pub code: u16,
}

impl RmuHeader {
    /// Start a frame: MAC header, tag and fixed words
    ///
    /// The source MAC is left zero; the transport owner stamps it.
    pub fn write(&self, framing: &DsaFraming) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(EthernetHeader::MIN_FRAME_SIZE);
        EthernetHeader::new(RMU_DEST_MAC, MacAddr::zero()).write(&mut buf);
        framing.write_tag(&mut buf, &self.tag)?;
        buf.put_u16(RMU_LENGTH_TYPE);
        buf.put_u16(self.format);
        buf.put_u16(self.product);
        buf.put_u16(self.code);
        Ok(buf)
    }

    /// Parse the header of a frame
    pub fn parse(frame: &[u8], framing: &DsaFraming) -> Result<Self> {
        let offset = body_offset(framing);
        if frame.len() < offset {
            return Err(Error::parsing(format!(
                "RMU frame of {} bytes shorter than {} byte prefix",
                frame.len(),
                offset
            )));
        }
        let tag = framing.read_tag(frame)?;

        let delta = framing.delta();
        let words = WordReader::new(&frame[LENGTH_TYPE_OFFSET - delta..offset]);
        let length_type = words.word(0)?;
        if length_type != RMU_LENGTH_TYPE {
            return Err(Error::parsing(format!(
                "length/type {:#06x} is not an RMU frame",
                length_type
            )));
        }

        Ok(Self {
            tag,
            format: words.word(1)?,
            product: words.word(2)?,
            code: words.word(3)?,
        })
    }
}

/// Append the body and pad the frame to the Ethernet minimum
pub(crate) fn finish_frame(mut buf: BytesMut, body: &[u8]) -> Vec<u8> {
    buf.put_slice(body);
    let mut frame = buf.to_vec();
    pad_to_minimum(&mut frame);
    frame
}
