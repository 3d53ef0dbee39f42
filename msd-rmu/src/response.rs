//! RMU response decoding

use msd_core::{Error, Result, WordReader};
use msd_packet::{DsaFraming, DsaTag, TagCommand};
use std::fmt;

use crate::frame::{body_offset, finish_frame, format, RmuHeader};

/// A decoded response frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmuResponse {
    frame: Vec<u8>,
    framing: DsaFraming,
    header: RmuHeader,
}

impl RmuResponse {
    /// Byte-offset correction of this frame's framing
    pub fn delta(&self) -> usize {
        self.framing.delta()
    }

    /// DSA tag
    pub fn tag(&self) -> &DsaTag {
        &self.header.tag
    }

    /// Echoed sequence number
    pub fn sequence(&self) -> u8 {
        self.header.tag.sequence
    }

    /// Format word
    pub fn format(&self) -> u16 {
        self.header.format
    }

    /// Product number word
    pub fn product(&self) -> u16 {
        self.header.product
    }

    /// Response code
    pub fn code(&self) -> u16 {
        self.header.code
    }

    /// Body following the fixed prefix
    pub fn payload(&self) -> &[u8] {
        &self.frame[body_offset(&self.framing)..]
    }

    /// Whole frame, as handed to the table and batch parsers
    pub fn bytes(&self) -> &[u8] {
        &self.frame
    }

    /// Take the frame back
    pub fn into_bytes(self) -> Vec<u8> {
        self.frame
    }
}

/// Validate and decode a response frame
pub fn decode_response(frame: Vec<u8>, framing: &DsaFraming) -> Result<RmuResponse> {
    let header = RmuHeader::parse(&frame, framing)?;
    if header.format != format::RESPONSE && header.format != format::RESPONSE_EXTENDED {
        return Err(Error::parsing(format!(
            "format {:#06x} is not an RMU response",
            header.format
        )));
    }
    Ok(RmuResponse {
        frame,
        framing: *framing,
        header,
    })
}

/// Build a response frame as a switch would, used by responders and tests
pub fn encode_response(
    framing: &DsaFraming,
    device: u8,
    sequence: u8,
    product: u16,
    code: u16,
    body: &[u8],
) -> Result<Vec<u8>> {
    let header = RmuHeader {
        tag: DsaTag {
            command: TagCommand::ToCpu,
            device,
            flags: 0,
            priority: 0,
            sequence,
        },
        format: format::RESPONSE,
        product,
        code,
    };
    Ok(finish_frame(header.write(framing)?, body))
}

/// Product number and revision from a GetID response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmuIdentity {
    /// Product number (upper 12 bits of the product word)
    pub product_num: u16,
    /// Silicon revision (low nibble)
    pub revision: u8,
}

impl RmuIdentity {
    /// Split the product word of a response
    pub fn from_response(response: &RmuResponse) -> Self {
        Self {
            product_num: response.product() >> 4,
            revision: (response.product() & 0x000F) as u8,
        }
    }
}

impl fmt::Display for RmuIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "product {:#05x} rev {}", self.product_num, self.revision)
    }
}

/// Firmware version from an FWVersionGet response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u16,
}

impl FirmwareVersion {
    /// Decode from a response body
    pub fn from_response(response: &RmuResponse) -> Result<Self> {
        let words = WordReader::new(response.payload());
        let version = words.word(0)?;
        Ok(Self {
            major: (version >> 8) as u8,
            minor: version as u8,
            build: words.word(1)?,
        })
    }

    /// Encode as a response body
    pub fn to_body(&self) -> Vec<u8> {
        let version = ((self.major as u16) << 8) | self.minor as u16;
        let mut body = version.to_be_bytes().to_vec();
        body.extend_from_slice(&self.build.to_be_bytes());
        body
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} (build {})", self.major, self.minor, self.build)
    }
}
