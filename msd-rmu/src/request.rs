//! RMU request encoding and decoding

use msd_core::{Error, RegisterCommand, Result, WordReader};
use msd_packet::{DsaFraming, DsaTag};
use std::fmt;

use crate::batch;
use crate::ecid::ECID_MODE;
use crate::frame::{body_offset, codes, finish_frame, format, RmuHeader};
use crate::tcam::{TcamEntry, TcamOp, TCAM_ENTRY_SIZE};

/// Largest port number of a MIB-II dump
pub const MAX_MIB_PORT: u8 = 0x1F;

/// Logical RMU command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RmuCommand {
    /// Read the product number
    GetId,
    /// Dump ATU entries starting at `start`
    DumpAtu { start: u16 },
    /// Dump ECID entries starting at `start`
    DumpEcid { start: u16 },
    /// Dump the MIB-II counters of `port`, optionally clearing them
    DumpMib2 { port: u8, clear: bool },
    /// Batched register read/write
    RegRw(Vec<RegisterCommand>),
    /// Dump TCAM entries starting at `start`
    DumpTcam { start: u16 },
    /// Operate on one TCAM entry
    TcamRw {
        op: TcamOp,
        pointer: u8,
        entry: Box<TcamEntry>,
    },
    /// Read the firmware version
    FwVersionGet,
}

impl RmuCommand {
    /// Request code, echoed by the response
    pub fn request_code(&self) -> u16 {
        match self {
            RmuCommand::GetId => codes::GET_ID,
            RmuCommand::DumpAtu { .. } | RmuCommand::DumpEcid { .. } => codes::DUMP_ATU,
            RmuCommand::DumpMib2 { clear: false, .. } => codes::DUMP_MIB2,
            RmuCommand::DumpMib2 { clear: true, .. } => codes::DUMP_MIB2_CLEAR,
            RmuCommand::RegRw(_) => codes::REG_RW,
            RmuCommand::DumpTcam { .. } => codes::DUMP_TCAM,
            RmuCommand::TcamRw { .. } => codes::TCAM_RW,
            RmuCommand::FwVersionGet => codes::FW_VERSION_GET,
        }
    }

    fn format(&self) -> u16 {
        match self {
            RmuCommand::GetId => format::GET_ID,
            _ => format::REQUEST,
        }
    }

    /// Encode the body
    pub fn encode_body(&self) -> Result<Vec<u8>> {
        let body = match self {
            RmuCommand::GetId => vec![0, 0],
            RmuCommand::DumpAtu { start } => {
                if start & ECID_MODE != 0 {
                    return Err(Error::bad_param(
                        "start",
                        format!("ATU start {:#06x} overlaps the ECID mode bit", start),
                    ));
                }
                start.to_be_bytes().to_vec()
            }
            RmuCommand::DumpEcid { start } => {
                if start & ECID_MODE != 0 {
                    return Err(Error::bad_param(
                        "start",
                        format!("ECID start {:#06x} overlaps the mode bit", start),
                    ));
                }
                (start | ECID_MODE).to_be_bytes().to_vec()
            }
            RmuCommand::DumpMib2 { port, .. } => {
                if *port > MAX_MIB_PORT {
                    return Err(Error::bad_param(
                        "port",
                        format!("{} exceeds {}", port, MAX_MIB_PORT),
                    ));
                }
                (*port as u16).to_be_bytes().to_vec()
            }
            RmuCommand::RegRw(commands) => batch::encode(commands)?,
            RmuCommand::DumpTcam { start } => start.to_be_bytes().to_vec(),
            RmuCommand::TcamRw { op, pointer, entry } => {
                if *pointer as u16 == crate::tcam::TCAM_END_MARKER {
                    return Err(Error::bad_param("pointer", "0xff is reserved"));
                }
                let mut body = Vec::with_capacity(4 + TCAM_ENTRY_SIZE);
                body.extend_from_slice(&op.code().to_be_bytes());
                body.extend_from_slice(&(*pointer as u16).to_be_bytes());
                body.extend_from_slice(&entry.to_words()?.to_bytes());
                body
            }
            RmuCommand::FwVersionGet => Vec::new(),
        };
        Ok(body)
    }

    /// Decode a body given the request code
    pub fn decode_body(code: u16, body: &[u8]) -> Result<Self> {
        let words = WordReader::new(body);
        let command = match code {
            codes::GET_ID => RmuCommand::GetId,
            codes::DUMP_ATU => {
                let start = words.word(0)?;
                if start & ECID_MODE != 0 {
                    RmuCommand::DumpEcid {
                        start: start & !ECID_MODE,
                    }
                } else {
                    RmuCommand::DumpAtu { start }
                }
            }
            codes::DUMP_MIB2 | codes::DUMP_MIB2_CLEAR => RmuCommand::DumpMib2 {
                port: words.word(0)? as u8,
                clear: code == codes::DUMP_MIB2_CLEAR,
            },
            codes::REG_RW => RmuCommand::RegRw(batch::decode_commands(body)?),
            codes::DUMP_TCAM => RmuCommand::DumpTcam {
                start: words.word(0)?,
            },
            codes::TCAM_RW => {
                let op = TcamOp::from_code(words.word(0)?)?;
                let pointer = words.word(1)? as u8;
                let entry_bytes = body.get(4..4 + TCAM_ENTRY_SIZE).ok_or_else(|| {
                    Error::parsing(format!("TCAMRW body of {} bytes truncated", body.len()))
                })?;
                let entry = TcamEntry::from_words(&WordReader::new(entry_bytes))?;
                RmuCommand::TcamRw {
                    op,
                    pointer,
                    entry: Box::new(entry),
                }
            }
            codes::FW_VERSION_GET => RmuCommand::FwVersionGet,
            other => {
                return Err(Error::parsing(format!(
                    "unknown RMU request code {:#06x}",
                    other
                )))
            }
        };
        Ok(command)
    }
}

impl fmt::Display for RmuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RmuCommand::GetId => write!(f, "GetID"),
            RmuCommand::DumpAtu { start } => write!(f, "DumpATU start={:#06x}", start),
            RmuCommand::DumpEcid { start } => write!(f, "DumpECID start={:#06x}", start),
            RmuCommand::DumpMib2 { port, clear } => {
                write!(f, "DumpMIB2 port={}{}", port, if *clear { " clear" } else { "" })
            }
            RmuCommand::RegRw(commands) => write!(f, "RegRW count={}", commands.len()),
            RmuCommand::DumpTcam { start } => write!(f, "DumpTCAM start={:#06x}", start),
            RmuCommand::TcamRw { op, pointer, .. } => {
                write!(f, "TCAMRW {} pointer={}", op, pointer)
            }
            RmuCommand::FwVersionGet => write!(f, "FWVersionGet"),
        }
    }
}

/// A complete RMU request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RmuRequest {
    /// What to do
    pub command: RmuCommand,
    /// Sequence number echoed by the response
    pub sequence: u8,
    /// Framing and EDSA EtherType
    pub framing: DsaFraming,
    /// Device number in the cascade
    pub target_device: u8,
}

impl RmuRequest {
    /// Create a request
    pub fn new(command: RmuCommand, sequence: u8, framing: DsaFraming, target_device: u8) -> Self {
        Self {
            command,
            sequence,
            framing,
            target_device,
        }
    }

    /// Encode into a padded frame with a zero source MAC
    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = RmuHeader {
            tag: DsaTag::from_cpu(self.target_device, self.sequence)?,
            format: self.command.format(),
            product: 0,
            code: self.command.request_code(),
        };
        let body = self.command.encode_body()?;
        Ok(finish_frame(header.write(&self.framing)?, &body))
    }
}

/// Encode a request into a frame
pub fn encode_request(request: &RmuRequest) -> Result<Vec<u8>> {
    request.encode()
}

/// Recover the logical request from a frame
pub fn decode_request(frame: &[u8], framing: &DsaFraming) -> Result<RmuRequest> {
    let header = RmuHeader::parse(frame, framing)?;
    let body = &frame[body_offset(framing)..];
    Ok(RmuRequest {
        command: RmuCommand::decode_body(header.code, body)?,
        sequence: header.tag.sequence,
        framing: *framing,
        target_device: header.tag.device,
    })
}
