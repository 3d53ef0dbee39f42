//! TCAM records
//!
//! A TCAM entry is 42 big-endian words (84 bytes). The key spans two hardware
//! pages: page 0 holds the port/VLAN key and frame octets 0..13, page 1 holds
//! frame octets 14..27 and is followed by the action block.
//!
//! ```text
//! w0        pointer (0x00FF ends a dump page)
//! w1        | frameType (2) | mask (2) | - | ppri (3) | - | ppriMask (3) | - (4) |
//! w2, w3    source port vector, mask
//! w4, w5    PVID, mask (12 bits each)
//! w6..w19   frame octets 0..13, (mask << 8) | data
//! w20..w33  frame octets 14..27
//! w34..w41  action block
//! ```

use msd_core::{BitField, Error, Result, WordReader, WordWriter};
use std::fmt;

use crate::dump::{parse_page, DumpPage, DumpRecord};
use crate::frame::PACKET_PREFIX_SIZE;

/// TCAM entries per dump response
pub const MAX_TCAMS: usize = 16;

/// Words in one TCAM record
pub const TCAM_ENTRY_WORDS: usize = 42;

/// Width of one TCAM record
pub const TCAM_ENTRY_SIZE: usize = TCAM_ENTRY_WORDS * 2;

/// Pointer value that ends a dump page
pub const TCAM_END_MARKER: u16 = 0x00FF;

/// Frame octets matched by one entry
pub const TCAM_OCTETS: usize = 28;

/// Frame octets per key page
pub const OCTETS_PER_PAGE: usize = 14;

const W_POINTER: usize = 0;
const W_FRAME: usize = 1;
const W_SPV: usize = 2;
const W_SPV_MASK: usize = 3;
const W_PVID: usize = 4;
const W_PVID_MASK: usize = 5;
const W_PAGE0_OCTETS: usize = 6;
const W_PAGE1_OCTETS: usize = 20;
const W_ACTION: usize = 34;

const FRAME_TYPE: BitField = BitField::new(14, 2);
const FRAME_TYPE_MASK: BitField = BitField::new(12, 2);
const PPRI: BitField = BitField::new(8, 3);
const PPRI_MASK: BitField = BitField::new(4, 3);
const PVID: BitField = BitField::new(0, 12);
const OCTET_DATA: BitField = BitField::new(0, 8);
const OCTET_MASK: BitField = BitField::new(8, 8);

// w34
const CONTINU: BitField = BitField::bit(15);
const INTERRUPT: BitField = BitField::bit(14);
const INC_TCAM_CTR: BitField = BitField::bit(13);
const TCAM_CTR: BitField = BitField::new(11, 2);
const VID_OVERRIDE: BitField = BitField::bit(10);
const UNKNOWN_FILTER: BitField = BitField::bit(9);
const NEXT_ID: BitField = BitField::new(0, 8);
// w35
const QPRI_OVERRIDE: BitField = BitField::bit(15);
const FPRI_OVERRIDE: BitField = BitField::bit(14);
const VID_DATA: BitField = BitField::new(0, 12);
// w36
const DPV_OVERRIDE: BitField = BitField::bit(15);
const QPRI_DATA: BitField = BitField::new(8, 3);
const FPRI_DATA: BitField = BitField::new(4, 3);
const DPV_MODE: BitField = BitField::new(0, 2);
// w38
const COLOR_MODE: BitField = BitField::new(14, 2);
const VTU_PAGE: BitField = BitField::bit(13);
const LD_BALANCE_OVERRIDE: BitField = BitField::bit(12);
const LD_BALANCE_DATA: BitField = BitField::new(8, 3);
const EG_ACT_POINT: BitField = BitField::new(0, 6);
// w39
const DSCP_OVERRIDE: BitField = BitField::bit(15);
const DSCP: BitField = BitField::new(8, 6);

/// Operation of a TCAMRW request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcamOp {
    /// Invalidate every entry
    FlushAll,
    /// Invalidate one entry
    FlushOne,
    /// Write one entry
    Load,
    /// Read the next valid entry after the pointer
    GetNext,
    /// Read one entry
    Read,
}

impl TcamOp {
    /// Wire code
    pub fn code(self) -> u16 {
        match self {
            TcamOp::FlushAll => 1,
            TcamOp::FlushOne => 2,
            TcamOp::Load => 3,
            TcamOp::GetNext => 4,
            TcamOp::Read => 5,
        }
    }

    /// Decode a wire code
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            1 => Ok(TcamOp::FlushAll),
            2 => Ok(TcamOp::FlushOne),
            3 => Ok(TcamOp::Load),
            4 => Ok(TcamOp::GetNext),
            5 => Ok(TcamOp::Read),
            other => Err(Error::parsing(format!("unknown TCAM operation {}", other))),
        }
    }
}

impl fmt::Display for TcamOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TcamOp::FlushAll => write!(f, "FLUSH_ALL"),
            TcamOp::FlushOne => write!(f, "FLUSH_ONE"),
            TcamOp::Load => write!(f, "LOAD"),
            TcamOp::GetNext => write!(f, "GET_NEXT"),
            TcamOp::Read => write!(f, "READ"),
        }
    }
}

/// One matched frame octet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcamOctet {
    /// Value to match
    pub data: u8,
    /// Bits that participate in the match
    pub mask: u8,
}

/// Match key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcamKey {
    pub frame_type: u8,
    pub frame_type_mask: u8,
    pub ppri: u8,
    pub ppri_mask: u8,
    pub spv: u16,
    pub spv_mask: u16,
    pub pvid: u16,
    pub pvid_mask: u16,
    /// Frame octets 0..27
    pub octets: [TcamOctet; TCAM_OCTETS],
}

/// Action applied on a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcamAction {
    pub continu: bool,
    pub interrupt: bool,
    pub inc_tcam_ctr: bool,
    pub tcam_ctr: u8,
    pub vid_override: bool,
    pub unknown_filter: bool,
    /// Next entry to evaluate when `continu` is set
    pub next_id: u8,
    pub qpri_override: bool,
    pub fpri_override: bool,
    pub vid_data: u16,
    pub dpv_override: bool,
    pub qpri_data: u8,
    pub fpri_data: u8,
    pub dpv_mode: u8,
    pub dpv_data: u16,
    pub color_mode: u8,
    pub vtu_page: bool,
    pub ld_balance_override: bool,
    pub ld_balance_data: u8,
    pub eg_act_point: u8,
    pub dscp_override: bool,
    pub dscp: u8,
    pub faction: u16,
}

/// One TCAM entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcamEntry {
    /// Entry index
    pub pointer: u8,
    pub key: TcamKey,
    pub action: TcamAction,
}

impl TcamEntry {
    /// Empty entry at `pointer`
    pub fn new(pointer: u8) -> Self {
        Self {
            pointer,
            ..Default::default()
        }
    }

    /// Decode from 42 words
    pub fn from_words(words: &WordReader<'_>) -> Result<Self> {
        let pointer = words.word(W_POINTER)?;
        let pointer = u8::try_from(pointer)
            .map_err(|_| Error::parsing(format!("TCAM pointer {:#06x} out of range", pointer)))?;

        let mut octets = [TcamOctet::default(); TCAM_OCTETS];
        for (i, octet) in octets.iter_mut().enumerate() {
            let index = octet_word(i);
            octet.data = words.field_u8(index, OCTET_DATA)?;
            octet.mask = words.field_u8(index, OCTET_MASK)?;
        }

        let key = TcamKey {
            frame_type: words.field_u8(W_FRAME, FRAME_TYPE)?,
            frame_type_mask: words.field_u8(W_FRAME, FRAME_TYPE_MASK)?,
            ppri: words.field_u8(W_FRAME, PPRI)?,
            ppri_mask: words.field_u8(W_FRAME, PPRI_MASK)?,
            spv: words.word(W_SPV)?,
            spv_mask: words.word(W_SPV_MASK)?,
            pvid: words.field(W_PVID, PVID)?,
            pvid_mask: words.field(W_PVID_MASK, PVID)?,
            octets,
        };

        let a = W_ACTION;
        let action = TcamAction {
            continu: words.field(a, CONTINU)? != 0,
            interrupt: words.field(a, INTERRUPT)? != 0,
            inc_tcam_ctr: words.field(a, INC_TCAM_CTR)? != 0,
            tcam_ctr: words.field_u8(a, TCAM_CTR)?,
            vid_override: words.field(a, VID_OVERRIDE)? != 0,
            unknown_filter: words.field(a, UNKNOWN_FILTER)? != 0,
            next_id: words.field_u8(a, NEXT_ID)?,
            qpri_override: words.field(a + 1, QPRI_OVERRIDE)? != 0,
            fpri_override: words.field(a + 1, FPRI_OVERRIDE)? != 0,
            vid_data: words.field(a + 1, VID_DATA)?,
            dpv_override: words.field(a + 2, DPV_OVERRIDE)? != 0,
            qpri_data: words.field_u8(a + 2, QPRI_DATA)?,
            fpri_data: words.field_u8(a + 2, FPRI_DATA)?,
            dpv_mode: words.field_u8(a + 2, DPV_MODE)?,
            dpv_data: words.word(a + 3)?,
            color_mode: words.field_u8(a + 4, COLOR_MODE)?,
            vtu_page: words.field(a + 4, VTU_PAGE)? != 0,
            ld_balance_override: words.field(a + 4, LD_BALANCE_OVERRIDE)? != 0,
            ld_balance_data: words.field_u8(a + 4, LD_BALANCE_DATA)?,
            eg_act_point: words.field_u8(a + 4, EG_ACT_POINT)?,
            dscp_override: words.field(a + 5, DSCP_OVERRIDE)? != 0,
            dscp: words.field_u8(a + 5, DSCP)?,
            faction: words.word(a + 6)?,
        };

        Ok(Self {
            pointer,
            key,
            action,
        })
    }

    /// Encode as 42 words; fails if any field overflows its width
    pub fn to_words(&self) -> Result<WordWriter> {
        let mut w = WordWriter::new(TCAM_ENTRY_WORDS);
        let key = &self.key;
        w.set(W_POINTER, self.pointer as u16)?;
        w.set_field(W_FRAME, FRAME_TYPE, key.frame_type as u16)?;
        w.set_field(W_FRAME, FRAME_TYPE_MASK, key.frame_type_mask as u16)?;
        w.set_field(W_FRAME, PPRI, key.ppri as u16)?;
        w.set_field(W_FRAME, PPRI_MASK, key.ppri_mask as u16)?;
        w.set(W_SPV, key.spv)?;
        w.set(W_SPV_MASK, key.spv_mask)?;
        w.set_field(W_PVID, PVID, key.pvid)?;
        w.set_field(W_PVID_MASK, PVID, key.pvid_mask)?;
        for (i, octet) in key.octets.iter().enumerate() {
            let index = octet_word(i);
            w.set_field(index, OCTET_DATA, octet.data as u16)?;
            w.set_field(index, OCTET_MASK, octet.mask as u16)?;
        }

        let act = &self.action;
        let a = W_ACTION;
        w.set_field(a, CONTINU, act.continu as u16)?;
        w.set_field(a, INTERRUPT, act.interrupt as u16)?;
        w.set_field(a, INC_TCAM_CTR, act.inc_tcam_ctr as u16)?;
        w.set_field(a, TCAM_CTR, act.tcam_ctr as u16)?;
        w.set_field(a, VID_OVERRIDE, act.vid_override as u16)?;
        w.set_field(a, UNKNOWN_FILTER, act.unknown_filter as u16)?;
        w.set_field(a, NEXT_ID, act.next_id as u16)?;
        w.set_field(a + 1, QPRI_OVERRIDE, act.qpri_override as u16)?;
        w.set_field(a + 1, FPRI_OVERRIDE, act.fpri_override as u16)?;
        w.set_field(a + 1, VID_DATA, act.vid_data)?;
        w.set_field(a + 2, DPV_OVERRIDE, act.dpv_override as u16)?;
        w.set_field(a + 2, QPRI_DATA, act.qpri_data as u16)?;
        w.set_field(a + 2, FPRI_DATA, act.fpri_data as u16)?;
        w.set_field(a + 2, DPV_MODE, act.dpv_mode as u16)?;
        w.set(a + 3, act.dpv_data)?;
        w.set_field(a + 4, COLOR_MODE, act.color_mode as u16)?;
        w.set_field(a + 4, VTU_PAGE, act.vtu_page as u16)?;
        w.set_field(a + 4, LD_BALANCE_OVERRIDE, act.ld_balance_override as u16)?;
        w.set_field(a + 4, LD_BALANCE_DATA, act.ld_balance_data as u16)?;
        w.set_field(a + 4, EG_ACT_POINT, act.eg_act_point as u16)?;
        w.set_field(a + 5, DSCP_OVERRIDE, act.dscp_override as u16)?;
        w.set_field(a + 5, DSCP, act.dscp as u16)?;
        w.set(a + 6, act.faction)?;
        Ok(w)
    }
}

fn octet_word(octet: usize) -> usize {
    if octet < OCTETS_PER_PAGE {
        W_PAGE0_OCTETS + octet
    } else {
        W_PAGE1_OCTETS + octet - OCTETS_PER_PAGE
    }
}

impl DumpRecord for TcamEntry {
    const NAME: &'static str = "TCAM";
    const SIZE: usize = TCAM_ENTRY_SIZE;
    const MAX_PER_PACKET: usize = MAX_TCAMS;

    fn is_terminator(bytes: &[u8]) -> Result<bool> {
        Ok(WordReader::new(bytes).word(W_POINTER)? == TCAM_END_MARKER)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Self::from_words(&WordReader::new(bytes))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_words()?.to_bytes())
    }
}

impl fmt::Display for TcamEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tcam[{}] spv={:#06x}/{:#06x} pvid={}/{:#05x} next={} faction={:#06x}",
            self.pointer,
            self.key.spv,
            self.key.spv_mask,
            self.key.pvid,
            self.key.pvid_mask,
            self.action.next_id,
            self.action.faction
        )
    }
}

/// End-marker record terminating a short TCAM page
pub fn end_marker() -> Vec<u8> {
    let mut bytes = vec![0u8; TCAM_ENTRY_SIZE];
    bytes[..2].copy_from_slice(&TCAM_END_MARKER.to_be_bytes());
    bytes
}

/// Parse one TCAM dump response
pub fn parse_tcam(buffer: &[u8], delta: usize) -> Result<DumpPage<TcamEntry>> {
    parse_page(buffer, delta)
}

/// Parse the single entry of a TCAMRW read or get-next response
///
/// Returns `None` when the device answered with the end marker.
pub fn parse_tcam_entry(buffer: &[u8], delta: usize) -> Result<Option<TcamEntry>> {
    let start = PACKET_PREFIX_SIZE.saturating_sub(delta);
    let bytes = buffer.get(start..start + TCAM_ENTRY_SIZE).ok_or_else(|| {
        Error::parsing(format!(
            "TCAM response of {} bytes too short for one entry",
            buffer.len()
        ))
    })?;
    if TcamEntry::is_terminator(bytes)? {
        return Ok(None);
    }
    TcamEntry::decode(bytes).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(pointer: u8) -> TcamEntry {
        let mut entry = TcamEntry::new(pointer);
        entry.key.frame_type = 2;
        entry.key.frame_type_mask = 3;
        entry.key.ppri = 5;
        entry.key.ppri_mask = 7;
        entry.key.spv = 0x0001;
        entry.key.spv_mask = 0x07FF;
        entry.key.pvid = 100;
        entry.key.pvid_mask = 0xFFF;
        entry.key.octets[12] = TcamOctet {
            data: 0x08,
            mask: 0xFF,
        };
        entry.key.octets[20] = TcamOctet {
            data: 0x11,
            mask: 0xF0,
        };
        entry.action.continu = true;
        entry.action.next_id = 7;
        entry.action.vid_override = true;
        entry.action.vid_data = 0x123;
        entry.action.qpri_override = true;
        entry.action.qpri_data = 6;
        entry.action.dpv_override = true;
        entry.action.dpv_mode = 2;
        entry.action.dpv_data = 0x0402;
        entry.action.color_mode = 1;
        entry.action.eg_act_point = 0x2A;
        entry.action.dscp_override = true;
        entry.action.dscp = 46;
        entry.action.faction = 0xBEEF;
        entry
    }

    #[test]
    fn test_entry_word_layout() {
        let entry = sample_entry(3);
        let bytes = entry.encode().unwrap();
        assert_eq!(bytes.len(), TCAM_ENTRY_SIZE);

        let words = WordReader::new(&bytes);
        assert_eq!(words.word(0).unwrap(), 3);
        assert_eq!(words.word(1).unwrap(), 0xB570);
        assert_eq!(words.word(4).unwrap(), 100);
        // octet 12 lives on page 0, octet 20 on page 1
        assert_eq!(words.word(6 + 12).unwrap(), 0xFF08);
        assert_eq!(words.word(20 + 6).unwrap(), 0xF011);
        assert_eq!(words.word(34).unwrap(), 0x8407);
        assert_eq!(words.word(40).unwrap(), 0xBEEF);

        assert_eq!(TcamEntry::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_field_overflow_rejected() {
        let mut entry = TcamEntry::new(0);
        entry.action.dscp = 64;
        assert!(entry.encode().is_err());
    }

    #[test]
    fn test_op_codes() {
        for op in [
            TcamOp::FlushAll,
            TcamOp::FlushOne,
            TcamOp::Load,
            TcamOp::GetNext,
            TcamOp::Read,
        ] {
            assert_eq!(TcamOp::from_code(op.code()).unwrap(), op);
        }
        assert!(TcamOp::from_code(9).is_err());
    }

    #[test]
    fn test_page_with_end_marker() {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE - 4];
        frame.extend_from_slice(&sample_entry(1).encode().unwrap());
        frame.extend_from_slice(&sample_entry(2).encode().unwrap());
        frame.extend_from_slice(&end_marker());

        let page = parse_tcam(&frame, 4).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[1].pointer, 2);
        assert_eq!(page.continuation, None);
    }

    #[test]
    fn test_full_page_continuation() {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE];
        for i in 0..MAX_TCAMS {
            frame.extend_from_slice(&sample_entry(i as u8).encode().unwrap());
        }
        frame.extend_from_slice(&[0x00, 0x10]);

        let page = parse_tcam(&frame, 0).unwrap();
        assert_eq!(page.entries.len(), MAX_TCAMS);
        assert_eq!(page.continuation.map(|c| c.0), Some(0x10));
    }

    #[test]
    fn test_single_entry_response() {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE];
        frame.extend_from_slice(&sample_entry(9).encode().unwrap());
        assert_eq!(parse_tcam_entry(&frame, 0).unwrap(), Some(sample_entry(9)));

        let mut frame = vec![0u8; PACKET_PREFIX_SIZE];
        frame.extend_from_slice(&end_marker());
        assert_eq!(parse_tcam_entry(&frame, 0).unwrap(), None);

        assert!(parse_tcam_entry(&[0u8; 60], 0).is_err());
    }
}
