//! E-CID (802.1BR) dump records
//!
//! ECID dumps share the request code and cursor space of the ATU dump; the
//! request start word carries [`ECID_MODE`] to select the ECID table.

use msd_core::{BitField, Result, WordReader, WordWriter};
use std::fmt;

use crate::dump::{parse_page, DumpPage, DumpRecord, TableDumpCursor};

/// ECID entries per dump response
pub const MAX_ECIDS: usize = 48;

/// Width of one ECID record
pub const ECID_ENTRY_SIZE: usize = 10;

/// Mode bit selecting the ECID table in a dump start address
pub const ECID_MODE: u16 = 0x2000;

const ENTRY_STATE: BitField = BitField::new(0, 4);
const PORT_VEC: BitField = BitField::new(4, 11);
const GROUP: BitField = BitField::new(12, 2);
const ECID_BASE: BitField = BitField::new(0, 12);
const ECID_EXT: BitField = BitField::new(0, 8);
const PRIORITY: BitField = BitField::new(8, 3);
const PRIO_OVERRIDE: BitField = BitField::bit(11);
const LAG: BitField = BitField::bit(12);
const LAG_ID: BitField = BitField::new(0, 4);

/// One E-CID table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EcidEntry {
    /// Entry state; 0 marks an unused slot
    pub entry_state: u8,
    /// Member port vector
    pub port_vec: u16,
    /// E-CID group
    pub group: u8,
    /// E-CID base (12 bits)
    pub ecid_base: u16,
    /// E-CID extension (8 bits)
    pub ecid_ext: u8,
    /// Priority to assign
    pub priority: u8,
    /// Whether `priority` overrides the frame priority
    pub prio_override: bool,
    /// Whether `lag_id` is valid
    pub lag: bool,
    /// Link aggregation id
    pub lag_id: u8,
}

impl EcidEntry {
    /// Full 22-bit E-CID: group, extension and base
    pub fn ecid(&self) -> u32 {
        ((self.group as u32) << 20) | ((self.ecid_ext as u32) << 12) | self.ecid_base as u32
    }
}

impl DumpRecord for EcidEntry {
    const NAME: &'static str = "ECID";
    const SIZE: usize = ECID_ENTRY_SIZE;
    const MAX_PER_PACKET: usize = MAX_ECIDS;

    fn is_terminator(bytes: &[u8]) -> Result<bool> {
        Ok(WordReader::new(bytes).field(0, ENTRY_STATE)? == 0)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let words = WordReader::new(bytes);
        Ok(Self {
            entry_state: words.field_u8(0, ENTRY_STATE)?,
            port_vec: words.field(0, PORT_VEC)?,
            group: words.field_u8(1, GROUP)?,
            ecid_base: words.field(1, ECID_BASE)?,
            ecid_ext: words.field_u8(2, ECID_EXT)?,
            priority: words.field_u8(2, PRIORITY)?,
            prio_override: words.field(2, PRIO_OVERRIDE)? != 0,
            lag: words.field(2, LAG)? != 0,
            lag_id: words.field_u8(3, LAG_ID)?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut words = WordWriter::new(ECID_ENTRY_SIZE / 2);
        words.set_field(0, ENTRY_STATE, self.entry_state as u16)?;
        words.set_field(0, PORT_VEC, self.port_vec)?;
        words.set_field(1, GROUP, self.group as u16)?;
        words.set_field(1, ECID_BASE, self.ecid_base)?;
        words.set_field(2, ECID_EXT, self.ecid_ext as u16)?;
        words.set_field(2, PRIORITY, self.priority as u16)?;
        words.set_field(2, PRIO_OVERRIDE, self.prio_override as u16)?;
        words.set_field(2, LAG, self.lag as u16)?;
        words.set_field(3, LAG_ID, self.lag_id as u16)?;
        Ok(words.to_bytes())
    }

    /// Continuations come back with the mode bit set; a bare mode bit marks
    /// the end of the table.
    fn next_cursor(continuation: TableDumpCursor) -> Option<TableDumpCursor> {
        let address = continuation.0 & !u32::from(ECID_MODE);
        (address != 0).then_some(TableDumpCursor(address))
    }
}

impl fmt::Display for EcidEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ecid={:#08x} ports={:#05x} state={:#x}",
            self.ecid(),
            self.port_vec,
            self.entry_state
        )?;
        if self.lag {
            write!(f, " lag={}", self.lag_id)?;
        }
        Ok(())
    }
}

/// Parse one ECID dump response
pub fn parse_ecid(buffer: &[u8], delta: usize) -> Result<DumpPage<EcidEntry>> {
    parse_page(buffer, delta)
}
