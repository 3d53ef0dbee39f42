//! Address Translation Unit dump records
//!
//! ```text
//! w0:  | trunk (1) | port vector (11) | entry state (4) |
//! w1..w3: MAC address
//! w4:  | - (1) | priority (3) | FID (12) |
//! ```

use msd_core::{BitField, Error, MacAddr, Result, WordReader, WordWriter};
use std::fmt;

use crate::dump::{parse_page, DumpPage, DumpRecord, TableDumpCursor};
use crate::ecid::ECID_MODE;

/// ATU entries per dump response
pub const MAX_ATUS: usize = 48;

/// Width of one ATU record
pub const ATU_ENTRY_SIZE: usize = 10;

const ENTRY_STATE: BitField = BitField::new(0, 4);
const PORT_VEC: BitField = BitField::new(4, 11);
const TRUNK: BitField = BitField::bit(15);
const FID: BitField = BitField::new(0, 12);
const PRIORITY: BitField = BitField::new(12, 3);

/// One forwarding-database entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtuEntry {
    /// Entry state; 0 marks an unused slot
    pub entry_state: u8,
    /// Destination port vector, or trunk id when `trunk` is set
    pub port_vec: u16,
    /// Whether `port_vec` holds a trunk id
    pub trunk: bool,
    /// Station MAC address
    pub mac: MacAddr,
    /// Forwarding database id
    pub fid: u16,
    /// MAC priority override
    pub priority: u8,
}

impl AtuEntry {
    /// Static entry forwarding `mac` to `port_vec` in database `fid`
    pub fn new(mac: MacAddr, port_vec: u16, fid: u16) -> Self {
        Self {
            entry_state: 0xF,
            port_vec,
            trunk: false,
            mac,
            fid,
            priority: 0,
        }
    }

    /// Whether the entry is static (state 0xF for unicast, 0x7 for multicast)
    pub fn is_static(&self) -> bool {
        if self.mac.is_multicast() {
            self.entry_state == 0x7 || self.entry_state == 0xF
        } else {
            self.entry_state == 0xF
        }
    }
}

impl DumpRecord for AtuEntry {
    const NAME: &'static str = "ATU";
    const SIZE: usize = ATU_ENTRY_SIZE;
    const MAX_PER_PACKET: usize = MAX_ATUS;

    fn is_terminator(bytes: &[u8]) -> Result<bool> {
        Ok(WordReader::new(bytes).field(0, ENTRY_STATE)? == 0)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let words = WordReader::new(bytes);
        let mac = MacAddr::from_slice(bytes.get(2..8).unwrap_or_default())
            .ok_or_else(|| Error::parsing("ATU entry truncated"))?;
        Ok(Self {
            entry_state: words.field_u8(0, ENTRY_STATE)?,
            port_vec: words.field(0, PORT_VEC)?,
            trunk: words.field(0, TRUNK)? != 0,
            mac,
            fid: words.field(4, FID)?,
            priority: words.field_u8(4, PRIORITY)?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut words = WordWriter::new(ATU_ENTRY_SIZE / 2);
        words.set_field(0, ENTRY_STATE, self.entry_state as u16)?;
        words.set_field(0, PORT_VEC, self.port_vec)?;
        words.set_field(0, TRUNK, self.trunk as u16)?;
        let mac = self.mac.octets();
        for i in 0..3 {
            words.set(1 + i, u16::from_be_bytes([mac[2 * i], mac[2 * i + 1]]))?;
        }
        words.set_field(4, FID, self.fid)?;
        words.set_field(4, PRIORITY, self.priority as u16)?;
        Ok(words.to_bytes())
    }

    // The ATU and ECID tables share one cursor space; a continuation with
    // the ECID mode bit set lies past the last ATU entry.
    fn next_cursor(continuation: TableDumpCursor) -> Option<TableDumpCursor> {
        (continuation.0 & u32::from(ECID_MODE) == 0).then_some(continuation)
    }
}

impl fmt::Display for AtuEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} fid={} state={:#x} {}={:#05x} pri={}",
            self.mac,
            self.fid,
            self.entry_state,
            if self.trunk { "trunk" } else { "ports" },
            self.port_vec,
            self.priority
        )
    }
}

/// Parse one ATU dump response
pub fn parse_atu(buffer: &[u8], delta: usize) -> Result<DumpPage<AtuEntry>> {
    parse_page(buffer, delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_layout() {
        let entry = AtuEntry {
            entry_state: 0xE,
            port_vec: 0x405,
            trunk: true,
            mac: MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]),
            fid: 0x123,
            priority: 5,
        };
        let bytes = entry.encode().unwrap();
        assert_eq!(bytes.len(), ATU_ENTRY_SIZE);
        // trunk | port_vec << 4 | state
        assert_eq!(&bytes[0..2], &[0xC0, 0x5E]);
        assert_eq!(&bytes[2..8], entry.mac.as_bytes());
        assert_eq!(&bytes[8..10], &[0x51, 0x23]);
        assert_eq!(AtuEntry::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_terminator() {
        assert!(AtuEntry::is_terminator(&[0xFF, 0xF0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap());
        assert!(!AtuEntry::is_terminator(&[0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap());
    }

    #[test]
    fn test_field_overflow() {
        let mut entry = AtuEntry::new(MacAddr::zero(), 0x7FF, 1);
        entry.port_vec = 0x800;
        assert!(entry.encode().is_err());
    }

    #[test]
    fn test_static_state() {
        let unicast = AtuEntry::new(MacAddr([0, 1, 2, 3, 4, 5]), 1, 0);
        assert!(unicast.is_static());
        let mut multicast = AtuEntry::new(MacAddr([1, 0, 0x5E, 0, 0, 1]), 1, 0);
        multicast.entry_state = 0x7;
        assert!(multicast.is_static());
        multicast.entry_state = 0x3;
        assert!(!multicast.is_static());
    }

    #[test]
    fn test_ecid_space_ends_atu_dump() {
        let entry = AtuEntry::new(MacAddr([0, 1, 2, 3, 4, 5]), 1, 0);
        let mut frame = vec![0u8; 28];
        for _ in 0..MAX_ATUS {
            frame.extend_from_slice(&entry.encode().unwrap());
        }
        frame.extend_from_slice(&[0x20, 0x00]);

        let page = parse_atu(&frame, 0).unwrap();
        assert_eq!(page.entries.len(), MAX_ATUS);
        assert_eq!(page.continuation, None);
        assert_eq!(
            AtuEntry::next_cursor(TableDumpCursor(0x07FF)),
            Some(TableDumpCursor(0x07FF))
        );
    }
}
