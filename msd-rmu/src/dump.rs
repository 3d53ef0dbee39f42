//! Paged table-dump parsing shared by ATU, ECID and TCAM
//!
//! A dump response body is a run of fixed-width records. The page ends at a
//! terminator record, at a tail too short for another record, or after the
//! per-packet maximum; only in the last case do the two bytes that follow
//! carry the continuation address of the next page. Each table decides which
//! continuation words are end-of-data sentinels.

use msd_core::{Error, Result};
use std::fmt;

use crate::frame::PACKET_PREFIX_SIZE;

/// Continuation token of a paged dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TableDumpCursor(pub u32);

impl TableDumpCursor {
    /// Cursor of the first page
    pub const START: TableDumpCursor = TableDumpCursor(0);

    /// Start address as carried in a request
    pub fn to_word(self) -> Result<u16> {
        u16::try_from(self.0).map_err(|_| {
            Error::bad_param("start_address", format!("{:#x} exceeds 16 bits", self.0))
        })
    }
}

impl From<u16> for TableDumpCursor {
    fn from(word: u16) -> Self {
        TableDumpCursor(word as u32)
    }
}

impl fmt::Display for TableDumpCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// One page of a table dump
#[derive(Debug, Clone, PartialEq)]
pub struct DumpPage<T> {
    /// Valid entries of this page
    pub entries: Vec<T>,
    /// Where the next page starts, when the page was full
    pub continuation: Option<TableDumpCursor>,
}

impl<T> DumpPage<T> {
    /// Whether the page carried no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether another page follows
    pub fn has_more(&self) -> bool {
        self.continuation.is_some()
    }
}

/// A fixed-width record that can appear in a dump page
pub trait DumpRecord: Sized {
    /// Table name used in errors and logs
    const NAME: &'static str;
    /// Record width in bytes
    const SIZE: usize;
    /// Maximum records per response
    const MAX_PER_PACKET: usize;

    /// Whether these bytes mark the end of the page
    fn is_terminator(bytes: &[u8]) -> Result<bool>;

    /// Decode one record of exactly `SIZE` bytes
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Encode one record into `SIZE` bytes
    fn encode(&self) -> Result<Vec<u8>>;

    /// Start cursor of the next page for a continuation word
    ///
    /// `None` when the word is an end-of-data sentinel.
    fn next_cursor(continuation: TableDumpCursor) -> Option<TableDumpCursor> {
        Some(continuation)
    }
}

/// Parse one dump page out of a complete response frame
pub fn parse_page<T: DumpRecord>(buffer: &[u8], delta: usize) -> Result<DumpPage<T>> {
    let start = PACKET_PREFIX_SIZE.checked_sub(delta).ok_or_else(|| {
        Error::bad_param("delta", format!("{} larger than the RMU prefix", delta))
    })?;
    let body = buffer.get(start..).ok_or_else(|| {
        Error::parsing(format!(
            "{} dump of {} bytes shorter than {} byte prefix",
            T::NAME,
            buffer.len(),
            start
        ))
    })?;

    let mut entries = Vec::new();
    let mut pos = 0;
    while entries.len() < T::MAX_PER_PACKET {
        let Some(bytes) = body.get(pos..pos + T::SIZE) else {
            break;
        };
        if T::is_terminator(bytes)? {
            break;
        }
        entries.push(T::decode(bytes)?);
        pos += T::SIZE;
    }

    let continuation = if entries.len() == T::MAX_PER_PACKET {
        let bytes = body.get(pos..pos + 2).ok_or_else(|| {
            Error::parsing(format!(
                "full {} page without continuation address",
                T::NAME
            ))
        })?;
        T::next_cursor(TableDumpCursor::from(u16::from_be_bytes([bytes[0], bytes[1]])))
    } else {
        None
    };

    Ok(DumpPage {
        entries,
        continuation,
    })
}

/// Encode a page body: records, then a terminator or the continuation
///
/// Used by responders and tests. `terminator` is appended only when the page
/// is not full.
pub fn encode_page<T: DumpRecord>(
    entries: &[T],
    continuation: Option<TableDumpCursor>,
    terminator: &[u8],
) -> Result<Vec<u8>> {
    if entries.len() > T::MAX_PER_PACKET {
        return Err(Error::bad_param(
            "entries",
            format!("{} exceeds {} per {} page", entries.len(), T::MAX_PER_PACKET, T::NAME),
        ));
    }
    let mut body = Vec::with_capacity(entries.len() * T::SIZE + T::SIZE);
    for entry in entries {
        body.extend_from_slice(&entry.encode()?);
    }
    if entries.len() == T::MAX_PER_PACKET {
        let next = continuation.unwrap_or_default().to_word()?;
        body.extend_from_slice(&next.to_be_bytes());
    } else {
        body.extend_from_slice(terminator);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair(u16);

    impl DumpRecord for Pair {
        const NAME: &'static str = "PAIR";
        const SIZE: usize = 2;
        const MAX_PER_PACKET: usize = 3;

        fn is_terminator(bytes: &[u8]) -> Result<bool> {
            Ok(bytes == [0, 0])
        }

        fn decode(bytes: &[u8]) -> Result<Self> {
            Ok(Pair(u16::from_be_bytes([bytes[0], bytes[1]])))
        }

        fn encode(&self) -> Result<Vec<u8>> {
            Ok(self.0.to_be_bytes().to_vec())
        }
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE];
        frame.extend_from_slice(body);
        frame
    }

    #[test]
    fn test_full_page_reads_continuation() {
        let page: DumpPage<Pair> = parse_page(&frame(&[0, 1, 0, 2, 0, 3, 0x12, 0x34]), 0).unwrap();
        assert_eq!(page.entries, vec![Pair(1), Pair(2), Pair(3)]);
        assert_eq!(page.continuation, Some(TableDumpCursor(0x1234)));
        assert!(page.has_more());
    }

    #[test]
    fn test_full_page_missing_continuation() {
        let result: Result<DumpPage<Pair>> = parse_page(&frame(&[0, 1, 0, 2, 0, 3]), 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_terminator_not_counted() {
        let page: DumpPage<Pair> = parse_page(&frame(&[0, 1, 0, 0, 0, 3]), 0).unwrap();
        assert_eq!(page.entries, vec![Pair(1)]);
        assert_eq!(page.continuation, None);
    }

    #[test]
    fn test_short_tail_stops() {
        let page: DumpPage<Pair> = parse_page(&frame(&[0, 1, 0]), 0).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(!page.has_more());
    }

    #[test]
    fn test_delta_shifts_body() {
        let mut buf = vec![0u8; PACKET_PREFIX_SIZE - 4];
        buf.extend_from_slice(&[0, 7]);
        let page: DumpPage<Pair> = parse_page(&buf, 4).unwrap();
        assert_eq!(page.entries, vec![Pair(7)]);
    }

    #[test]
    fn test_truncated_prefix() {
        let result: Result<DumpPage<Pair>> = parse_page(&[0u8; 10], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_page() {
        let body = encode_page(&[Pair(1)], None, &[0, 0]).unwrap();
        assert_eq!(body, vec![0, 1, 0, 0]);

        let body = encode_page(
            &[Pair(1), Pair(2), Pair(3)],
            Some(TableDumpCursor(0x40)),
            &[0, 0],
        )
        .unwrap();
        assert_eq!(&body[6..], &[0x00, 0x40]);

        assert!(encode_page(&[Pair(1), Pair(2), Pair(3), Pair(4)], None, &[]).is_err());
    }

    #[test]
    fn test_cursor_width() {
        assert_eq!(TableDumpCursor(0xFFFF).to_word().unwrap(), 0xFFFF);
        assert!(TableDumpCursor(0x1_0000).to_word().is_err());
        assert_eq!(TableDumpCursor(0x20).to_string(), "0x0020");
    }
}
