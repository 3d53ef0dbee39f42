//! 802.1CB FRER tables through the Global 3 window
//!
//! Three tables share one window: sequence generation, individual recovery
//! and sequence recovery. Entries span up to three data registers and are
//! loaded or read in a single handshake. Everything returned here is an
//! owned copy of the data registers.

use msd_core::{BitField, BlockSelector, CommandOp, Error, RegisterCommand, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::bus::RegisterBus;
use crate::layout::{fir, WindowLayout};
use crate::retry::RetryPolicy;
use crate::window::IndirectWindow;

const ENABLE: BitField = BitField::bit(15);
const VECTOR_ALG: BitField = BitField::bit(14);
const TAKE_NO_SEQ: BitField = BitField::bit(13);
const INDIVIDUAL: BitField = BitField::bit(12);
const LATENT_ERROR: BitField = BitField::bit(15);
const STREAM_HANDLE: BitField = BitField::new(0, 12);
const HISTORY_LEN: BitField = BitField::new(0, 6);
const RESET_TIME: BitField = BitField::new(0, 12);
const RESULT_VALID: BitField = BitField::bit(15);
const RESULT_ID: BitField = BitField::new(0, 8);

/// Entry id that starts a `GetNext` scan from the beginning of a table
pub const GET_NEXT_START: u8 = 0xFF;

/// FRER table selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrerTable {
    /// Sequence generation
    SeqGen,
    /// Individual recovery
    IndvRcvy,
    /// Sequence recovery
    SeqRcvy,
}

impl FrerTable {
    /// Block selector of the table
    pub fn block(self) -> BlockSelector {
        match self {
            FrerTable::SeqGen => BlockSelector::SeqGen,
            FrerTable::IndvRcvy => BlockSelector::IndvRcvy,
            FrerTable::SeqRcvy => BlockSelector::SeqRcvy,
        }
    }

    /// Number of entries in the table
    pub fn max_entries(self) -> u16 {
        match self {
            FrerTable::SeqGen => 64,
            FrerTable::IndvRcvy => 64,
            FrerTable::SeqRcvy => 32,
        }
    }

    fn check_entry(self, entry_id: u8) -> Result<()> {
        if entry_id as u16 >= self.max_entries() {
            return Err(Error::bad_param(
                "entry_id",
                format!("{} out of range for {} ({} entries)", entry_id, self, self.max_entries()),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for FrerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block())
    }
}

/// Counter bank selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterBank {
    /// Bank 0
    Bank0,
    /// Bank 1
    Bank1,
}

impl CounterBank {
    fn block(self) -> BlockSelector {
        match self {
            CounterBank::Bank0 => BlockSelector::Bank0,
            CounterBank::Bank1 => BlockSelector::Bank1,
        }
    }
}

/// Sequence generation entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqGenEntry {
    pub enable: bool,
    pub stream_handle: u16,
    /// Next sequence number to generate
    pub seq_num: u16,
}

impl SeqGenEntry {
    fn to_words(self) -> Result<[u16; 2]> {
        let mut d0 = ENABLE.pack_u16(self.enable as u16)?;
        d0 = STREAM_HANDLE.insert_u16(d0, self.stream_handle)?;
        Ok([d0, self.seq_num])
    }

    fn from_words(words: &[u16]) -> Result<Self> {
        let [d0, d1] = data_words(words)?;
        Ok(Self {
            enable: ENABLE.extract_u16(d0) != 0,
            stream_handle: STREAM_HANDLE.extract_u16(d0),
            seq_num: d1,
        })
    }
}

/// Individual recovery entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndvRcvyEntry {
    pub enable: bool,
    /// Vector recovery algorithm instead of match recovery
    pub vector_alg: bool,
    pub history_len: u8,
    pub stream_handle: u16,
    pub reset_time: u16,
}

impl IndvRcvyEntry {
    fn to_words(self) -> Result<[u16; 3]> {
        let mut d0 = ENABLE.pack_u16(self.enable as u16)?;
        d0 = VECTOR_ALG.insert_u16(d0, self.vector_alg as u16)?;
        d0 = HISTORY_LEN.insert_u16(d0, self.history_len as u16)?;
        let d1 = STREAM_HANDLE.pack_u16(self.stream_handle)?;
        let d2 = RESET_TIME.pack_u16(self.reset_time)?;
        Ok([d0, d1, d2])
    }

    fn from_words(words: &[u16]) -> Result<Self> {
        let [d0, d1, d2] = data_words(words)?;
        Ok(Self {
            enable: ENABLE.extract_u16(d0) != 0,
            vector_alg: VECTOR_ALG.extract_u16(d0) != 0,
            history_len: HISTORY_LEN.extract_u16(d0) as u8,
            stream_handle: STREAM_HANDLE.extract_u16(d1),
            reset_time: RESET_TIME.extract_u16(d2),
        })
    }
}

/// Sequence recovery entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqRcvyEntry {
    pub enable: bool,
    pub vector_alg: bool,
    /// Accept frames without a sequence tag
    pub take_no_seq: bool,
    /// Individual rather than sequence recovery
    pub individual: bool,
    pub history_len: u8,
    /// Member streams, one bit per stream handle slot
    pub stream_mask: u16,
    pub latent_error: bool,
    pub reset_time: u16,
}

impl SeqRcvyEntry {
    fn to_words(self) -> Result<[u16; 3]> {
        let mut d0 = ENABLE.pack_u16(self.enable as u16)?;
        d0 = VECTOR_ALG.insert_u16(d0, self.vector_alg as u16)?;
        d0 = TAKE_NO_SEQ.insert_u16(d0, self.take_no_seq as u16)?;
        d0 = INDIVIDUAL.insert_u16(d0, self.individual as u16)?;
        d0 = HISTORY_LEN.insert_u16(d0, self.history_len as u16)?;
        let mut d2 = LATENT_ERROR.pack_u16(self.latent_error as u16)?;
        d2 = RESET_TIME.insert_u16(d2, self.reset_time)?;
        Ok([d0, self.stream_mask, d2])
    }

    fn from_words(words: &[u16]) -> Result<Self> {
        let [d0, d1, d2] = data_words(words)?;
        Ok(Self {
            enable: ENABLE.extract_u16(d0) != 0,
            vector_alg: VECTOR_ALG.extract_u16(d0) != 0,
            take_no_seq: TAKE_NO_SEQ.extract_u16(d0) != 0,
            individual: INDIVIDUAL.extract_u16(d0) != 0,
            history_len: HISTORY_LEN.extract_u16(d0) as u8,
            stream_mask: d1,
            latent_error: LATENT_ERROR.extract_u16(d2) != 0,
            reset_time: RESET_TIME.extract_u16(d2),
        })
    }
}

/// Reset counter of a recovery entry, read and cleared in one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetCounters {
    pub entry_id: u8,
    pub resets: u32,
}

/// Sequence recovery violation report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqRcvyViolation {
    pub entry_id: u8,
    pub rogue: bool,
    pub out_of_order: bool,
    pub lost: bool,
    pub tagless: bool,
}

impl fmt::Display for SeqRcvyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry {}:", self.entry_id)?;
        for (set, name) in [
            (self.rogue, "rogue"),
            (self.out_of_order, "out-of-order"),
            (self.lost, "lost"),
            (self.tagless, "tagless"),
        ] {
            if set {
                write!(f, " {}", name)?;
            }
        }
        Ok(())
    }
}

fn data_words<const N: usize>(words: &[u16]) -> Result<[u16; N]> {
    words
        .get(..N)
        .and_then(|w| <[u16; N]>::try_from(w).ok())
        .ok_or_else(|| Error::protocol(format!("expected {} data words, got {}", N, words.len())))
}

/// FRER table access
pub struct Frer<B: RegisterBus + ?Sized> {
    bus: Arc<B>,
    window: IndirectWindow,
    lock: Mutex<()>,
}

impl<B: RegisterBus + ?Sized> Frer<B> {
    /// Fir FRER window
    pub fn new(bus: Arc<B>) -> Self {
        Self::with_layout(bus, fir::FRER)
    }

    /// FRER access through another chip's window layout
    pub fn with_layout(bus: Arc<B>, layout: WindowLayout) -> Self {
        Self {
            bus,
            window: IndirectWindow::new(layout),
            lock: Mutex::new(()),
        }
    }

    /// Override the polling policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.window = self.window.with_retry(retry);
        self
    }

    /// Underlying window
    pub fn window(&self) -> &IndirectWindow {
        &self.window
    }

    fn run(&self, op: CommandOp, block: BlockSelector, entry_id: u8, words: &[u16]) -> Result<Vec<u16>> {
        let cmd = RegisterCommand::new(op, 0, entry_id as u16).with_block(block);
        let _guard = self.lock.lock();
        self.window.execute_words(&*self.bus, &cmd, words)
    }

    /// Invalidate every entry of `table`
    pub fn flush_all(&self, table: FrerTable) -> Result<()> {
        self.run(CommandOp::FlushAll, table.block(), 0, &[])?;
        debug!(table = %table, "flushed");
        Ok(())
    }

    /// Invalidate one entry of `table`
    pub fn flush_entry(&self, table: FrerTable, entry_id: u8) -> Result<()> {
        table.check_entry(entry_id)?;
        self.run(CommandOp::FlushOne, table.block(), entry_id, &[])?;
        Ok(())
    }

    /// Load a sequence generation entry
    pub fn load_seq_gen(&self, entry_id: u8, entry: &SeqGenEntry) -> Result<()> {
        FrerTable::SeqGen.check_entry(entry_id)?;
        let words = entry.to_words()?;
        self.run(CommandOp::Load, BlockSelector::SeqGen, entry_id, &words)?;
        Ok(())
    }

    /// Read a sequence generation entry
    pub fn read_seq_gen(&self, entry_id: u8) -> Result<SeqGenEntry> {
        FrerTable::SeqGen.check_entry(entry_id)?;
        let words = self.run(CommandOp::Read, BlockSelector::SeqGen, entry_id, &[])?;
        SeqGenEntry::from_words(&words)
    }

    /// Load an individual recovery entry
    pub fn load_indv_rcvy(&self, entry_id: u8, entry: &IndvRcvyEntry) -> Result<()> {
        FrerTable::IndvRcvy.check_entry(entry_id)?;
        let words = entry.to_words()?;
        self.run(CommandOp::Load, BlockSelector::IndvRcvy, entry_id, &words)?;
        Ok(())
    }

    /// Read an individual recovery entry
    pub fn read_indv_rcvy(&self, entry_id: u8) -> Result<IndvRcvyEntry> {
        FrerTable::IndvRcvy.check_entry(entry_id)?;
        let words = self.run(CommandOp::Read, BlockSelector::IndvRcvy, entry_id, &[])?;
        IndvRcvyEntry::from_words(&words)
    }

    /// Load a sequence recovery entry
    pub fn load_seq_rcvy(&self, entry_id: u8, entry: &SeqRcvyEntry) -> Result<()> {
        FrerTable::SeqRcvy.check_entry(entry_id)?;
        let words = entry.to_words()?;
        self.run(CommandOp::Load, BlockSelector::SeqRcvy, entry_id, &words)?;
        Ok(())
    }

    /// Read a sequence recovery entry
    pub fn read_seq_rcvy(&self, entry_id: u8) -> Result<SeqRcvyEntry> {
        FrerTable::SeqRcvy.check_entry(entry_id)?;
        let words = self.run(CommandOp::Read, BlockSelector::SeqRcvy, entry_id, &[])?;
        SeqRcvyEntry::from_words(&words)
    }

    /// First valid entry after `after`, or from the start with [`GET_NEXT_START`]
    ///
    /// Only the recovery tables support the search.
    pub fn get_next(&self, table: FrerTable, after: u8) -> Result<Option<u8>> {
        if after != GET_NEXT_START {
            table.check_entry(after)?;
        }
        let words = self.run(CommandOp::GetNext, table.block(), after, &[])?;
        let [_, _, _, result] = data_words(&words)?;
        if RESULT_VALID.extract_u16(result) == 0 {
            return Ok(None);
        }
        Ok(Some(RESULT_ID.extract_u16(result) as u8))
    }

    /// Ids of every valid entry of a recovery table, in table order
    pub fn valid_entries(&self, table: FrerTable) -> Result<Vec<u8>> {
        let mut ids = Vec::new();
        let mut cursor = GET_NEXT_START;
        while let Some(id) = self.get_next(table, cursor)? {
            // the search wraps around at the end of the table
            if cursor != GET_NEXT_START && id <= cursor {
                break;
            }
            ids.push(id);
            cursor = id;
        }
        Ok(ids)
    }

    /// Read and clear the reset counter of a recovery entry
    pub fn read_clear_counters(&self, table: FrerTable, entry_id: u8) -> Result<ResetCounters> {
        table.check_entry(entry_id)?;
        let words = self.run(CommandOp::ReadClear, table.block(), entry_id, &[])?;
        let [hi, lo] = data_words(&words)?;
        Ok(ResetCounters {
            entry_id,
            resets: ((hi as u32) << 16) | lo as u32,
        })
    }

    /// Pending sequence recovery violation, if any
    pub fn get_violation(&self) -> Result<Option<SeqRcvyViolation>> {
        let words = self.run(CommandOp::GetViolation, BlockSelector::SeqRcvy, 0, &[])?;
        let [d0, d1] = data_words(&words)?;
        if RESULT_VALID.extract_u16(d0) == 0 {
            return Ok(None);
        }
        Ok(Some(SeqRcvyViolation {
            entry_id: RESULT_ID.extract_u16(d0) as u8,
            rogue: d1 & 0x1 != 0,
            out_of_order: d1 & 0x2 != 0,
            lost: d1 & 0x4 != 0,
            tagless: d1 & 0x8 != 0,
        }))
    }

    /// Read a 32-bit counter from a counter bank
    pub fn read_bank_counter(&self, bank: CounterBank, index: u8) -> Result<u32> {
        let words = self.run(CommandOp::Read, bank.block(), index, &[])?;
        let [hi, lo] = data_words(&words)?;
        Ok(((hi as u32) << 16) | lo as u32)
    }
}
