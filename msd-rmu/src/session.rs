//! Request/response sessions over a frame transport
//!
//! The protocol is half duplex: one request is outstanding at a time and its
//! response is recognised by the echoed sequence number. Frames that do not
//! match are dropped, up to `max_drops` per request.

use msd_capture::{FrameTransport, StatsAccumulator, TransportStats};
use msd_core::{Error, FramingMode, RegisterCommand, Result};
use msd_packet::dsa::MAX_DEVICE;
use msd_packet::{stamp_source, DsaFraming, TagCommand, DEFAULT_EDSA_ETHERTYPE};
use tracing::{debug, info, trace, warn};

use crate::atu::{parse_atu, AtuEntry};
use crate::batch;
use crate::dump::{DumpPage, TableDumpCursor};
use crate::ecid::{parse_ecid, EcidEntry};
use crate::mib::{parse_mib, StatsCounterSet};
use crate::request::{RmuCommand, RmuRequest};
use crate::response::{decode_response, FirmwareVersion, RmuIdentity, RmuResponse};
use crate::tcam::{parse_tcam, parse_tcam_entry, TcamEntry, TcamOp, TCAM_END_MARKER};

/// Default number of unmatched frames tolerated per request
pub const DEFAULT_MAX_DROPS: u32 = 10;

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RmuConfig {
    /// Tag framing
    pub framing: FramingMode,
    /// EtherType for EtherType-DSA framing
    pub ether_type: u16,
    /// Device number in the cascade
    pub target_device: u8,
    /// Unmatched frames or receive timeouts tolerated per request
    pub max_drops: u32,
}

impl Default for RmuConfig {
    fn default() -> Self {
        Self {
            framing: FramingMode::EtherTypeDsa,
            ether_type: DEFAULT_EDSA_ETHERTYPE,
            target_device: 0,
            max_drops: DEFAULT_MAX_DROPS,
        }
    }
}

impl RmuConfig {
    /// Set the framing mode
    pub fn with_framing(mut self, framing: FramingMode) -> Self {
        self.framing = framing;
        self
    }

    /// Set the EDSA EtherType
    pub fn with_ether_type(mut self, ether_type: u16) -> Self {
        self.ether_type = ether_type;
        self
    }

    /// Set the target device
    pub fn with_target_device(mut self, device: u8) -> Self {
        self.target_device = device;
        self
    }

    /// Set the drop budget
    pub fn with_max_drops(mut self, max_drops: u32) -> Self {
        self.max_drops = max_drops;
        self
    }

    /// Framing descriptor
    pub fn dsa_framing(&self) -> DsaFraming {
        DsaFraming::new(self.framing, self.ether_type)
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if self.target_device > MAX_DEVICE {
            return Err(Error::bad_param(
                "target_device",
                format!("{} exceeds {}", self.target_device, MAX_DEVICE),
            ));
        }
        if self.max_drops == 0 {
            return Err(Error::bad_param("max_drops", "must be at least 1"));
        }
        Ok(())
    }
}

/// One management link to one device
pub struct RmuSession<T: FrameTransport> {
    transport: T,
    config: RmuConfig,
    framing: DsaFraming,
    sequence: u8,
    stats: StatsAccumulator,
}

impl<T: FrameTransport> RmuSession<T> {
    /// Create a session starting at a random sequence number
    pub fn new(transport: T, config: RmuConfig) -> Result<Self> {
        Self::with_sequence(transport, config, rand::random())
    }

    /// Create a session with a fixed first sequence number
    pub fn with_sequence(transport: T, config: RmuConfig, sequence: u8) -> Result<Self> {
        config.validate()?;
        info!(
            framing = %config.framing,
            device = config.target_device,
            "RMU session opened"
        );
        Ok(Self {
            transport,
            framing: config.dsa_framing(),
            config,
            sequence,
            stats: StatsAccumulator::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RmuConfig {
        &self.config
    }

    /// Traffic statistics
    pub fn stats(&self) -> TransportStats {
        self.stats.snapshot()
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the session and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn next_sequence(&mut self) -> u8 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }

    /// Send one request and wait for its response
    pub fn transact(&mut self, command: RmuCommand) -> Result<RmuResponse> {
        let sequence = self.next_sequence();
        let code = command.request_code();
        debug!(seq = sequence, code, "RMU {}", command);

        let request = RmuRequest::new(command, sequence, self.framing, self.config.target_device);
        let mut frame = request.encode()?;
        stamp_source(&mut frame, self.transport.local_mac())?;
        self.transport.send(&frame)?;
        self.stats.record_sent(frame.len());

        let mut last_mismatch = None;
        for _ in 0..self.config.max_drops {
            let Some(frame) = self.transport.recv()? else {
                self.stats.record_timeout();
                trace!(seq = sequence, "receive timeout");
                continue;
            };
            self.stats.record_received(frame.len());

            let response = match decode_response(frame, &self.framing) {
                Ok(response) => response,
                Err(e) => {
                    trace!("dropping non-RMU frame: {}", e);
                    self.stats.record_drop();
                    continue;
                }
            };
            if response.tag().command == TagCommand::FromCpu
                || response.tag().device != self.config.target_device
            {
                trace!(device = response.tag().device, "dropping frame not from target");
                self.stats.record_drop();
                continue;
            }
            if response.sequence() != sequence {
                debug!(
                    expected = sequence,
                    actual = response.sequence(),
                    "dropping stale response"
                );
                last_mismatch = Some(response.sequence());
                self.stats.record_drop();
                continue;
            }
            if response.code() != code {
                return Err(Error::protocol(format!(
                    "response code {:#06x} does not match request {:#06x}",
                    response.code(),
                    code
                )));
            }
            return Ok(response);
        }

        warn!(
            seq = sequence,
            budget = self.config.max_drops,
            "no matching RMU response"
        );
        match last_mismatch {
            Some(actual) => Err(Error::SequenceMismatch {
                expected: sequence,
                actual,
            }),
            None => Err(Error::protocol(format!(
                "no response to sequence {} within {} frames",
                sequence, self.config.max_drops
            ))),
        }
    }

    /// Read the product number
    pub fn get_id(&mut self) -> Result<RmuIdentity> {
        let response = self.transact(RmuCommand::GetId)?;
        Ok(RmuIdentity::from_response(&response))
    }

    /// Read the firmware version
    pub fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        let response = self.transact(RmuCommand::FwVersionGet)?;
        FirmwareVersion::from_response(&response)
    }

    /// Fetch one ATU page
    pub fn dump_atu_page(&mut self, cursor: TableDumpCursor) -> Result<DumpPage<AtuEntry>> {
        let start = cursor.to_word()?;
        let response = self.transact(RmuCommand::DumpAtu { start })?;
        parse_atu(response.bytes(), response.delta())
    }

    /// Fetch the whole ATU
    pub fn dump_atu_all(&mut self) -> Result<Vec<AtuEntry>> {
        self.dump_all("ATU", Self::dump_atu_page)
    }

    /// Fetch one ECID page
    pub fn dump_ecid_page(&mut self, cursor: TableDumpCursor) -> Result<DumpPage<EcidEntry>> {
        let start = cursor.to_word()?;
        let response = self.transact(RmuCommand::DumpEcid { start })?;
        parse_ecid(response.bytes(), response.delta())
    }

    /// Fetch the whole ECID table
    pub fn dump_ecid_all(&mut self) -> Result<Vec<EcidEntry>> {
        self.dump_all("ECID", Self::dump_ecid_page)
    }

    /// Fetch one TCAM page
    pub fn dump_tcam_page(&mut self, cursor: TableDumpCursor) -> Result<DumpPage<TcamEntry>> {
        let start = cursor.to_word()?;
        let response = self.transact(RmuCommand::DumpTcam { start })?;
        parse_tcam(response.bytes(), response.delta())
    }

    /// Fetch every valid TCAM entry
    pub fn dump_tcam_all(&mut self) -> Result<Vec<TcamEntry>> {
        self.dump_all("TCAM", Self::dump_tcam_page)
    }

    fn dump_all<E>(
        &mut self,
        table: &str,
        mut fetch: impl FnMut(&mut Self, TableDumpCursor) -> Result<DumpPage<E>>,
    ) -> Result<Vec<E>> {
        let mut cursor = TableDumpCursor::START;
        let mut entries = Vec::new();
        loop {
            let page = fetch(self, cursor)?;
            debug!(
                cursor = %cursor,
                count = page.entries.len(),
                more = page.has_more(),
                "{} page",
                table
            );
            if page.is_empty() {
                break;
            }
            entries.extend(page.entries);
            match page.continuation {
                None => break,
                Some(next) if next == cursor => {
                    return Err(Error::protocol(format!(
                        "{} dump did not advance past {}",
                        table, cursor
                    )))
                }
                Some(next) => cursor = next,
            }
        }
        Ok(entries)
    }

    /// Read the MIB-II counters of a port
    pub fn dump_mib(&mut self, port: u8, clear: bool) -> Result<StatsCounterSet> {
        let response = self.transact(RmuCommand::DumpMib2 { port, clear })?;
        parse_mib(response.bytes(), response.delta())
    }

    /// Run a register batch; returns one data word per command
    pub fn reg_rw(&mut self, commands: &[RegisterCommand]) -> Result<Vec<u16>> {
        // encode once up front so bad parameters never reach the wire
        batch::encode(commands)?;
        let response = self.transact(RmuCommand::RegRw(commands.to_vec()))?;
        batch::decode_checked(response.bytes(), response.delta(), commands)
    }

    /// Read `(device, register)` pairs
    pub fn read_registers(&mut self, registers: &[(u8, u8)]) -> Result<Vec<u16>> {
        let commands: Vec<_> = registers
            .iter()
            .map(|&(dev, reg)| RegisterCommand::read(dev, reg))
            .collect();
        self.reg_rw(&commands)
    }

    /// Write `(device, register, data)` triples
    pub fn write_registers(&mut self, writes: &[(u8, u8, u16)]) -> Result<()> {
        let commands: Vec<_> = writes
            .iter()
            .map(|&(dev, reg, data)| RegisterCommand::write(dev, reg, data))
            .collect();
        self.reg_rw(&commands).map(|_| ())
    }

    fn tcam_rw(&mut self, op: TcamOp, entry: TcamEntry) -> Result<RmuResponse> {
        self.transact(RmuCommand::TcamRw {
            op,
            pointer: entry.pointer,
            entry: Box::new(entry),
        })
    }

    /// Read one TCAM entry
    pub fn tcam_read(&mut self, pointer: u8) -> Result<TcamEntry> {
        let response = self.tcam_rw(TcamOp::Read, TcamEntry::new(pointer))?;
        parse_tcam_entry(response.bytes(), response.delta())?
            .ok_or_else(|| Error::protocol(format!("TCAM entry {} not returned", pointer)))
    }

    /// Next valid TCAM entry after `pointer`, if any
    pub fn tcam_get_next(&mut self, pointer: u8) -> Result<Option<TcamEntry>> {
        let response = self.tcam_rw(TcamOp::GetNext, TcamEntry::new(pointer))?;
        parse_tcam_entry(response.bytes(), response.delta())
    }

    /// Write one TCAM entry
    pub fn tcam_load(&mut self, entry: &TcamEntry) -> Result<()> {
        if entry.pointer as u16 == TCAM_END_MARKER {
            return Err(Error::bad_param("pointer", "0xff is reserved"));
        }
        self.tcam_rw(TcamOp::Load, *entry).map(|_| ())
    }

    /// Invalidate every TCAM entry
    pub fn tcam_flush_all(&mut self) -> Result<()> {
        self.tcam_rw(TcamOp::FlushAll, TcamEntry::new(0)).map(|_| ())
    }

    /// Invalidate one TCAM entry
    pub fn tcam_flush_entry(&mut self, pointer: u8) -> Result<()> {
        self.tcam_rw(TcamOp::FlushOne, TcamEntry::new(pointer))
            .map(|_| ())
    }
}
