//! MIB-II counter dumps
//!
//! The body of a DumpMIB2 response is the port word, a 32-bit timestamp and
//! 64 big-endian 32-bit counters in a fixed order.

use bytes::BufMut;
use msd_core::{Error, Result, WordReader};
use std::fmt;

use crate::frame::PACKET_PREFIX_SIZE;

/// Counters per dump
pub const MIB_COUNTERS: usize = 64;

/// Bytes of a MIB-II body: port, timestamp, counters
pub const MIB_BODY_SIZE: usize = 2 + 4 + MIB_COUNTERS * 4;

/// Minimum EtherType-DSA frame length of a MIB-II response
pub const MIB_FRAME_SIZE: usize = PACKET_PREFIX_SIZE + MIB_BODY_SIZE;

/// Position of a counter in the dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCounter {
    InGoodOctetsLo,
    InGoodOctetsHi,
    InBadOctets,
    OutFcsErr,
    InUnicasts,
    Deferred,
    InBroadcasts,
    InMulticasts,
    Octets64,
    Octets127,
    Octets255,
    Octets511,
    Octets1023,
    OctetsMax,
    OutOctetsLo,
    OutOctetsHi,
    OutUnicasts,
    Excessive,
    OutMulticasts,
    OutBroadcasts,
    Single,
    OutPause,
    InPause,
    Multiple,
    InUndersize,
    InFragments,
    InOversize,
    InJabber,
    InRxErr,
    InFcsErr,
    Collisions,
    Late,
    InDiscards,
    InFiltered,
    InAccepted,
    InBadAccepted,
    InGoodAvbClassA,
    InGoodAvbClassB,
    InBadAvbClassA,
    InBadAvbClassB,
    TcamCounter0,
    TcamCounter1,
    TcamCounter2,
    TcamCounter3,
    InDroppedAvbA,
    InDroppedAvbB,
    InDaUnknown,
    InMgmt,
    OutQueue0,
    OutQueue1,
    OutQueue2,
    OutQueue3,
    OutQueue4,
    OutQueue5,
    OutQueue6,
    OutQueue7,
    OutCutThrough,
    OutOctetsA,
    OutOctetsB,
    OutYellow,
    OutDroppedYellow,
    OutDiscards,
    OutMgmt,
    DropEvents,
}

use StatCounter::*;

impl StatCounter {
    /// All counters in dump order
    pub const ALL: [StatCounter; MIB_COUNTERS] = [
        InGoodOctetsLo, InGoodOctetsHi, InBadOctets, OutFcsErr,
        InUnicasts, Deferred, InBroadcasts, InMulticasts,
        Octets64, Octets127, Octets255, Octets511,
        Octets1023, OctetsMax, OutOctetsLo, OutOctetsHi,
        OutUnicasts, Excessive, OutMulticasts, OutBroadcasts,
        Single, OutPause, InPause, Multiple,
        InUndersize, InFragments, InOversize, InJabber,
        InRxErr, InFcsErr, Collisions, Late,
        InDiscards, InFiltered, InAccepted, InBadAccepted,
        InGoodAvbClassA, InGoodAvbClassB, InBadAvbClassA, InBadAvbClassB,
        TcamCounter0, TcamCounter1, TcamCounter2, TcamCounter3,
        InDroppedAvbA, InDroppedAvbB, InDaUnknown, InMgmt,
        OutQueue0, OutQueue1, OutQueue2, OutQueue3,
        OutQueue4, OutQueue5, OutQueue6, OutQueue7,
        OutCutThrough, OutOctetsA, OutOctetsB, OutYellow,
        OutDroppedYellow, OutDiscards, OutMgmt, DropEvents,
    ];

    const NAMES: [&'static str; MIB_COUNTERS] = [
        "InGoodOctetsLo", "InGoodOctetsHi", "InBadOctets", "OutFCSErr",
        "InUnicasts", "Deferred", "InBroadcasts", "InMulticasts",
        "64Octets", "127Octets", "255Octets", "511Octets",
        "1023Octets", "MaxOctets", "OutOctetsLo", "OutOctetsHi",
        "OutUnicasts", "Excessive", "OutMulticasts", "OutBroadcasts",
        "Single", "OutPause", "InPause", "Multiple",
        "InUndersize", "InFragments", "InOversize", "InJabber",
        "InRxErr", "InFCSErr", "Collisions", "Late",
        "InDiscards", "InFiltered", "InAccepted", "InBadAccepted",
        "InGoodAvbClassA", "InGoodAvbClassB", "InBadAvbClassA", "InBadAvbClassB",
        "TCAMCounter0", "TCAMCounter1", "TCAMCounter2", "TCAMCounter3",
        "InDroppedAvbA", "InDroppedAvbB", "InDaUnknown", "InMGMT",
        "OutQueue0", "OutQueue1", "OutQueue2", "OutQueue3",
        "OutQueue4", "OutQueue5", "OutQueue6", "OutQueue7",
        "OutCutThrough", "OutOctetsA", "OutOctetsB", "OutYel",
        "OutDroppedYel", "OutDiscards", "OutMGMT", "DropEvents",
    ];

    /// Index in dump order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Counter name as printed by switch tools
    pub fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }
}

impl fmt::Display for StatCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters of one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsCounterSet {
    /// Port the counters belong to
    pub port: u16,
    /// Device timestamp of the snapshot
    pub timestamp: u32,
    /// Counters in dump order
    pub counters: [u32; MIB_COUNTERS],
}

impl Default for StatsCounterSet {
    fn default() -> Self {
        Self {
            port: 0,
            timestamp: 0,
            counters: [0; MIB_COUNTERS],
        }
    }
}

impl StatsCounterSet {
    /// Value of one counter
    pub fn get(&self, counter: StatCounter) -> u32 {
        self.counters[counter.index()]
    }

    /// Set one counter
    pub fn set(&mut self, counter: StatCounter, value: u32) {
        self.counters[counter.index()] = value;
    }

    /// 64-bit good octets received
    pub fn in_good_octets(&self) -> u64 {
        ((self.get(InGoodOctetsHi) as u64) << 32) | self.get(InGoodOctetsLo) as u64
    }

    /// 64-bit octets transmitted
    pub fn out_octets(&self) -> u64 {
        ((self.get(OutOctetsHi) as u64) << 32) | self.get(OutOctetsLo) as u64
    }

    /// Counters with their names
    pub fn iter(&self) -> impl Iterator<Item = (StatCounter, u32)> + '_ {
        StatCounter::ALL.iter().map(move |&c| (c, self.get(c)))
    }

    /// Encode as a response body
    pub fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(MIB_BODY_SIZE);
        body.put_u16(self.port);
        body.put_u32(self.timestamp);
        for value in self.counters {
            body.put_u32(value);
        }
        body
    }
}

/// Parse a MIB-II dump response
pub fn parse_mib(buffer: &[u8], delta: usize) -> Result<StatsCounterSet> {
    let start = PACKET_PREFIX_SIZE
        .checked_sub(delta)
        .ok_or_else(|| Error::bad_param("delta", format!("{} larger than the RMU prefix", delta)))?;
    let required = MIB_FRAME_SIZE - delta;
    if buffer.len() < required {
        return Err(Error::parsing(format!(
            "MIB-II response of {} bytes, need {}",
            buffer.len(),
            required
        )));
    }
    let words = WordReader::new(&buffer[start..required]);

    let mut set = StatsCounterSet {
        port: words.word(0)?,
        timestamp: words.dword(1)?,
        ..Default::default()
    };
    for (i, value) in set.counters.iter_mut().enumerate() {
        *value = words.dword(3 + 2 * i)?;
    }
    Ok(set)
}
