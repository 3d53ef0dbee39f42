//! Logical register commands
//!
//! A [`RegisterCommand`] is the chip-independent description of one step of
//! an indirect-table or register operation. Per-chip layouts translate the
//! generic [`CommandOp`] and [`BlockSelector`] into wire codes.

use std::fmt;

/// Generic operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandOp {
    /// No operation
    NoOp,
    /// Read an entry or register
    Read,
    /// Write an entry or register
    Write,
    /// Flush every entry of a block
    FlushAll,
    /// Flush a single entry
    FlushOne,
    /// Load an entry from the data registers
    Load,
    /// Find the next valid entry after the given id
    GetNext,
    /// Read the violation / error state
    GetViolation,
    /// Read an entry and clear its counters
    ReadClear,
    /// Write the address phase of a two-phase access (SMI clause 45)
    WriteAddress,
    /// Read and post-increment the address (SMI clause 45)
    ReadIncrement,
}

impl CommandOp {
    /// Whether the data register(s) are loaded before the command is issued
    pub fn loads_data(self) -> bool {
        matches!(
            self,
            CommandOp::Write | CommandOp::Load | CommandOp::WriteAddress
        )
    }

    /// Whether the data register(s) hold a result after completion
    pub fn returns_data(self) -> bool {
        matches!(
            self,
            CommandOp::Read
                | CommandOp::GetNext
                | CommandOp::GetViolation
                | CommandOp::ReadClear
                | CommandOp::ReadIncrement
        )
    }
}

impl fmt::Display for CommandOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandOp::NoOp => "NOOP",
            CommandOp::Read => "READ",
            CommandOp::Write => "WRITE",
            CommandOp::FlushAll => "FLUSH_ALL",
            CommandOp::FlushOne => "FLUSH_ONE",
            CommandOp::Load => "LOAD",
            CommandOp::GetNext => "GET_NEXT",
            CommandOp::GetViolation => "GET_VIOLATION",
            CommandOp::ReadClear => "READ_CLEAR",
            CommandOp::WriteAddress => "WRITE_ADDR",
            CommandOp::ReadIncrement => "READ_INC",
        };
        f.write_str(name)
    }
}

/// AVB / TSN sub-block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvbBlock {
    /// Per-port PTP registers
    PtpPort,
    /// Global PTP registers
    PtpGlobal,
    /// Time Application Interface
    Tai,
    /// Credit-based shaper (802.1Qav)
    Qav,
    /// Time-aware scheduler (802.1Qbv)
    Qbv,
}

/// Block addressed by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockSelector {
    /// The window has no block field
    None,
    /// FRER sequence generation table
    SeqGen,
    /// FRER individual recovery table
    IndvRcvy,
    /// FRER sequence recovery table
    SeqRcvy,
    /// Counter bank 0
    Bank0,
    /// Counter bank 1
    Bank1,
    /// SMI clause 22 access
    Clause22,
    /// SMI clause 45 access
    Clause45,
    /// AVB / TSN sub-block
    Avb(AvbBlock),
}

impl fmt::Display for BlockSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockSelector::None => write!(f, "-"),
            BlockSelector::SeqGen => write!(f, "SEQ_GEN"),
            BlockSelector::IndvRcvy => write!(f, "INDV_RCVY"),
            BlockSelector::SeqRcvy => write!(f, "SEQ_RCVY"),
            BlockSelector::Bank0 => write!(f, "BANK0"),
            BlockSelector::Bank1 => write!(f, "BANK1"),
            BlockSelector::Clause22 => write!(f, "C22"),
            BlockSelector::Clause45 => write!(f, "C45"),
            BlockSelector::Avb(block) => write!(f, "AVB/{:?}", block),
        }
    }
}

/// One logical register operation
///
/// `dev_address` is the device the command targets inside the block: a PHY
/// address for SMI, a port for AVB, the SOHO device address for RMU register
/// batches. `entry_id` is the table index or register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterCommand {
    /// Operation code
    pub opcode: CommandOp,
    /// Device / port / PHY address
    pub dev_address: u8,
    /// Block selector
    pub block: BlockSelector,
    /// Entry id or register address
    pub entry_id: u16,
    /// Operand (ignored by operations that do not load data)
    pub data: u16,
}

impl RegisterCommand {
    /// Create a command with no block selector and zero operand
    pub fn new(opcode: CommandOp, dev_address: u8, entry_id: u16) -> Self {
        Self {
            opcode,
            dev_address,
            block: BlockSelector::None,
            entry_id,
            data: 0,
        }
    }

    /// Register read
    pub fn read(dev_address: u8, reg_address: u8) -> Self {
        Self::new(CommandOp::Read, dev_address, reg_address as u16)
    }

    /// Register write
    pub fn write(dev_address: u8, reg_address: u8, data: u16) -> Self {
        Self::new(CommandOp::Write, dev_address, reg_address as u16).with_data(data)
    }

    /// Set the block selector
    pub fn with_block(mut self, block: BlockSelector) -> Self {
        self.block = block;
        self
    }

    /// Set the operand
    pub fn with_data(mut self, data: u16) -> Self {
        self.data = data;
        self
    }
}

impl fmt::Display for RegisterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} dev={:#04x} entry={:#06x} data={:#06x}",
            self.opcode, self.block, self.dev_address, self.entry_id, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_direction() {
        assert!(CommandOp::Write.loads_data());
        assert!(CommandOp::Load.loads_data());
        assert!(!CommandOp::Read.loads_data());
        assert!(CommandOp::Read.returns_data());
        assert!(CommandOp::ReadClear.returns_data());
        assert!(!CommandOp::FlushAll.returns_data());
        assert!(!CommandOp::FlushAll.loads_data());
    }

    #[test]
    fn test_constructors() {
        let cmd = RegisterCommand::write(0x1C, 0x18, 0xBEEF).with_block(BlockSelector::Clause22);
        assert_eq!(cmd.opcode, CommandOp::Write);
        assert_eq!(cmd.dev_address, 0x1C);
        assert_eq!(cmd.entry_id, 0x18);
        assert_eq!(cmd.data, 0xBEEF);
        assert_eq!(cmd.block, BlockSelector::Clause22);

        let cmd = RegisterCommand::read(3, 1);
        assert_eq!(cmd.data, 0);
        assert_eq!(cmd.block, BlockSelector::None);
    }

    #[test]
    fn test_display() {
        let cmd = RegisterCommand::read(0x10, 0x02).with_block(BlockSelector::SeqGen);
        assert_eq!(cmd.to_string(), "READ SEQ_GEN dev=0x10 entry=0x0002 data=0x0000");
    }
}
