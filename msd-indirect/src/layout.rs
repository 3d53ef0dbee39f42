//! Per-chip indirect window layouts
//!
//! A [`WindowLayout`] says where a window's command and data registers live
//! and how a generic [`RegisterCommand`] is packed into the command word.
//! Anything missing from a layout's tables is not implemented by that chip.

use msd_core::{BitField, BlockSelector, CommandOp, Error, RegisterCommand, Result};

use crate::retry::RetryPolicy;

/// Opcode table row; `None` matches any block selector
pub type OpcodeRow = (Option<BlockSelector>, CommandOp, u16);

/// Register and bit layout of one indirect window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLayout {
    /// Name used in logs and timeout errors
    pub name: &'static str,
    /// Device address holding the window registers
    pub dev_addr: u8,
    /// Command register
    pub command_reg: u8,
    /// Data registers, in load order
    pub data_regs: &'static [u8],
    /// Busy bit in the command register
    pub busy: BitField,
    /// Opcode field
    pub opcode: BitField,
    /// Block selector field, if the window has one
    pub block: Option<BitField>,
    /// Device / port / PHY field, if the window has one
    pub device: Option<BitField>,
    /// Entry id / register address field
    pub entry: BitField,
    /// Opcode wire codes
    pub opcodes: &'static [OpcodeRow],
    /// Block selector wire codes
    pub blocks: &'static [(BlockSelector, u16)],
    /// Default polling policy
    pub retry: RetryPolicy,
}

impl WindowLayout {
    /// Wire code of `op` within `block`
    pub fn opcode_code(&self, block: BlockSelector, op: CommandOp) -> Result<u16> {
        self.opcodes
            .iter()
            .find(|(b, o, _)| *o == op && b.map_or(true, |b| b == block))
            .map(|(_, _, code)| *code)
            .ok_or_else(|| {
                Error::not_supported(format!("{}: {} on {}", self.name, op, block))
            })
    }

    /// Wire code of a block selector, `None` when the window has no block field
    pub fn block_code(&self, block: BlockSelector) -> Result<Option<u16>> {
        match self.block {
            None if block == BlockSelector::None => Ok(None),
            None => Err(Error::not_supported(format!(
                "{}: no block selector ({})",
                self.name, block
            ))),
            Some(_) => self
                .blocks
                .iter()
                .find(|(b, _)| *b == block)
                .map(|(_, code)| Some(*code))
                .ok_or_else(|| {
                    Error::not_supported(format!("{}: block {}", self.name, block))
                }),
        }
    }

    /// Pack a command word with the busy bit set
    pub fn pack_command(&self, command: &RegisterCommand) -> Result<u16> {
        let opcode = self.opcode_code(command.block, command.opcode)?;
        let block = self.block_code(command.block)?;

        let mut word = self.busy.pack_u16(1)?;
        word = self.opcode.insert_u16(word, opcode)?;
        if let (Some(field), Some(code)) = (self.block, block) {
            word = field.insert_u16(word, code)?;
        }
        match self.device {
            Some(field) => {
                if command.dev_address as u32 > field.max_value() {
                    return Err(Error::bad_param(
                        "dev_address",
                        format!("{:#x} exceeds {:#x}", command.dev_address, field.max_value()),
                    ));
                }
                word = field.insert_u16(word, command.dev_address as u16)?;
            }
            None if command.dev_address != 0 => {
                return Err(Error::bad_param(
                    "dev_address",
                    format!("{} has no device field", self.name),
                ))
            }
            None => {}
        }
        if command.entry_id as u32 > self.entry.max_value() {
            return Err(Error::bad_param(
                "entry_id",
                format!("{:#x} exceeds {:#x}", command.entry_id, self.entry.max_value()),
            ));
        }
        self.entry.insert_u16(word, command.entry_id)
    }

    /// Whether the busy bit is set in a command register value
    pub fn is_busy(&self, value: u16) -> bool {
        self.busy.extract_u16(value) != 0
    }
}

/// Peridot family (88E6393X class)
pub mod peridot {
    use super::*;
    use msd_core::AvbBlock;

    /// Global 2 device address
    pub const GLOBAL2: u8 = 0x1C;

    /// SMI PHY command / data window in Global 2
    ///
    /// ```text
    /// | busy | - | - | mode (1 = C22) | op (2) | PHY (5) | reg / devtype (5) |
    /// ```
    pub const SMI_PHY: WindowLayout = WindowLayout {
        name: "SMI",
        dev_addr: GLOBAL2,
        command_reg: 0x18,
        data_regs: &[0x19],
        busy: BitField::bit(15),
        opcode: BitField::new(10, 2),
        block: Some(BitField::bit(12)),
        device: Some(BitField::new(5, 5)),
        entry: BitField::new(0, 5),
        opcodes: &[
            (Some(BlockSelector::Clause22), CommandOp::Write, 0b01),
            (Some(BlockSelector::Clause22), CommandOp::Read, 0b10),
            (Some(BlockSelector::Clause45), CommandOp::WriteAddress, 0b00),
            (Some(BlockSelector::Clause45), CommandOp::Write, 0b01),
            (Some(BlockSelector::Clause45), CommandOp::ReadIncrement, 0b10),
            (Some(BlockSelector::Clause45), CommandOp::Read, 0b11),
        ],
        blocks: &[(BlockSelector::Clause22, 1), (BlockSelector::Clause45, 0)],
        retry: RetryPolicy::new(1000),
    };

    /// AVB command / data window in Global 2
    ///
    /// ```text
    /// | busy | op (3) | port (4) | block (3) | addr (5) |
    /// ```
    pub const AVB: WindowLayout = WindowLayout {
        name: "AVB",
        dev_addr: GLOBAL2,
        command_reg: 0x16,
        data_regs: &[0x17],
        busy: BitField::bit(15),
        opcode: BitField::new(12, 3),
        block: Some(BitField::new(5, 3)),
        device: Some(BitField::new(8, 4)),
        entry: BitField::new(0, 5),
        opcodes: &[
            (None, CommandOp::Write, 0b011),
            (None, CommandOp::Read, 0b100),
            (None, CommandOp::ReadIncrement, 0b110),
        ],
        blocks: &[
            (BlockSelector::Avb(AvbBlock::PtpPort), 0),
            (BlockSelector::Avb(AvbBlock::PtpGlobal), 1),
            (BlockSelector::Avb(AvbBlock::Tai), 2),
            (BlockSelector::Avb(AvbBlock::Qav), 3),
            (BlockSelector::Avb(AvbBlock::Qbv), 4),
        ],
        retry: RetryPolicy::new(100),
    };
}

/// Fir family (automotive 88Q5xxx class)
pub mod fir {
    use super::*;

    /// Global 3 device address
    pub const GLOBAL3: u8 = 0x1E;

    /// FRER command window with four data registers
    ///
    /// ```text
    /// | busy | op (3) | - | block (3) | entry (8) |
    /// ```
    pub const FRER: WindowLayout = WindowLayout {
        name: "FRER",
        dev_addr: GLOBAL3,
        command_reg: 0x10,
        data_regs: &[0x11, 0x12, 0x13, 0x14],
        busy: BitField::bit(15),
        opcode: BitField::new(12, 3),
        block: Some(BitField::new(8, 3)),
        device: None,
        entry: BitField::new(0, 8),
        opcodes: &[
            (None, CommandOp::FlushAll, 1),
            (None, CommandOp::FlushOne, 2),
            (None, CommandOp::Load, 3),
            (Some(BlockSelector::IndvRcvy), CommandOp::GetNext, 4),
            (Some(BlockSelector::SeqRcvy), CommandOp::GetNext, 4),
            (None, CommandOp::Read, 5),
            (Some(BlockSelector::SeqRcvy), CommandOp::GetViolation, 6),
            (Some(BlockSelector::IndvRcvy), CommandOp::ReadClear, 7),
            (Some(BlockSelector::SeqRcvy), CommandOp::ReadClear, 7),
        ],
        blocks: &[
            (BlockSelector::SeqGen, 0),
            (BlockSelector::IndvRcvy, 1),
            (BlockSelector::SeqRcvy, 2),
            (BlockSelector::Bank0, 4),
            (BlockSelector::Bank1, 5),
        ],
        retry: RetryPolicy::new(10),
    };
}
