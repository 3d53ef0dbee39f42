//! AVB / TSN register access through the Global 2 window

use msd_core::{AvbBlock, BlockSelector, Error, RegisterCommand, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use crate::bus::RegisterBus;
use crate::layout::{peridot, WindowLayout};
use crate::retry::RetryPolicy;
use crate::window::IndirectWindow;

/// First Qbv register holding the gate control list
pub const QBV_GCL_BASE: u8 = 0x10;

/// Gate control list entries addressable through the window
pub const MAX_QBV_ENTRIES: u8 = 8;

/// One Qbv gate control list entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QbvGateEntry {
    /// Open/closed state of the 8 traffic-class gates
    pub gate_states: u8,
    /// Time the entry stays active, in scheduler ticks
    pub interval: u16,
}

impl fmt::Display for QbvGateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gates={:08b} interval={}", self.gate_states, self.interval)
    }
}

/// AVB / PTP / TAI / Qav / Qbv register access
pub struct Avb<B: RegisterBus + ?Sized> {
    bus: Arc<B>,
    window: IndirectWindow,
    lock: Mutex<()>,
}

impl<B: RegisterBus + ?Sized> Avb<B> {
    /// Peridot AVB window
    pub fn new(bus: Arc<B>) -> Self {
        Self::with_layout(bus, peridot::AVB)
    }

    /// AVB access through another chip's window layout
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

    /// Read one register of `block` for `port`
    pub fn read(&self, block: AvbBlock, port: u8, addr: u8) -> Result<u16> {
        let cmd = RegisterCommand::read(port, addr).with_block(BlockSelector::Avb(block));
        self.execute(&cmd)
    }

    /// Write one register of `block` for `port`
    pub fn write(&self, block: AvbBlock, port: u8, addr: u8, data: u16) -> Result<()> {
        let cmd = RegisterCommand::write(port, addr, data).with_block(BlockSelector::Avb(block));
        self.execute(&cmd)?;
        Ok(())
    }

    /// Run an arbitrary command through the window
    pub fn execute(&self, command: &RegisterCommand) -> Result<u16> {
        let _guard = self.lock.lock();
        self.window.execute(&*self.bus, command)
    }

    /// Read gate control list entry `index` of `port`
    pub fn read_qbv_entry(&self, port: u8, index: u8) -> Result<QbvGateEntry> {
        let addr = gcl_address(index)?;
        let block = BlockSelector::Avb(AvbBlock::Qbv);
        let _guard = self.lock.lock();
        let states = self
            .window
            .execute(&*self.bus, &RegisterCommand::read(port, addr).with_block(block))?;
        let interval = self
            .window
            .execute(&*self.bus, &RegisterCommand::read(port, addr + 1).with_block(block))?;
        Ok(QbvGateEntry {
            gate_states: states as u8,
            interval,
        })
    }

    /// Write gate control list entry `index` of `port`
    pub fn write_qbv_entry(&self, port: u8, index: u8, entry: QbvGateEntry) -> Result<()> {
        let addr = gcl_address(index)?;
        let block = BlockSelector::Avb(AvbBlock::Qbv);
        let _guard = self.lock.lock();
        self.window.execute(
            &*self.bus,
            &RegisterCommand::write(port, addr, entry.gate_states as u16).with_block(block),
        )?;
        self.window.execute(
            &*self.bus,
            &RegisterCommand::write(port, addr + 1, entry.interval).with_block(block),
        )?;
        Ok(())
    }
}

fn gcl_address(index: u8) -> Result<u8> {
    if index >= MAX_QBV_ENTRIES {
        return Err(Error::bad_param(
            "index",
            format!("gate control entry {} (max {})", index, MAX_QBV_ENTRIES - 1),
        ));
    }
    Ok(QBV_GCL_BASE + 2 * index)
}
