//! SMI PHY access through the Global 2 window
//!
//! Clause 22 is a single handshake. Clause 45 is an address phase
//! (`WriteAddress` with the register in the data register and the device
//! type in the register field) followed by the data phase, both under the
//! same lock so no other access can move the PHY's address pointer between
//! them.

use msd_core::{BlockSelector, CommandOp, RegisterCommand, Result};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::bus::RegisterBus;
use crate::layout::{peridot, WindowLayout};
use crate::retry::RetryPolicy;
use crate::window::IndirectWindow;

/// SMI PHY register access
pub struct SmiPhy<B: RegisterBus + ?Sized> {
    bus: Arc<B>,
    window: IndirectWindow,
    lock: Mutex<()>,
}

impl<B: RegisterBus + ?Sized> SmiPhy<B> {
    /// Peridot SMI window
    pub fn new(bus: Arc<B>) -> Self {
        Self::with_layout(bus, peridot::SMI_PHY)
    }

    /// SMI access through another chip's window layout
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

    /// Clause 22 read
    pub fn read_c22(&self, phy: u8, reg: u8) -> Result<u16> {
        let cmd = RegisterCommand::read(phy, reg).with_block(BlockSelector::Clause22);
        let _guard = self.lock.lock();
        self.window.execute(&*self.bus, &cmd)
    }

    /// Clause 22 write
    pub fn write_c22(&self, phy: u8, reg: u8, data: u16) -> Result<()> {
        let cmd = RegisterCommand::write(phy, reg, data).with_block(BlockSelector::Clause22);
        let _guard = self.lock.lock();
        self.window.execute(&*self.bus, &cmd)?;
        Ok(())
    }

    /// Clause 45 read of `reg` in MMD `devtype`
    pub fn read_c45(&self, phy: u8, devtype: u8, reg: u16) -> Result<u16> {
        let _guard = self.lock.lock();
        self.address_phase(phy, devtype, reg)?;
        let cmd = c45(CommandOp::Read, phy, devtype);
        self.window.execute(&*self.bus, &cmd)
    }

    /// Clause 45 write of `reg` in MMD `devtype`
    pub fn write_c45(&self, phy: u8, devtype: u8, reg: u16, data: u16) -> Result<()> {
        let _guard = self.lock.lock();
        self.address_phase(phy, devtype, reg)?;
        let cmd = c45(CommandOp::Write, phy, devtype).with_data(data);
        self.window.execute(&*self.bus, &cmd)?;
        Ok(())
    }

    /// Clause 45 read of `count` consecutive registers starting at `reg`
    ///
    /// Uses post-increment reads after a single address phase.
    pub fn read_c45_block(&self, phy: u8, devtype: u8, reg: u16, count: usize) -> Result<Vec<u16>> {
        let _guard = self.lock.lock();
        self.address_phase(phy, devtype, reg)?;
        let cmd = c45(CommandOp::ReadIncrement, phy, devtype);
        (0..count)
            .map(|_| self.window.execute(&*self.bus, &cmd))
            .collect()
    }

    fn address_phase(&self, phy: u8, devtype: u8, reg: u16) -> Result<()> {
        let cmd = c45(CommandOp::WriteAddress, phy, devtype).with_data(reg);
        self.window.execute(&*self.bus, &cmd)?;
        Ok(())
    }
}

fn c45(op: CommandOp, phy: u8, devtype: u8) -> RegisterCommand {
    RegisterCommand::new(op, phy, devtype as u16).with_block(BlockSelector::Clause45)
}
