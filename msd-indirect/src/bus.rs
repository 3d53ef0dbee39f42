//! Direct register access to the switch

use msd_core::Result;
use std::sync::Arc;

/// Direct read/write of one 16-bit SOHO register
///
/// `dev_addr` is the device (port or global block) address on the switch's
/// internal bus and `reg_addr` the register within it, both 5 bits. The
/// integrator supplies the implementation (MDIO, RMU, a simulator).
pub trait RegisterBus: Send + Sync {
    /// Read one register
    fn read(&self, dev_addr: u8, reg_addr: u8) -> Result<u16>;

    /// Write one register
    fn write(&self, dev_addr: u8, reg_addr: u8, data: u16) -> Result<()>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Arc<B> {
    fn read(&self, dev_addr: u8, reg_addr: u8) -> Result<u16> {
        (**self).read(dev_addr, reg_addr)
    }

    fn write(&self, dev_addr: u8, reg_addr: u8, data: u16) -> Result<()> {
        (**self).write(dev_addr, reg_addr, data)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &B {
    fn read(&self, dev_addr: u8, reg_addr: u8) -> Result<u16> {
        (**self).read(dev_addr, reg_addr)
    }

    fn write(&self, dev_addr: u8, reg_addr: u8, data: u16) -> Result<()> {
        (**self).write(dev_addr, reg_addr, data)
    }
}
