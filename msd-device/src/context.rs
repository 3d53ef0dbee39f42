//! Per-device context
//!
//! Everything a protocol call needs about one switch lives here: the
//! register bus, one locked window per indirect block family and, when a
//! management port is attached, the RMU session behind its own lock. The
//! context is passed by reference; there is no process-wide device state.

use msd_capture::{FrameTransport, TransportStats};
use msd_core::{Error, Result};
use msd_indirect::{Avb, Frer, RegisterBus, SmiPhy};
use msd_rmu::RmuSession;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{DeviceConfig, RegisterAccess, MAX_DEV_ADDR};

/// RMU session over a boxed transport
pub type RmuLink = RmuSession<Box<dyn FrameTransport>>;

/// One managed switch
pub struct DeviceContext<B: RegisterBus + ?Sized> {
    config: DeviceConfig,
    bus: Arc<B>,
    smi: SmiPhy<B>,
    avb: Avb<B>,
    frer: Frer<B>,
    rmu: Option<Mutex<RmuLink>>,
}

impl<B: RegisterBus + ?Sized> DeviceContext<B> {
    /// Create a context over `bus`
    pub fn new(bus: Arc<B>, config: DeviceConfig) -> Result<Self> {
        config.validate()?;

        let mut smi = SmiPhy::new(bus.clone());
        if let Some(retry) = config.smi_retry {
            smi = smi.with_retry(retry);
        }
        let mut avb = Avb::new(bus.clone());
        if let Some(retry) = config.avb_retry {
            avb = avb.with_retry(retry);
        }
        let mut frer = Frer::new(bus.clone());
        if let Some(retry) = config.frer_retry {
            frer = frer.with_retry(retry);
        }

        info!(device = %config.name, access = %config.register_access, "device context created");
        Ok(Self {
            config,
            bus,
            smi,
            avb,
            frer,
            rmu: None,
        })
    }

    /// Open an RMU session on `transport` using the configured framing
    pub fn attach_rmu(&mut self, transport: Box<dyn FrameTransport>) -> Result<()> {
        let session = RmuSession::new(transport, self.config.rmu)?;
        self.attach_session(session);
        Ok(())
    }

    /// Use an already opened RMU session
    pub fn attach_session(&mut self, session: RmuLink) {
        info!(
            device = %self.config.name,
            mac = %session.transport().local_mac(),
            "RMU attached"
        );
        self.rmu = Some(Mutex::new(session));
    }

    /// Drop the management port, returning its session
    pub fn detach_rmu(&mut self) -> Option<RmuLink> {
        self.rmu.take().map(Mutex::into_inner)
    }

    /// Whether an RMU session is attached
    pub fn has_rmu(&self) -> bool {
        self.rmu.is_some()
    }

    /// Active configuration
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Register bus
    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// SMI PHY access
    pub fn smi(&self) -> &SmiPhy<B> {
        &self.smi
    }

    /// AVB / TSN register access
    pub fn avb(&self) -> &Avb<B> {
        &self.avb
    }

    /// FRER table access
    pub fn frer(&self) -> &Frer<B> {
        &self.frer
    }

    /// Run `f` with exclusive use of the RMU session
    pub fn rmu<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut RmuLink) -> Result<R>,
    {
        let rmu = self
            .rmu
            .as_ref()
            .ok_or_else(|| Error::not_supported(format!("{}: no RMU session", self.config.name)))?;
        let mut session = rmu.lock();
        f(&mut session)
    }

    /// RMU traffic counters, if a session is attached
    pub fn rmu_stats(&self) -> Option<TransportStats> {
        self.rmu.as_ref().map(|rmu| rmu.lock().stats())
    }

    /// Read a plain SOHO register
    pub fn read_register(&self, dev_addr: u8, reg_addr: u8) -> Result<u16> {
        check_address(dev_addr, reg_addr)?;
        let value = match self.config.register_access {
            RegisterAccess::Bus => self.bus.read(dev_addr, reg_addr)?,
            RegisterAccess::Rmu => {
                let words = self.rmu(|s| s.read_registers(&[(dev_addr, reg_addr)]))?;
                words
                    .first()
                    .copied()
                    .ok_or_else(|| Error::protocol("empty register batch response"))?
            }
        };
        debug!(dev = dev_addr, reg = reg_addr, value, "read register");
        Ok(value)
    }

    /// Write a plain SOHO register
    pub fn write_register(&self, dev_addr: u8, reg_addr: u8, data: u16) -> Result<()> {
        check_address(dev_addr, reg_addr)?;
        match self.config.register_access {
            RegisterAccess::Bus => self.bus.write(dev_addr, reg_addr, data)?,
            RegisterAccess::Rmu => self.rmu(|s| s.write_registers(&[(dev_addr, reg_addr, data)]))?,
        }
        debug!(dev = dev_addr, reg = reg_addr, data, "wrote register");
        Ok(())
    }
}

fn check_address(dev_addr: u8, reg_addr: u8) -> Result<()> {
    if dev_addr > MAX_DEV_ADDR {
        return Err(Error::bad_param("dev_addr", format!("{:#x} exceeds {:#x}", dev_addr, MAX_DEV_ADDR)));
    }
    if reg_addr > MAX_DEV_ADDR {
        return Err(Error::bad_param("reg_addr", format!("{:#x} exceeds {:#x}", reg_addr, MAX_DEV_ADDR)));
    }
    Ok(())
}
