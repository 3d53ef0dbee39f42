//! Device configuration

use msd_core::{Error, Result};
use msd_indirect::RetryPolicy;
use msd_rmu::RmuConfig;
use std::fmt;

/// Highest SOHO device address on the internal bus
pub const MAX_DEV_ADDR: u8 = 0x1F;

/// Path used for plain register reads and writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegisterAccess {
    /// The integrator's register bus (MDIO or similar)
    #[default]
    Bus,
    /// RMU register batches over the management port
    Rmu,
}

impl fmt::Display for RegisterAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterAccess::Bus => write!(f, "bus"),
            RegisterAccess::Rmu => write!(f, "rmu"),
        }
    }
}

/// Configuration of one managed switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name used in logs
    pub name: String,
    /// RMU framing, EtherType, target device and drop budget
    pub rmu: RmuConfig,
    /// Path for plain register access
    pub register_access: RegisterAccess,
    /// SMI window polling, layout default when unset
    pub smi_retry: Option<RetryPolicy>,
    /// AVB window polling, layout default when unset
    pub avb_retry: Option<RetryPolicy>,
    /// FRER window polling, layout default when unset
    pub frer_retry: Option<RetryPolicy>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "switch0".to_string(),
            rmu: RmuConfig::default(),
            register_access: RegisterAccess::Bus,
            smi_retry: None,
            avb_retry: None,
            frer_retry: None,
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the RMU configuration
    pub fn with_rmu(mut self, rmu: RmuConfig) -> Self {
        self.rmu = rmu;
        self
    }

    /// Set the register access path
    pub fn with_register_access(mut self, access: RegisterAccess) -> Self {
        self.register_access = access;
        self
    }

    /// Override SMI polling
    pub fn with_smi_retry(mut self, retry: RetryPolicy) -> Self {
        self.smi_retry = Some(retry);
        self
    }

    /// Override AVB polling
    pub fn with_avb_retry(mut self, retry: RetryPolicy) -> Self {
        self.avb_retry = Some(retry);
        self
    }

    /// Override FRER polling
    pub fn with_frer_retry(mut self, retry: RetryPolicy) -> Self {
        self.frer_retry = Some(retry);
        self
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        self.rmu.validate()?;
        for (name, retry) in [
            ("smi_retry", self.smi_retry),
            ("avb_retry", self.avb_retry),
            ("frer_retry", self.frer_retry),
        ] {
            if matches!(retry, Some(r) if r.max_polls == 0) {
                return Err(Error::bad_param(name, "max_polls must be at least 1"));
            }
        }
        Ok(())
    }
}
