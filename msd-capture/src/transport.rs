//! Raw frame transport over pcap

use msd_core::{Error, MacAddr, Result};
use pcap::{Active, Capture, Device, Direction};
use tracing::{debug, info, trace};

use crate::interface::{get_interface, InterfaceInfo};

/// Default snapshot length (maximum bytes per frame)
const DEFAULT_SNAPLEN: i32 = 1518;

/// Default receive timeout (milliseconds)
const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Something that can send one raw frame and wait for one raw frame
///
/// `recv` returns `Ok(None)` when its timeout elapses without a frame; the
/// caller decides how many such misses to tolerate.
pub trait FrameTransport: Send {
    /// Send one complete frame
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait for the next frame
    fn recv(&mut self) -> Result<Option<Vec<u8>>>;

    /// MAC address stamped as source of outgoing frames
    fn local_mac(&self) -> MacAddr;
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).recv()
    }

    fn local_mac(&self) -> MacAddr {
        (**self).local_mac()
    }
}

/// Configuration for the pcap handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Maximum bytes to capture per frame
    pub snaplen: i32,
    /// Receive timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Deliver frames as soon as they arrive
    pub immediate_mode: bool,
    /// Kernel buffer size (0 = default)
    pub buffer_size: i32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            immediate_mode: true,
            buffer_size: 0,
        }
    }
}

impl TransportConfig {
    /// Set the receive timeout
    pub fn with_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set promiscuous mode
    pub fn with_promiscuous(mut self, enable: bool) -> Self {
        self.promiscuous = enable;
        self
    }

    /// Set the kernel buffer size
    pub fn with_buffer_size(mut self, size: i32) -> Self {
        self.buffer_size = size;
        self
    }
}

/// Frame transport bound to one network interface
pub struct PcapTransport {
    interface_info: InterfaceInfo,
    mac: MacAddr,
    config: TransportConfig,
    capture: Capture<Active>,
    filter: Option<String>,
}

impl PcapTransport {
    /// Open the interface with default settings
    pub fn open(interface: &str) -> Result<Self> {
        Self::with_config(interface, TransportConfig::default())
    }

    /// Open the interface with custom settings
    pub fn with_config(interface: &str, config: TransportConfig) -> Result<Self> {
        let interface_info = get_interface(interface)?;

        if !interface_info.is_up {
            return Err(Error::transport(format!(
                "Interface '{}' is not up",
                interface
            )));
        }
        let mac = interface_info.mac.ok_or_else(|| {
            Error::transport(format!("Interface '{}' has no MAC address", interface))
        })?;

        debug!("Initializing pcap transport on {}", interface);

        let device = Device::from(interface);
        let mut inactive = Capture::from_device(device)
            .map_err(|e| Error::transport(format!("Failed to create capture: {}", e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(config.immediate_mode);

        if config.buffer_size > 0 {
            inactive = inactive.buffer_size(config.buffer_size);
        }

        let capture = inactive
            .open()
            .map_err(|e| Error::transport(format!("Failed to open capture: {}", e)))?;

        // Our own requests would otherwise be looped back to us
        capture
            .direction(Direction::In)
            .map_err(|e| Error::transport(format!("Failed to set direction: {}", e)))?;

        info!("Transport opened on {} ({})", interface, mac);

        Ok(Self {
            interface_info,
            mac,
            config,
            capture,
            filter: None,
        })
    }

    /// Install a BPF filter on the open handle
    pub fn set_filter(&mut self, bpf: &str) -> Result<()> {
        debug!("Setting BPF filter: {}", bpf);
        self.capture
            .filter(bpf, true)
            .map_err(|e| Error::bad_param("filter", format!("{}", e)))?;
        self.filter = Some(bpf.to_string());
        info!("BPF filter set: {}", bpf);
        Ok(())
    }

    /// Currently installed filter
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Get interface information
    pub fn interface_info(&self) -> &InterfaceInfo {
        &self.interface_info
    }

    /// Active configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl FrameTransport for PcapTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        trace!("Sending {} byte frame on {}", frame.len(), self.interface_info.name);
        self.capture
            .sendpacket(frame)
            .map_err(|e| Error::transport(format!("Failed to send frame: {}", e)))
    }

    fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.capture.next_packet() {
            Ok(packet) => {
                trace!("Received {} byte frame", packet.data.len());
                Ok(Some(packet.data.to_vec()))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(Error::transport(format!("Capture error: {}", e))),
        }
    }

    fn local_mac(&self) -> MacAddr {
        self.mac
    }
}
