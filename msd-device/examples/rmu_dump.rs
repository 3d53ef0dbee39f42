//! Dump switch tables over the Remote Management Unit
//!
//! ```text
//! cargo run -p msd-device --example rmu_dump -- -I eth1 --device 1 atu
//! RUST_LOG=debug cargo run -p msd-device --example rmu_dump -- -I eth1 mib 3
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use msd_capture::{filters, list_interfaces, FrameTransport, PcapTransport, TransportConfig};
use msd_core::{FramingMode, Result};
use msd_rmu::{RmuConfig, RmuSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rmu_dump")]
#[command(version, about = "Switch table dumps over RMU", long_about = None)]
struct Cli {
    /// Interface connected to the switch's management port
    #[arg(short = 'I', long)]
    interface: Option<String>,

    /// Tag framing
    #[arg(long, value_enum, default_value = "edsa")]
    framing: Framing,

    /// EtherType for EDSA framing
    #[arg(long, default_value = "0xDADA", value_parser = parse_u16)]
    ether_type: u16,

    /// Device number of the switch in the cascade
    #[arg(short, long, default_value = "0")]
    device: u8,

    /// Receive timeout per frame in milliseconds
    #[arg(short, long, default_value = "1000")]
    timeout: i32,

    /// Unmatched frames tolerated per request
    #[arg(long, default_value = "10")]
    max_drops: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Framing {
    Edsa,
    Dsa,
}

impl From<Framing> for FramingMode {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Edsa => FramingMode::EtherTypeDsa,
            Framing::Dsa => FramingMode::Dsa,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List capture interfaces
    Interfaces,
    /// Product id and firmware version
    Id,
    /// Address translation table
    Atu,
    /// E-channel id table
    Ecid,
    /// TCAM entries
    Tcam,
    /// MIB-II counters of a port
    Mib {
        port: u8,
        /// Clear the counters after reading
        #[arg(long)]
        clear: bool,
    },
    /// Read registers, given as DEV:REG pairs in hex
    Read {
        #[arg(required = true, value_parser = parse_register)]
        registers: Vec<(u8, u8)>,
    },
}

fn parse_u16(s: &str) -> std::result::Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("{}: {}", s, e))
}

fn parse_register(s: &str) -> std::result::Result<(u8, u8), String> {
    let (dev, reg) = s.split_once(':').ok_or("expected DEV:REG")?;
    let dev = u8::from_str_radix(dev, 16).map_err(|e| e.to_string())?;
    let reg = u8::from_str_radix(reg, 16).map_err(|e| e.to_string())?;
    Ok((dev, reg))
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Command::Interfaces = cli.command {
        for iface in list_interfaces()? {
            let mac = iface.mac.map(|m| m.to_string()).unwrap_or_else(|| "-".to_string());
            let usable = if iface.is_management_capable() { "" } else { " (unusable)" };
            println!("{:<16} {}{}", iface.name, mac, usable);
        }
        return Ok(());
    }

    let interface = cli
        .interface
        .clone()
        .ok_or("an interface is required (-I)")?;
    let config = RmuConfig::default()
        .with_framing(cli.framing.into())
        .with_ether_type(cli.ether_type)
        .with_target_device(cli.device)
        .with_max_drops(cli.max_drops);

    let mut transport = PcapTransport::with_config(
        &interface,
        TransportConfig::default().with_timeout_ms(cli.timeout),
    )?;
    let host = transport.local_mac();
    transport.set_filter(&filters::rmu_response_filter(
        &config.dsa_framing(),
        cli.device,
        &host,
    ))?;
    info!(interface = %interface, mac = %host, "transport open");

    let mut session = RmuSession::new(transport, config)?;
    run(&mut session, &cli.command)?;
    println!("{}", session.stats().format());
    Ok(())
}

fn run<T: FrameTransport>(session: &mut RmuSession<T>, command: &Command) -> Result<()> {
    match command {
        Command::Interfaces => {}
        Command::Id => {
            println!("{}", session.get_id()?);
            println!("firmware {}", session.firmware_version()?);
        }
        Command::Atu => {
            let entries = session.dump_atu_all()?;
            for entry in &entries {
                println!("{}", entry);
            }
            println!("{} ATU entries", entries.len());
        }
        Command::Ecid => {
            for entry in session.dump_ecid_all()? {
                println!(
                    "ecid={:#08x} ports={:#06x} group={} state={:#x}",
                    entry.ecid(),
                    entry.port_vec,
                    entry.group,
                    entry.entry_state
                );
            }
        }
        Command::Tcam => {
            for entry in session.dump_tcam_all()? {
                println!("{}", entry);
            }
        }
        Command::Mib { port, clear } => {
            let counters = session.dump_mib(*port, *clear)?;
            println!("port {} at {}", counters.port, counters.timestamp);
            for (counter, value) in counters.iter() {
                if value != 0 {
                    println!("  {:<24} {}", counter.name(), value);
                }
            }
        }
        Command::Read { registers } => {
            let values = session.read_registers(registers)?;
            for ((dev, reg), value) in registers.iter().zip(values) {
                println!("{:02x}:{:02x} = {:#06x}", dev, reg, value);
            }
        }
    }
    Ok(())
}
