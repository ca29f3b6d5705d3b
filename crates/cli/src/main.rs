//! rawusb command line tool
//!
//! Lists USB devices that expose an interrupt IN/OUT endpoint pair and
//! performs single reads and writes against them.

mod config;
mod logging;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use config::{CliConfig, parse_filter, parse_hex, validate_log_level};
use logging::setup_logging;
use rawusb::{DeviceInfo, Filter, RusbDevice, RusbHost, enumerate_raw};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "rawusb")]
#[command(author, version, about = "Talk to raw interrupt USB devices")]
#[command(long_about = "
Enumerates USB devices exposing an interrupt IN/OUT endpoint pair and reads
from or writes to them without a device specific driver.

EXAMPLES:
    # List every raw device
    rawusb list

    # List devices of one vendor, hiding HID class devices
    rawusb list --filter 0x1209:* --skip-hid

    # Read one report
    rawusb read 1209:53c1:3

    # Write a report to interface 1
    rawusb write 1209:53c1:3 --interface 1 \"00 01 02\"

CONFIGURATION:
    Defaults are read from --config, or ~/.config/rawusb/config.toml when
    present. Command line flags override file values.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List raw devices (default)
    List {
        /// VID:PID filter, e.g. 0x1209:* (overrides the config file)
        #[arg(long, value_name = "VID:PID")]
        filter: Option<String>,

        /// Hide HID class devices
        #[arg(long)]
        skip_hid: bool,
    },
    /// Read one interrupt report and print it as hex
    Read {
        /// Device path as printed by `list`
        path: String,

        /// Interface number when the device has several raw interfaces
        #[arg(short, long)]
        interface: Option<u8>,

        /// Read buffer size in bytes
        #[arg(short, long)]
        size: Option<usize>,
    },
    /// Write one interrupt report given as hex
    Write {
        /// Device path as printed by `list`
        path: String,

        /// Hex payload, e.g. "00 01 02"
        data: String,

        /// Interface number when the device has several raw interfaces
        #[arg(short, long)]
        interface: Option<u8>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let path = CliConfig::default_path();
        CliConfig::default()
            .save(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = CliConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let log_level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    validate_log_level(log_level)?;
    setup_logging(log_level).context("Failed to setup logging")?;

    debug!("rawusb v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or(Command::List {
        filter: None,
        skip_hid: false,
    }) {
        Command::List { filter, skip_hid } => {
            let pattern = filter.or_else(|| config.filter.device.clone());
            let (vendor_id, product_id) = match pattern.as_deref() {
                Some(pattern) => parse_filter(pattern)?,
                None => (0, 0),
            };
            let filter =
                Filter::new(vendor_id, product_id).skip_hid(skip_hid || config.filter.skip_hid);
            list_devices(&filter)
        }
        Command::Read {
            path,
            interface,
            size,
        } => {
            let size = size.unwrap_or(config.transfer.read_size);
            if size == 0 {
                return Err(anyhow!("Read size must be greater than zero"));
            }
            read_report(&path, interface, size)
        }
        Command::Write {
            path,
            data,
            interface,
        } => write_report(&path, interface, &parse_hex(&data)?),
    }
}

fn list_devices(filter: &Filter) -> Result<()> {
    let infos = enumerate_raw(&RusbHost, filter).context("Failed to enumerate USB devices")?;

    if infos.is_empty() {
        println!("No raw USB devices found.");
        return Ok(());
    }

    println!("Found {} raw interface(s):\n", infos.len());
    for info in &infos {
        println!(
            "  {}  {:04x}:{:04x}  interface {} alt {}",
            info.path(),
            info.vendor_id(),
            info.product_id(),
            info.interface(),
            info.alt_setting()
        );
        println!(
            "      Bus {:03} Port {:03}  IN {:#04x}  OUT {:#04x}",
            info.bus_number(),
            info.port_number(),
            info.reader(),
            info.writer()
        );
    }

    Ok(())
}

/// Find the enumerated interface behind a `list` path
fn find_device(path: &str, interface: Option<u8>) -> Result<DeviceInfo<RusbDevice>> {
    let infos = enumerate_raw(&RusbHost, &Filter::default())
        .context("Failed to enumerate USB devices")?;

    infos
        .into_iter()
        .find(|info| info.path() == path && interface.is_none_or(|i| info.interface() == i))
        .ok_or_else(|| anyhow!("No raw device found at {}", path))
}

fn read_report(path: &str, interface: Option<u8>, size: usize) -> Result<()> {
    let info = find_device(path, interface)?;
    let device = info.open()?;

    let mut buf = vec![0u8; size];
    let count = device.read(&mut buf)?;
    device.close()?;

    info!("Read {} of {} bytes from {}", count, size, path);
    println!("{}", to_hex(&buf[..count]));
    Ok(())
}

fn write_report(path: &str, interface: Option<u8>, data: &[u8]) -> Result<()> {
    let info = find_device(path, interface)?;
    let device = info.open()?;

    let count = device.write(data)?;
    device.close()?;

    info!("Wrote {} of {} bytes to {}", count, data.len(), path);
    println!("{}", count);
    Ok(())
}

fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
