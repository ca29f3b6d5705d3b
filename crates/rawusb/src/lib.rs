//! Driverless access to USB devices with an interrupt IN/OUT endpoint pair
//!
//! Enumeration walks every device's configuration, interface, alternate
//! setting and endpoint descriptors, and reports each alternate setting that
//! carries one interrupt IN and one interrupt OUT endpoint. Opening such a
//! [`DeviceInfo`] yields a [`RawDevice`] whose reads, writes and close are
//! serialized against the single underlying host handle.
//!
//! The host USB stack sits behind the [`host`] traits: [`RusbHost`] binds them
//! to libusb, [`test_utils::MockHost`] simulates them in memory.
//!
//! ```no_run
//! # fn main() -> rawusb::Result<()> {
//! for info in rawusb::enumerate(0x1209, 0)? {
//!     let device = info.open()?;
//!     device.write(&[0x00, 0x01])?;
//!     let mut report = [0u8; 64];
//!     let n = device.read(&mut report)?;
//!     println!("{}: {:02x?}", info.path(), &report[..n]);
//!     device.close()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod device;
pub mod dispatch;
pub mod enumerate;
pub mod error;
pub mod host;
pub mod matcher;
pub mod rusb_host;
pub mod test_utils;

pub use device::{DeviceInfo, RawDevice};
pub use dispatch::{DeviceKind, HidEnumerator, UsbDevice, UsbDeviceInfo, enumerate_all};
pub use enumerate::{Filter, enumerate_raw};
pub use error::{EnumerationError, Error, HostError, HostErrorKind, Result, TransferDirection};
pub use matcher::{EndpointPair, classify};
pub use rusb_host::{RusbDevice, RusbHost};

/// Enumerate raw devices on the system USB stack
///
/// A zero `vendor_id` or `product_id` matches any value. HID class devices
/// are included; use [`enumerate_all`] with a [`HidEnumerator`] to route them
/// through a HID library instead.
pub fn enumerate(vendor_id: u16, product_id: u16) -> Result<Vec<DeviceInfo<RusbDevice>>> {
    Ok(enumerate_raw(&RusbHost, &Filter::new(vendor_id, product_id))?)
}
