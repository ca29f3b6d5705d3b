//! Generic device view across the raw and HID paths
//!
//! Raw devices come from [`enumerate_raw`]; HID devices come from whatever
//! [`HidEnumerator`] the application plugs in. Both are exposed through the
//! same object-safe traits so callers can hold one merged device list.

use crate::device::{DeviceInfo, RawDevice};
use crate::enumerate::{Filter, enumerate_raw};
use crate::error::Result;
use crate::host::{HostDevice, UsbHost};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Generic,
    Hid,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => f.write_str("generic"),
            Self::Hid => f.write_str("hid"),
        }
    }
}

/// An enumerated device of either kind
pub trait UsbDeviceInfo: fmt::Debug + Send + Sync {
    fn kind(&self) -> DeviceKind;

    /// Platform or implementation specific device path
    fn path(&self) -> &str;

    /// `(vendor_id, product_id, interface, usage_page)`
    ///
    /// The usage page is only meaningful for HID devices and is 0 otherwise.
    fn ids(&self) -> (u16, u16, u8, u16);

    fn open(&self) -> Result<Box<dyn UsbDevice>>;
}

/// An open device of either kind
pub trait UsbDevice: Send + Sync {
    fn kind(&self) -> DeviceKind;

    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    fn write(&self, buf: &[u8]) -> Result<usize>;

    fn close(&self) -> Result<()>;
}

/// Source of HID class devices
pub trait HidEnumerator: Send + Sync {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<Box<dyn UsbDeviceInfo>>>;
}

impl<D: HostDevice> UsbDeviceInfo for DeviceInfo<D> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Generic
    }

    fn path(&self) -> &str {
        DeviceInfo::path(self)
    }

    fn ids(&self) -> (u16, u16, u8, u16) {
        (self.vendor_id(), self.product_id(), self.interface(), 0)
    }

    fn open(&self) -> Result<Box<dyn UsbDevice>> {
        let device = DeviceInfo::open(self)?;
        Ok(Box::new(device))
    }
}

impl<D: HostDevice> UsbDevice for RawDevice<D> {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Generic
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        RawDevice::read(self, buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        RawDevice::write(self, buf)
    }

    fn close(&self) -> Result<()> {
        RawDevice::close(self)
    }
}

/// Enumerate raw and HID devices into one list
///
/// With a HID enumerator, HID class devices are skipped by the raw pass and
/// reported by `hid` instead, after all raw entries. Without one, the raw
/// pass covers every device class.
pub fn enumerate_all<H: UsbHost>(
    host: &H,
    hid: Option<&dyn HidEnumerator>,
    vendor_id: u16,
    product_id: u16,
) -> Result<Vec<Box<dyn UsbDeviceInfo>>> {
    let filter = Filter::new(vendor_id, product_id).skip_hid(hid.is_some());

    let mut infos: Vec<Box<dyn UsbDeviceInfo>> = enumerate_raw(host, &filter)?
        .into_iter()
        .map(|info| Box::new(info) as Box<dyn UsbDeviceInfo>)
        .collect();
    let raw_count = infos.len();

    if let Some(hid) = hid {
        infos.extend(hid.enumerate(vendor_id, product_id)?);
    }

    debug!(
        "Merged {} raw and {} HID devices",
        raw_count,
        infos.len() - raw_count
    );
    Ok(infos)
}
