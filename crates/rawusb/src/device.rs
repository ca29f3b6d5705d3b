//! Enumeration results and open raw devices

use crate::descriptor::DeviceDescriptor;
use crate::error::{Error, Result, TransferDirection};
use crate::host::{HostDevice, HostHandle};
use crate::matcher::EndpointPair;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// A device interface exposing a raw interrupt endpoint pair
///
/// Holds a retained reference to the host device, so it stays openable
/// after the enumeration that produced it has released its device list.
#[derive(Debug, Clone)]
pub struct DeviceInfo<D: HostDevice> {
    path: String,
    vendor_id: u16,
    product_id: u16,
    interface: u8,
    alt_setting: u8,
    bus_number: u8,
    port_number: u8,
    endpoints: EndpointPair,
    device: D,
}

impl<D: HostDevice> DeviceInfo<D> {
    pub(crate) fn new(
        device: D,
        descriptor: &DeviceDescriptor,
        interface: u8,
        alt_setting: u8,
        endpoints: EndpointPair,
    ) -> Self {
        let port_number = device.port_number();
        Self {
            path: device_path(descriptor.vendor_id, descriptor.product_id, port_number),
            vendor_id: descriptor.vendor_id,
            product_id: descriptor.product_id,
            interface,
            alt_setting,
            bus_number: device.bus_number(),
            port_number,
            endpoints,
            device,
        }
    }

    /// Stable `vendor:product:port` identifier
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn alt_setting(&self) -> u8 {
        self.alt_setting
    }

    pub fn bus_number(&self) -> u8 {
        self.bus_number
    }

    pub fn port_number(&self) -> u8 {
        self.port_number
    }

    /// Interrupt IN endpoint address
    pub fn reader(&self) -> u8 {
        self.endpoints.reader
    }

    /// Interrupt OUT endpoint address
    pub fn writer(&self) -> u8 {
        self.endpoints.writer
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Open the device for interrupt transfers
    pub fn open(&self) -> Result<RawDevice<D>> {
        let handle = self
            .device
            .open(self.interface, self.alt_setting)
            .map_err(|source| {
            warn!("Failed to open device {}: {}", self.path, source);
            Error::Open {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(
            "Opened device {} (interface {} alt {}, reader {:#04x}, writer {:#04x})",
            self.path,
            self.interface,
            self.alt_setting,
            self.endpoints.reader,
            self.endpoints.writer
        );

        Ok(RawDevice {
            info: self.clone(),
            handle: Mutex::new(Some(handle)),
        })
    }
}

/// Path format: lowercase hex vendor and product, decimal port
pub fn device_path(vendor_id: u16, product_id: u16, port_number: u8) -> String {
    format!("{:x}:{:x}:{}", vendor_id, product_id, port_number)
}

/// A live connection to a raw device
///
/// Read, write and close are serialized by one lock, so a close always
/// waits for an in-flight transfer and no transfer ever sees a released
/// handle. The handle is released exactly once, either by [`RawDevice::close`]
/// or on drop.
pub struct RawDevice<D: HostDevice> {
    info: DeviceInfo<D>,
    handle: Mutex<Option<D::Handle>>,
}

impl<D: HostDevice> RawDevice<D> {
    pub fn info(&self) -> &DeviceInfo<D> {
        &self.info
    }

    pub fn path(&self) -> &str {
        self.info.path()
    }

    /// Read one interrupt report into `buf`
    ///
    /// Blocks until the device responds. A short report is returned as a
    /// smaller count, not an error.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer(TransferDirection::Read));
        }

        let mut guard = self.lock();
        let handle = guard.as_mut().ok_or(Error::Closed)?;
        let endpoint = self.info.reader();

        handle
            .read_interrupt(endpoint, buf)
            .map_err(|source| Error::Transfer {
                direction: TransferDirection::Read,
                endpoint,
                source,
            })
    }

    /// Write `buf` as one interrupt transfer
    ///
    /// Blocks until the device accepts the data; returns the number of bytes
    /// actually sent.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::EmptyBuffer(TransferDirection::Write));
        }

        let mut guard = self.lock();
        let handle = guard.as_mut().ok_or(Error::Closed)?;
        let endpoint = self.info.writer();

        handle
            .write_interrupt(endpoint, buf)
            .map_err(|source| Error::Transfer {
                direction: TransferDirection::Write,
                endpoint,
                source,
            })
    }

    /// Release the hardware handle; later calls are no-ops
    pub fn close(&self) -> Result<()> {
        if let Some(handle) = self.lock().take() {
            drop(handle);
            debug!("Closed device {}", self.info.path());
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    // A panic inside a transfer leaves the handle itself intact
    fn lock(&self) -> MutexGuard<'_, Option<D::Handle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
