//! Raw device enumeration
//!
//! Walks device -> configuration -> interface -> alternate setting and
//! reports every alternate setting that carries an interrupt IN/OUT pair.

use crate::descriptor::{CLASS_HID, DeviceDescriptor};
use crate::device::DeviceInfo;
use crate::error::EnumerationError;
use crate::host::{HostDevice, HostSession, UsbHost};
use crate::matcher::classify;
use tracing::{debug, trace};

/// Which devices an enumeration pass should report
///
/// A zero vendor or product ID matches any value of that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Leave HID class devices to a dedicated HID enumerator
    pub skip_hid: bool,
}

impl Filter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            skip_hid: false,
        }
    }

    pub fn skip_hid(mut self, skip_hid: bool) -> Self {
        self.skip_hid = skip_hid;
        self
    }

    /// Check a VID/PID pair against the filter
    pub fn matches_ids(&self, vendor_id: u16, product_id: u16) -> bool {
        (self.vendor_id == 0 || self.vendor_id == vendor_id)
            && (self.product_id == 0 || self.product_id == product_id)
    }

    pub fn admits(&self, descriptor: &DeviceDescriptor) -> bool {
        if !self.matches_ids(descriptor.vendor_id, descriptor.product_id) {
            return false;
        }
        !(self.skip_hid && descriptor.class_code == CLASS_HID)
    }
}

/// Enumerate raw interrupt interfaces through `host`
///
/// Opens a dedicated host session for this call and releases it before
/// returning on every path. Any descriptor failure aborts the whole pass;
/// no partial list is ever returned.
pub fn enumerate_raw<H: UsbHost>(
    host: &H,
    filter: &Filter,
) -> Result<Vec<DeviceInfo<H::Device>>, EnumerationError> {
    let session = host.open_session().map_err(EnumerationError::Init)?;
    let devices = session.devices().map_err(EnumerationError::DeviceList)?;

    let mut infos = Vec::new();
    for (index, device) in devices.iter().enumerate() {
        let descriptor = device
            .device_descriptor()
            .map_err(|source| EnumerationError::DeviceDescriptor {
                device: index,
                source,
            })?;

        if !filter.admits(&descriptor) {
            trace!(
                "Device {} ignored by filter: vid={:#06x}, pid={:#06x}, class={:#04x}",
                index, descriptor.vendor_id, descriptor.product_id, descriptor.class_code
            );
            continue;
        }

        for config_index in 0..descriptor.num_configurations {
            let config = device.config_descriptor(config_index).map_err(|source| {
                EnumerationError::ConfigDescriptor {
                    device: index,
                    config: config_index,
                    source,
                }
            })?;

            for (interface, alt) in config.alt_settings() {
                let Some(endpoints) = classify(alt) else {
                    continue;
                };

                let info =
                    DeviceInfo::new(device.clone(), &descriptor, interface, alt.setting, endpoints);
                debug!(
                    "Found raw device {}: interface {}, alt {}, reader {:#04x}, writer {:#04x}",
                    info.path(),
                    interface,
                    alt.setting,
                    endpoints.reader,
                    endpoints.writer
                );
                infos.push(info);
            }
        }
    }

    debug!(
        "Enumerated {} raw interfaces across {} devices",
        infos.len(),
        devices.len()
    );
    Ok(infos)
}
