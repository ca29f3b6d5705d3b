//! libusb binding via rusb
//!
//! Each session owns a fresh `rusb::Context`. Device references handed out
//! by a session keep that context alive through rusb's own reference
//! counting, so a [`crate::DeviceInfo`] can still be opened after the
//! enumeration that produced it has returned.

use crate::descriptor::{
    AltSetting, ConfigDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};
use crate::error::HostError;
use crate::host::{HostDevice, HostHandle, HostSession, UsbHost};
use rusb::{Context, SyncType, TransferType, UsageType, UsbContext};
use std::time::Duration;
use tracing::debug;

/// libusb treats a zero timeout as "wait forever"
const NO_TIMEOUT: Duration = Duration::ZERO;

/// Host stack backed by the system libusb
#[derive(Debug, Clone, Copy, Default)]
pub struct RusbHost;

impl UsbHost for RusbHost {
    type Device = RusbDevice;
    type Session = RusbSession;

    fn open_session(&self) -> Result<RusbSession, HostError> {
        let context = Context::new().map_err(|e| HostError::from_rusb("libusb_init", e))?;
        Ok(RusbSession { context })
    }
}

pub struct RusbSession {
    context: Context,
}

impl HostSession for RusbSession {
    type Device = RusbDevice;

    fn devices(&self) -> Result<Vec<RusbDevice>, HostError> {
        let list = self
            .context
            .devices()
            .map_err(|e| HostError::from_rusb("libusb_get_device_list", e))?;

        // Each yielded device carries its own reference; the list itself is
        // freed when `list` drops at the end of this scope.
        Ok(list.iter().map(RusbDevice).collect())
    }
}

/// Retained libusb device reference
#[derive(Debug, Clone)]
pub struct RusbDevice(rusb::Device<Context>);

impl HostDevice for RusbDevice {
    type Handle = RusbHandle;

    fn device_descriptor(&self) -> Result<DeviceDescriptor, HostError> {
        let desc = self
            .0
            .device_descriptor()
            .map_err(|e| HostError::from_rusb("libusb_get_device_descriptor", e))?;

        Ok(DeviceDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            class_code: desc.class_code(),
            num_configurations: desc.num_configurations(),
        })
    }

    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, HostError> {
        let config = self
            .0
            .config_descriptor(index)
            .map_err(|e| HostError::from_rusb("libusb_get_config_descriptor", e))?;

        let interfaces = config
            .interfaces()
            .map(|iface| InterfaceDescriptor {
                number: iface.number(),
                alt_settings: iface
                    .descriptors()
                    .map(|alt| AltSetting {
                        setting: alt.setting_number(),
                        class_code: alt.class_code(),
                        endpoints: alt
                            .endpoint_descriptors()
                            .map(|ep| EndpointDescriptor {
                                address: ep.address(),
                                attributes: attributes(&ep),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        Ok(ConfigDescriptor {
            number: config.number(),
            interfaces,
        })
    }

    fn bus_number(&self) -> u8 {
        self.0.bus_number()
    }

    fn port_number(&self) -> u8 {
        self.0.port_number()
    }

    fn open(&self, interface: u8, alt_setting: u8) -> Result<RusbHandle, HostError> {
        let mut handle = self
            .0
            .open()
            .map_err(|e| HostError::from_rusb("libusb_open", e))?;

        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!(%err, "kernel driver auto-detach unavailable; continuing");
        }
        // Transfers still work on platforms that auto-claim on first use
        if let Err(err) = handle.claim_interface(interface) {
            debug!(%err, interface, "could not claim interface; continuing");
        }
        // Alt 0 is active after claiming; other settings carry their own endpoints
        if alt_setting != 0 {
            handle
                .set_alternate_setting(interface, alt_setting)
                .map_err(|e| HostError::from_rusb("libusb_set_interface_alt_setting", e))?;
        }

        Ok(RusbHandle(handle))
    }
}

/// Open libusb handle; claimed interfaces are released by rusb on drop
pub struct RusbHandle(rusb::DeviceHandle<Context>);

impl HostHandle for RusbHandle {
    fn read_interrupt(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, HostError> {
        self.0
            .read_interrupt(endpoint, buf, NO_TIMEOUT)
            .map_err(|e| HostError::from_rusb("libusb_interrupt_transfer", e))
    }

    fn write_interrupt(&mut self, endpoint: u8, buf: &[u8]) -> Result<usize, HostError> {
        self.0
            .write_interrupt(endpoint, buf, NO_TIMEOUT)
            .map_err(|e| HostError::from_rusb("libusb_interrupt_transfer", e))
    }
}

/// Rebuild `bmAttributes` from rusb's decoded endpoint fields
fn attributes(ep: &rusb::EndpointDescriptor<'_>) -> u8 {
    let transfer = match ep.transfer_type() {
        TransferType::Control => 0x00,
        TransferType::Isochronous => 0x01,
        TransferType::Bulk => 0x02,
        TransferType::Interrupt => 0x03,
    };
    let sync = match ep.sync_type() {
        SyncType::NoSync => 0x00,
        SyncType::Asynchronous => 0x01,
        SyncType::Adaptive => 0x02,
        SyncType::Synchronous => 0x03,
    };
    let usage = match ep.usage_type() {
        UsageType::Data => 0x00,
        UsageType::Feedback => 0x01,
        UsageType::FeedbackData => 0x02,
        UsageType::Reserved => 0x03,
    };
    transfer | (sync << 2) | (usage << 4)
}
