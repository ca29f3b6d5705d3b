//! In-memory host stack for tests
//!
//! [`MockHost`] implements the host traits without touching hardware. It can
//! inject failures at every host call and counts sessions and handles so
//! tests can assert that nothing leaks or is released twice.
//!
//! # Example
//!
//! ```
//! use rawusb::test_utils::{MockDeviceSpec, MockHost};
//! use rawusb::{Filter, enumerate_raw};
//!
//! let host = MockHost::new();
//! host.add_device(MockDeviceSpec::raw(0x1234, 0x5678));
//!
//! let infos = enumerate_raw(&host, &Filter::new(0x1234, 0)).unwrap();
//! assert_eq!(infos.len(), 1);
//! assert_eq!(infos[0].path(), "1234:5678:1");
//! assert_eq!(host.stats().live_sessions(), 0);
//! ```

use crate::descriptor::{
    AltSetting, ConfigDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
};
use crate::error::{HostError, HostErrorKind};
use crate::host::{HostDevice, HostHandle, HostSession, UsbHost};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const ATTR_BULK: u8 = 0x02;
pub const ATTR_INTERRUPT: u8 = 0x03;

/// An alternate setting with the given `(address, attributes)` endpoints
pub fn alt_setting(setting: u8, endpoints: &[(u8, u8)]) -> AltSetting {
    AltSetting {
        setting,
        class_code: 0xff,
        endpoints: endpoints
            .iter()
            .map(|&(address, attributes)| EndpointDescriptor {
                address,
                attributes,
            })
            .collect(),
    }
}

/// A single-interface configuration with one interrupt IN/OUT pair
pub fn interrupt_config(number: u8, interface: u8, reader: u8, writer: u8) -> ConfigDescriptor {
    ConfigDescriptor {
        number,
        interfaces: vec![InterfaceDescriptor {
            number: interface,
            alt_settings: vec![alt_setting(
                0,
                &[(reader, ATTR_INTERRUPT), (writer, ATTR_INTERRUPT)],
            )],
        }],
    }
}

/// Description of a simulated device
#[derive(Debug, Clone)]
pub struct MockDeviceSpec {
    pub descriptor: DeviceDescriptor,
    pub configs: Vec<ConfigDescriptor>,
    pub bus_number: u8,
    pub port_number: u8,
    /// Bytes returned per read; shorter than the buffer means a short transfer
    pub report_len: usize,
    /// Upper bound on bytes accepted per write
    pub write_limit: Option<usize>,
    /// Time each transfer spends "on the wire"
    pub transfer_delay: Duration,
    pub fail_device_descriptor: Option<HostErrorKind>,
    pub fail_config_descriptor: Option<(u8, HostErrorKind)>,
    pub fail_transfer: Option<HostErrorKind>,
}

impl MockDeviceSpec {
    /// A device with no configurations
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            descriptor: DeviceDescriptor {
                vendor_id,
                product_id,
                class_code: 0x00,
                num_configurations: 0,
            },
            configs: Vec::new(),
            bus_number: 1,
            port_number: 1,
            report_len: 64,
            write_limit: None,
            transfer_delay: Duration::ZERO,
            fail_device_descriptor: None,
            fail_config_descriptor: None,
            fail_transfer: None,
        }
    }

    /// A device with one raw interface 0 on endpoints 0x81 / 0x01
    pub fn raw(vendor_id: u16, product_id: u16) -> Self {
        Self::new(vendor_id, product_id).with_config(interrupt_config(1, 0, 0x81, 0x01))
    }

    pub fn with_config(mut self, config: ConfigDescriptor) -> Self {
        self.configs.push(config);
        self.descriptor.num_configurations =
            u8::try_from(self.configs.len()).expect("a device has at most 255 configurations");
        self
    }

    pub fn with_class(mut self, class_code: u8) -> Self {
        self.descriptor.class_code = class_code;
        self
    }

    pub fn with_port(mut self, port_number: u8) -> Self {
        self.port_number = port_number;
        self
    }

    pub fn with_report_len(mut self, report_len: usize) -> Self {
        self.report_len = report_len;
        self
    }

    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    pub fn with_transfer_delay(mut self, delay: Duration) -> Self {
        self.transfer_delay = delay;
        self
    }

    pub fn failing_device_descriptor(mut self, kind: HostErrorKind) -> Self {
        self.fail_device_descriptor = Some(kind);
        self
    }

    pub fn failing_config_descriptor(mut self, index: u8, kind: HostErrorKind) -> Self {
        self.fail_config_descriptor = Some((index, kind));
        self
    }

    pub fn failing_transfers(mut self, kind: HostErrorKind) -> Self {
        self.fail_transfer = Some(kind);
        self
    }
}

/// Resource counters shared by a host and all of its devices
#[derive(Debug, Default)]
pub struct MockStats {
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub config_fetches: AtomicUsize,
    pub handles_opened: AtomicUsize,
    pub handles_closed: AtomicUsize,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl MockStats {
    pub fn live_sessions(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst) - self.sessions_closed.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.handles_opened.load(Ordering::SeqCst) - self.handles_closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct HostState {
    devices: Mutex<Vec<MockDevice>>,
    fail_init: Mutex<Option<HostErrorKind>>,
    fail_list: Mutex<Option<HostErrorKind>>,
    stats: Arc<MockStats>,
}

/// Simulated host stack
#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<HostState>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device; the returned handle observes it
    pub fn add_device(&self, spec: MockDeviceSpec) -> MockDevice {
        let device = MockDevice {
            inner: Arc::new(DeviceState {
                spec,
                detached: AtomicBool::new(false),
                written: Mutex::new(Vec::new()),
                opened: Mutex::new(Vec::new()),
                stats: self.state.stats.clone(),
            }),
        };
        lock(&self.state.devices).push(device.clone());
        device
    }

    /// Unplug every device matching `vendor_id:product_id`
    ///
    /// Previously enumerated references become stale and fail to open.
    pub fn remove_device(&self, vendor_id: u16, product_id: u16) {
        lock(&self.state.devices).retain(|device| {
            let desc = device.inner.spec.descriptor;
            let gone = desc.vendor_id == vendor_id && desc.product_id == product_id;
            if gone {
                device.inner.detached.store(true, Ordering::SeqCst);
            }
            !gone
        });
    }

    pub fn fail_init(&self, kind: Option<HostErrorKind>) {
        *lock(&self.state.fail_init) = kind;
    }

    pub fn fail_device_list(&self, kind: Option<HostErrorKind>) {
        *lock(&self.state.fail_list) = kind;
    }

    pub fn stats(&self) -> &MockStats {
        &self.state.stats
    }
}

impl UsbHost for MockHost {
    type Device = MockDevice;
    type Session = MockSession;

    fn open_session(&self) -> Result<MockSession, HostError> {
        if let Some(kind) = *lock(&self.state.fail_init) {
            return Err(HostError::new("libusb_init", kind));
        }
        self.state.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            state: self.state.clone(),
        })
    }
}

/// Simulated session; counts itself closed on drop
pub struct MockSession {
    state: Arc<HostState>,
}

impl HostSession for MockSession {
    type Device = MockDevice;

    fn devices(&self) -> Result<Vec<MockDevice>, HostError> {
        if let Some(kind) = *lock(&self.state.fail_list) {
            return Err(HostError::new("libusb_get_device_list", kind));
        }
        Ok(lock(&self.state.devices).clone())
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.stats.sessions_closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct DeviceState {
    spec: MockDeviceSpec,
    detached: AtomicBool,
    written: Mutex<Vec<(u8, Vec<u8>)>>,
    opened: Mutex<Vec<(u8, u8)>>,
    stats: Arc<MockStats>,
}

/// Simulated device reference
#[derive(Clone)]
pub struct MockDevice {
    inner: Arc<DeviceState>,
}

impl fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDevice")
            .field("descriptor", &self.inner.spec.descriptor)
            .field("port_number", &self.inner.spec.port_number)
            .finish()
    }
}

impl MockDevice {
    /// Every `(endpoint, payload)` accepted by any handle of this device
    pub fn written(&self) -> Vec<(u8, Vec<u8>)> {
        lock(&self.inner.written).clone()
    }

    /// Every `(interface, alt_setting)` a handle was opened with
    pub fn opened(&self) -> Vec<(u8, u8)> {
        lock(&self.inner.opened).clone()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::SeqCst)
    }
}

impl HostDevice for MockDevice {
    type Handle = MockHandle;

    fn device_descriptor(&self) -> Result<DeviceDescriptor, HostError> {
        match self.inner.spec.fail_device_descriptor {
            Some(kind) => Err(HostError::new("libusb_get_device_descriptor", kind)),
            None => Ok(self.inner.spec.descriptor),
        }
    }

    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, HostError> {
        const OP: &str = "libusb_get_config_descriptor";

        self.inner.stats.config_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some((failing, kind)) = self.inner.spec.fail_config_descriptor
            && failing == index
        {
            return Err(HostError::new(OP, kind));
        }
        self.inner
            .spec
            .configs
            .get(usize::from(index))
            .cloned()
            .ok_or_else(|| HostError::new(OP, HostErrorKind::NotFound))
    }

    fn bus_number(&self) -> u8 {
        self.inner.spec.bus_number
    }

    fn port_number(&self) -> u8 {
        self.inner.spec.port_number
    }

    fn open(&self, interface: u8, alt_setting: u8) -> Result<MockHandle, HostError> {
        if self.is_detached() {
            return Err(HostError::new("libusb_open", HostErrorKind::NoDevice));
        }
        lock(&self.inner.opened).push((interface, alt_setting));
        self.inner.stats.handles_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockHandle {
            device: self.inner.clone(),
            interface,
            alt_setting,
        })
    }
}

/// Simulated open handle; counts itself closed on drop
///
/// Only endpoints of the alternate setting selected at open are reachable,
/// anything else fails with [`HostErrorKind::NotFound`] as in libusb.
pub struct MockHandle {
    device: Arc<DeviceState>,
    interface: u8,
    alt_setting: u8,
}

impl MockHandle {
    fn endpoint_active(&self, endpoint: u8) -> bool {
        self.device
            .spec
            .configs
            .iter()
            .flat_map(|config| &config.interfaces)
            .filter(|iface| iface.number == self.interface)
            .flat_map(|iface| &iface.alt_settings)
            .filter(|alt| alt.setting == self.alt_setting)
            .any(|alt| alt.endpoints.iter().any(|ep| ep.address == endpoint))
    }

    fn transfer<T>(&self, endpoint: u8, op: impl FnOnce() -> T) -> Result<T, HostError> {
        const OP: &str = "libusb_interrupt_transfer";

        if !self.endpoint_active(endpoint) {
            return Err(HostError::new(OP, HostErrorKind::NotFound));
        }
        let spec = &self.device.spec;
        if !spec.transfer_delay.is_zero() {
            std::thread::sleep(spec.transfer_delay);
        }
        match spec.fail_transfer {
            Some(kind) => Err(HostError::new(OP, kind)),
            None => Ok(op()),
        }
    }
}

impl HostHandle for MockHandle {
    fn read_interrupt(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, HostError> {
        let len = buf.len().min(self.device.spec.report_len);
        let count = self.transfer(endpoint, || {
            buf[..len].fill(endpoint);
            len
        })?;
        self.device.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(count)
    }

    fn write_interrupt(&mut self, endpoint: u8, buf: &[u8]) -> Result<usize, HostError> {
        let len = self
            .device
            .spec
            .write_limit
            .map_or(buf.len(), |limit| buf.len().min(limit));
        let count = self.transfer(endpoint, || {
            lock(&self.device.written).push((endpoint, buf[..len].to_vec()));
            len
        })?;
        self.device.stats.writes.fetch_add(1, Ordering::SeqCst);
        Ok(count)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.device.stats.handles_closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_config_counts_configurations() {
        let spec =
            MockDeviceSpec::raw(0x1234, 0x0001).with_config(interrupt_config(2, 1, 0x82, 0x02));
        assert_eq!(spec.descriptor.num_configurations, 2);
    }

    #[test]
    #[should_panic(expected = "at most 255 configurations")]
    fn test_with_config_rejects_too_many_configurations() {
        (0..=255u8).fold(MockDeviceSpec::new(0x1234, 0x0001), |spec, n| {
            spec.with_config(interrupt_config(n, 0, 0x81, 0x01))
        });
    }
}
