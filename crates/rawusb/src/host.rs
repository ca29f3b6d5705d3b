//! Host USB stack abstraction
//!
//! The enumerator and device handle only talk to the host stack through
//! these traits. [`crate::rusb_host`] binds them to libusb; the test double
//! in [`crate::test_utils`] implements them in memory.

use crate::descriptor::{ConfigDescriptor, DeviceDescriptor};
use crate::error::HostError;
use std::fmt;

/// Entry point into a host USB stack
///
/// Every call to [`UsbHost::open_session`] must produce an independent
/// session so concurrent enumerations never share mutable host state.
pub trait UsbHost: Send + Sync {
    type Device: HostDevice;
    type Session: HostSession<Device = Self::Device>;

    fn open_session(&self) -> Result<Self::Session, HostError>;
}

/// A live host stack session, released when dropped
pub trait HostSession {
    type Device: HostDevice;

    /// List attached devices
    ///
    /// The returned references are retained individually; the underlying
    /// host list is released before this returns.
    fn devices(&self) -> Result<Vec<Self::Device>, HostError>;
}

/// A retained reference to an attached device
pub trait HostDevice: Clone + fmt::Debug + Send + Sync + 'static {
    type Handle: HostHandle;

    fn device_descriptor(&self) -> Result<DeviceDescriptor, HostError>;

    /// Fetch configuration `index` as an owned copy
    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, HostError>;

    fn bus_number(&self) -> u8;

    fn port_number(&self) -> u8;

    /// Open a handle for transfers on `interface` with `alt_setting` active
    fn open(&self, interface: u8, alt_setting: u8) -> Result<Self::Handle, HostError>;
}

/// An open device handle; dropping it closes the handle
pub trait HostHandle: Send + 'static {
    /// Blocking interrupt IN transfer without timeout
    fn read_interrupt(&mut self, endpoint: u8, buf: &mut [u8]) -> Result<usize, HostError>;

    /// Blocking interrupt OUT transfer without timeout
    fn write_interrupt(&mut self, endpoint: u8, buf: &[u8]) -> Result<usize, HostError>;
}
