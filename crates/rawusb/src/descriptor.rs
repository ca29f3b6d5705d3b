//! Owned USB descriptor tree
//!
//! Descriptors are copied out of host stack memory the moment they are
//! retrieved, so nothing here borrows from the binding and nothing dangles
//! once a device list or config descriptor is released.

/// Direction bit of `bEndpointAddress` (set = device to host)
pub const ENDPOINT_DIR_MASK: u8 = 0x80;
/// Transfer type bits of `bmAttributes`
pub const TRANSFER_TYPE_MASK: u8 = 0x03;
/// `bmAttributes` transfer type value for interrupt endpoints
pub const TRANSFER_TYPE_INTERRUPT: u8 = 0x03;
/// Device class code for HID devices
pub const CLASS_HID: u8 = 0x03;

/// Device level descriptor snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub class_code: u8,
    pub num_configurations: u8,
}

/// One configuration and its interfaces, in descriptor order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDescriptor {
    pub number: u8,
    pub interfaces: Vec<InterfaceDescriptor>,
}

impl ConfigDescriptor {
    /// Walk every alternate setting that declares at least one endpoint
    ///
    /// Yields `(interface_number, alt_setting)` ordered by interface, then
    /// by alternate setting.
    pub fn alt_settings(&self) -> impl Iterator<Item = (u8, &AltSetting)> + '_ {
        self.interfaces.iter().flat_map(|iface| {
            iface
                .alt_settings
                .iter()
                .filter(|alt| !alt.endpoints.is_empty())
                .map(move |alt| (iface.number, alt))
        })
    }
}

/// An interface and all of its alternate settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub number: u8,
    pub alt_settings: Vec<AltSetting>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltSetting {
    pub setting: u8,
    pub class_code: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// `bEndpointAddress`
    pub address: u8,
    /// `bmAttributes`
    pub attributes: u8,
}

impl EndpointDescriptor {
    pub fn is_in(&self) -> bool {
        self.address & ENDPOINT_DIR_MASK != 0
    }

    pub fn is_out(&self) -> bool {
        !self.is_in()
    }

    pub fn is_interrupt(&self) -> bool {
        self.attributes & TRANSFER_TYPE_MASK == TRANSFER_TYPE_INTERRUPT
    }
}
