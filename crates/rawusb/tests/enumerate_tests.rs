//! Enumeration Integration Tests
//!
//! Drives the enumerator against the in-memory host stack.
//!
//! # Test Scenarios
//! - Vendor/product filtering and wildcards
//! - HID class skipping
//! - Descriptor tree walking (configs, interfaces, alternate settings)
//! - Fail-fast error reporting
//! - Session release on every exit path
//! - Concurrent enumeration
//!
//! Run with: `cargo test -p rawusb --test enumerate_tests`

use rawusb::descriptor::{CLASS_HID, ConfigDescriptor, InterfaceDescriptor};
use rawusb::test_utils::{
    ATTR_BULK, ATTR_INTERRUPT, MockDeviceSpec, MockHost, alt_setting, interrupt_config,
};
use rawusb::{EnumerationError, Filter, HostErrorKind, enumerate_raw};
use std::sync::Arc;
use std::thread;

fn populated_host() -> MockHost {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::raw(0x1234, 0x0001).with_port(1));
    host.add_device(MockDeviceSpec::raw(0x1234, 0x0002).with_port(2));
    host.add_device(MockDeviceSpec::raw(0xabcd, 0x0001).with_port(3));
    host
}

// ============================================================================
// Filter Tests
// ============================================================================

#[test]
fn test_wildcard_returns_every_raw_device() {
    let host = populated_host();

    let infos = enumerate_raw(&host, &Filter::new(0, 0)).unwrap();

    let paths: Vec<&str> = infos.iter().map(|info| info.path()).collect();
    assert_eq!(paths, vec!["1234:1:1", "1234:2:2", "abcd:1:3"]);
}

#[test]
fn test_vendor_filter() {
    let host = populated_host();

    let infos = enumerate_raw(&host, &Filter::new(0x1234, 0)).unwrap();

    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|info| info.vendor_id() == 0x1234));
}

#[test]
fn test_product_filter() {
    let host = populated_host();

    let infos = enumerate_raw(&host, &Filter::new(0, 0x0001)).unwrap();

    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|info| info.product_id() == 0x0001));
}

#[test]
fn test_exact_filter() {
    let host = populated_host();

    let infos = enumerate_raw(&host, &Filter::new(0xabcd, 0x0001)).unwrap();

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].path(), "abcd:1:3");
}

#[test]
fn test_filter_without_match_is_empty() {
    let host = populated_host();

    let infos = enumerate_raw(&host, &Filter::new(0x9999, 0)).unwrap();

    assert!(infos.is_empty());
}

#[test]
fn test_filtered_devices_are_not_walked() {
    let host = populated_host();

    enumerate_raw(&host, &Filter::new(0xabcd, 0)).unwrap();

    assert_eq!(
        host.stats()
            .config_fetches
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

// ============================================================================
// HID Class Tests
// ============================================================================

#[test]
fn test_skip_hid_excludes_hid_class() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::raw(0x1234, 0x0001));
    host.add_device(MockDeviceSpec::raw(0x1234, 0x0002).with_class(CLASS_HID));

    let skipped = enumerate_raw(&host, &Filter::new(0x1234, 0).skip_hid(true)).unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].product_id(), 0x0001);

    let kept = enumerate_raw(&host, &Filter::new(0x1234, 0)).unwrap();
    assert_eq!(kept.len(), 2);
}

// ============================================================================
// Descriptor Walk Tests
// ============================================================================

#[test]
fn test_bulk_only_device_is_ignored() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::new(0x1234, 0x0001).with_config(ConfigDescriptor {
        number: 1,
        interfaces: vec![InterfaceDescriptor {
            number: 0,
            alt_settings: vec![alt_setting(0, &[(0x81, ATTR_BULK), (0x01, ATTR_BULK)])],
        }],
    }));

    assert!(enumerate_raw(&host, &Filter::default()).unwrap().is_empty());
}

#[test]
fn test_reader_only_device_is_ignored() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::new(0x1234, 0x0001).with_config(ConfigDescriptor {
        number: 1,
        interfaces: vec![InterfaceDescriptor {
            number: 0,
            alt_settings: vec![alt_setting(0, &[(0x81, ATTR_INTERRUPT)])],
        }],
    }));

    assert!(enumerate_raw(&host, &Filter::default()).unwrap().is_empty());
}

#[test]
fn test_each_matching_alt_setting_is_reported() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::new(0x1234, 0x0001).with_config(ConfigDescriptor {
        number: 1,
        interfaces: vec![
            InterfaceDescriptor {
                number: 0,
                alt_settings: vec![
                    alt_setting(0, &[]),
                    alt_setting(1, &[(0x81, ATTR_INTERRUPT), (0x01, ATTR_INTERRUPT)]),
                    alt_setting(2, &[(0x82, ATTR_INTERRUPT), (0x02, ATTR_INTERRUPT)]),
                ],
            },
            InterfaceDescriptor {
                number: 1,
                alt_settings: vec![alt_setting(
                    0,
                    &[(0x83, ATTR_INTERRUPT), (0x03, ATTR_INTERRUPT)],
                )],
            },
        ],
    }));

    let infos = enumerate_raw(&host, &Filter::default()).unwrap();

    let found: Vec<(u8, u8, u8, u8)> = infos
        .iter()
        .map(|info| (info.interface(), info.alt_setting(), info.reader(), info.writer()))
        .collect();
    assert_eq!(
        found,
        vec![(0, 1, 0x81, 0x01), (0, 2, 0x82, 0x02), (1, 0, 0x83, 0x03)]
    );
}

#[test]
fn test_every_configuration_is_walked() {
    let host = MockHost::new();
    host.add_device(
        MockDeviceSpec::new(0x1234, 0x0001)
            .with_config(interrupt_config(1, 0, 0x81, 0x01))
            .with_config(interrupt_config(2, 4, 0x85, 0x05)),
    );

    let infos = enumerate_raw(&host, &Filter::default()).unwrap();

    assert_eq!(infos.len(), 2);
    assert_eq!(infos[1].interface(), 4);
    assert_eq!(infos[1].reader(), 0x85);
}

#[test]
fn test_device_info_metadata() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::raw(0x1209, 0x53c1).with_port(7));

    let infos = enumerate_raw(&host, &Filter::default()).unwrap();

    let info = &infos[0];
    assert_eq!(info.path(), "1209:53c1:7");
    assert_eq!(info.vendor_id(), 0x1209);
    assert_eq!(info.product_id(), 0x53c1);
    assert_eq!(info.interface(), 0);
    assert_eq!(info.bus_number(), 1);
    assert_eq!(info.port_number(), 7);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_init_failure() {
    let host = populated_host();
    host.fail_init(Some(HostErrorKind::NoMem));

    let err = enumerate_raw(&host, &Filter::default()).unwrap_err();

    assert!(matches!(err, EnumerationError::Init(e) if e.kind == HostErrorKind::NoMem));
    assert_eq!(host.stats().live_sessions(), 0);
}

#[test]
fn test_device_list_failure_releases_session() {
    let host = populated_host();
    host.fail_device_list(Some(HostErrorKind::Io));

    let err = enumerate_raw(&host, &Filter::default()).unwrap_err();

    assert!(matches!(err, EnumerationError::DeviceList(_)));
    assert_eq!(host.stats().live_sessions(), 0);
}

#[test]
fn test_device_descriptor_failure_aborts() {
    let host = populated_host();
    host.add_device(
        MockDeviceSpec::raw(0x5555, 0x0001).failing_device_descriptor(HostErrorKind::Pipe),
    );

    let err = enumerate_raw(&host, &Filter::default()).unwrap_err();

    match err {
        EnumerationError::DeviceDescriptor { device, source } => {
            assert_eq!(device, 3);
            assert_eq!(source.kind, HostErrorKind::Pipe);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(host.stats().live_sessions(), 0);
}

#[test]
fn test_config_descriptor_failure_aborts() {
    let host = MockHost::new();
    host.add_device(MockDeviceSpec::raw(0x1234, 0x0001));
    host.add_device(
        MockDeviceSpec::raw(0x1234, 0x0002)
            .with_config(interrupt_config(2, 1, 0x82, 0x02))
            .failing_config_descriptor(1, HostErrorKind::Io),
    );

    let err = enumerate_raw(&host, &Filter::default()).unwrap_err();

    assert!(matches!(
        err,
        EnumerationError::ConfigDescriptor {
            device: 1,
            config: 1,
            ..
        }
    ));
    assert_eq!(host.stats().live_sessions(), 0);
}

#[test]
fn test_failing_device_outside_filter_still_aborts() {
    // The descriptor is needed to evaluate the filter in the first place
    let host = populated_host();
    host.add_device(
        MockDeviceSpec::raw(0x5555, 0x0001).failing_device_descriptor(HostErrorKind::Access),
    );

    assert!(enumerate_raw(&host, &Filter::new(0x1234, 0)).is_err());
}

#[test]
fn test_successful_enumeration_releases_session() {
    let host = populated_host();

    for _ in 0..10 {
        enumerate_raw(&host, &Filter::default()).unwrap();
    }

    assert_eq!(host.stats().live_sessions(), 0);
    assert_eq!(
        host.stats()
            .sessions_opened
            .load(std::sync::atomic::Ordering::SeqCst),
        10
    );
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_threaded_enumerate() {
    let host = Arc::new(populated_host());
    let threads: Vec<_> = (0..8u16)
        .map(|index| {
            let host = host.clone();
            thread::spawn(move || {
                for iteration in 0..512 {
                    let vendor = if index % 2 == 0 { 0x1234 } else { index };
                    enumerate_raw(host.as_ref(), &Filter::new(vendor, 0)).unwrap_or_else(|e| {
                        panic!("thread {index}, iter {iteration}: failed to enumerate: {e}")
                    });
                }
            })
        })
        .collect();

    for handle in threads {
        handle.join().expect("Enumeration thread panicked");
    }
    assert_eq!(host.stats().live_sessions(), 0);
}
