//! Error types
//!
//! Host stack failures are translated into [`HostError`] as soon as they
//! cross the binding boundary. Everything above the binding only ever sees
//! the typed taxonomy below, never a raw platform code.

use std::fmt;
use thiserror::Error;

/// Classification of a host stack failure
///
/// Mirrors the libusb error list; the numeric values are the libusb codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostErrorKind {
    Io,
    InvalidParam,
    Access,
    NoDevice,
    NotFound,
    Busy,
    Timeout,
    Overflow,
    Pipe,
    Interrupted,
    NoMem,
    NotSupported,
    BadDescriptor,
    Other,
}

impl HostErrorKind {
    /// Classify a raw libusb return code, as reported by bindings without
    /// their own error type
    ///
    /// Unknown negative codes land in [`HostErrorKind::Other`].
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Io,
            -2 => Self::InvalidParam,
            -3 => Self::Access,
            -4 => Self::NoDevice,
            -5 => Self::NotFound,
            -6 => Self::Busy,
            -7 => Self::Timeout,
            -8 => Self::Overflow,
            -9 => Self::Pipe,
            -10 => Self::Interrupted,
            -11 => Self::NoMem,
            -12 => Self::NotSupported,
            _ => Self::Other,
        }
    }

    /// The libusb code for this kind
    ///
    /// `BadDescriptor` has no libusb counterpart and reports the generic
    /// "other" code.
    pub fn code(self) -> i32 {
        match self {
            Self::Io => -1,
            Self::InvalidParam => -2,
            Self::Access => -3,
            Self::NoDevice => -4,
            Self::NotFound => -5,
            Self::Busy => -6,
            Self::Timeout => -7,
            Self::Overflow => -8,
            Self::Pipe => -9,
            Self::Interrupted => -10,
            Self::NoMem => -11,
            Self::NotSupported => -12,
            Self::BadDescriptor | Self::Other => -99,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Io => "input/output error",
            Self::InvalidParam => "invalid parameter",
            Self::Access => "access denied",
            Self::NoDevice => "no such device",
            Self::NotFound => "entity not found",
            Self::Busy => "resource busy",
            Self::Timeout => "operation timed out",
            Self::Overflow => "overflow",
            Self::Pipe => "pipe error",
            Self::Interrupted => "system call interrupted",
            Self::NoMem => "insufficient memory",
            Self::NotSupported => "operation not supported",
            Self::BadDescriptor => "malformed descriptor",
            Self::Other => "other error",
        }
    }
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A host stack failure tagged with the operation that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{op} failed: {kind} (code {code})")]
pub struct HostError {
    pub op: &'static str,
    pub kind: HostErrorKind,
    pub code: i32,
}

impl HostError {
    pub fn new(op: &'static str, kind: HostErrorKind) -> Self {
        Self {
            op,
            kind,
            code: kind.code(),
        }
    }

    /// Translate a raw libusb return code, keeping the original value
    ///
    /// For bindings that surface bare libusb codes; the rusb binding goes
    /// through [`HostError::from_rusb`] instead.
    pub fn from_code(op: &'static str, code: i32) -> Self {
        Self {
            op,
            kind: HostErrorKind::from_code(code),
            code,
        }
    }

    /// Translate an error reported by the rusb binding
    pub fn from_rusb(op: &'static str, err: rusb::Error) -> Self {
        let kind = match err {
            rusb::Error::Io => HostErrorKind::Io,
            rusb::Error::InvalidParam => HostErrorKind::InvalidParam,
            rusb::Error::Access => HostErrorKind::Access,
            rusb::Error::NoDevice => HostErrorKind::NoDevice,
            rusb::Error::NotFound => HostErrorKind::NotFound,
            rusb::Error::Busy => HostErrorKind::Busy,
            rusb::Error::Timeout => HostErrorKind::Timeout,
            rusb::Error::Overflow => HostErrorKind::Overflow,
            rusb::Error::Pipe => HostErrorKind::Pipe,
            rusb::Error::Interrupted => HostErrorKind::Interrupted,
            rusb::Error::NoMem => HostErrorKind::NoMem,
            rusb::Error::NotSupported => HostErrorKind::NotSupported,
            rusb::Error::BadDescriptor => HostErrorKind::BadDescriptor,
            _ => HostErrorKind::Other,
        };
        Self::new(op, kind)
    }
}

/// Failures of a single enumeration pass
///
/// Enumeration is all-or-nothing: any of these discards the partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    /// Host stack session could not be created
    #[error("failed to initialize USB host session: {0}")]
    Init(#[source] HostError),

    #[error("failed to list USB devices: {0}")]
    DeviceList(#[source] HostError),

    #[error("failed to get device {device} descriptor: {source}")]
    DeviceDescriptor { device: usize, source: HostError },

    #[error("failed to get device {device} config {config}: {source}")]
    ConfigDescriptor {
        device: usize,
        config: u8,
        source: HostError,
    },
}

/// Errors surfaced by the public API
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Enumeration(#[from] EnumerationError),

    #[error("failed to open device {path}: {source}")]
    Open { path: String, source: HostError },

    /// Interrupt transfer failed outright; short transfers are not errors
    #[error("interrupt {direction} transfer on endpoint {endpoint:#04x} failed: {source}")]
    Transfer {
        direction: TransferDirection,
        endpoint: u8,
        source: HostError,
    },

    #[error("refusing interrupt {0} transfer with an empty buffer")]
    EmptyBuffer(TransferDirection),

    #[error("device is closed")]
    Closed,

    /// Reported by a pluggable HID enumerator
    #[error("HID error: {0}")]
    Hid(String),
}

/// Direction of an interrupt transfer, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Read,
    Write,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_known() {
        assert_eq!(HostErrorKind::from_code(-1), HostErrorKind::Io);
        assert_eq!(HostErrorKind::from_code(-3), HostErrorKind::Access);
        assert_eq!(HostErrorKind::from_code(-4), HostErrorKind::NoDevice);
        assert_eq!(HostErrorKind::from_code(-7), HostErrorKind::Timeout);
        assert_eq!(HostErrorKind::from_code(-12), HostErrorKind::NotSupported);
    }

    #[test]
    fn test_from_code_unknown_is_other() {
        assert_eq!(HostErrorKind::from_code(-99), HostErrorKind::Other);
        assert_eq!(HostErrorKind::from_code(-42), HostErrorKind::Other);
    }

    #[test]
    fn test_code_keeps_original_value() {
        let err = HostError::from_code("libusb_open", -42);
        assert_eq!(err.kind, HostErrorKind::Other);
        assert_eq!(err.code, -42);
        assert_eq!(err.op, "libusb_open");
    }

    #[test]
    fn test_map_rusb_error() {
        assert_eq!(
            HostError::from_rusb("open", rusb::Error::Access).kind,
            HostErrorKind::Access
        );
        assert_eq!(
            HostError::from_rusb("read", rusb::Error::Pipe).kind,
            HostErrorKind::Pipe
        );
        let err = HostError::from_rusb("config", rusb::Error::BadDescriptor);
        assert_eq!(err.kind, HostErrorKind::BadDescriptor);
        assert_eq!(err.code, -99);
    }

    #[test]
    fn test_error_display() {
        let err = EnumerationError::ConfigDescriptor {
            device: 3,
            config: 1,
            source: HostError::new("get_config_descriptor", HostErrorKind::Io),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("device 3 config 1"));
        assert!(msg.contains("input/output error"));

        let err = Error::Transfer {
            direction: TransferDirection::Write,
            endpoint: 0x02,
            source: HostError::new("write_interrupt", HostErrorKind::Timeout),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("write"));
        assert!(msg.contains("0x02"));
    }
}
