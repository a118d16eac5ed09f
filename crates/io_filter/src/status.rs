// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Display, Formatter};

/// A 32-bit completion status attached to a request.
///
/// Status values follow the NT convention: the top two bits encode severity, so any value
/// that is non-negative when read as `i32` (success or informational) counts as success,
/// while warnings and errors do not.
///
/// # Examples
///
/// ```
/// use io_filter::Status;
///
/// assert!(Status::SUCCESS.is_success());
/// assert!(!Status::DEVICE_BUSY.is_success());
/// assert_eq!(Status::DEVICE_BUSY.to_string(), "DEVICE_BUSY (0x80000011)");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct Status(u32);

impl Status {
    /// The operation completed successfully.
    pub const SUCCESS: Self = Self(0x0000_0000);

    /// The operation has not completed yet.
    pub const PENDING: Self = Self(0x0000_0103);

    /// The device is busy and cannot accept the operation right now.
    pub const DEVICE_BUSY: Self = Self(0x8000_0011);

    /// The operation failed for an unspecified reason.
    pub const UNSUCCESSFUL: Self = Self(0xC000_0001);

    /// The target does not support the requested operation.
    pub const NOT_SUPPORTED: Self = Self(0xC000_00BB);

    /// Not enough resources were available to accept the operation.
    pub const INSUFFICIENT_RESOURCES: Self = Self(0xC000_009A);

    /// The request is not valid for the target.
    pub const INVALID_DEVICE_REQUEST: Self = Self(0xC000_0010);

    /// The operation was canceled.
    pub const CANCELLED: Self = Self(0xC000_0120);

    /// The target is not in a state in which it can accept the operation.
    pub const INVALID_DEVICE_STATE: Self = Self(0xC000_0184);

    /// Wraps a raw status value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw status value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns `true` for success and informational statuses.
    #[must_use]
    #[expect(clippy::cast_possible_wrap, reason = "severity is encoded in the sign bit")]
    pub const fn is_success(self) -> bool {
        (self.0 as i32) >= 0
    }

    /// Returns the symbolic name of a well-known status.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::SUCCESS => Some("SUCCESS"),
            Self::PENDING => Some("PENDING"),
            Self::DEVICE_BUSY => Some("DEVICE_BUSY"),
            Self::UNSUCCESSFUL => Some("UNSUCCESSFUL"),
            Self::NOT_SUPPORTED => Some("NOT_SUPPORTED"),
            Self::INSUFFICIENT_RESOURCES => Some("INSUFFICIENT_RESOURCES"),
            Self::INVALID_DEVICE_REQUEST => Some("INVALID_DEVICE_REQUEST"),
            Self::CANCELLED => Some("CANCELLED"),
            Self::INVALID_DEVICE_STATE => Some("INVALID_DEVICE_STATE"),
            _ => None,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::PENDING
    }
}

impl From<u32> for Status {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Status> for u32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({:#010x})", self.0),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

impl Debug for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity() {
        assert!(Status::SUCCESS.is_success());
        assert!(Status::PENDING.is_success());
        assert!(!Status::DEVICE_BUSY.is_success());
        assert!(!Status::INSUFFICIENT_RESOURCES.is_success());
        assert!(!Status::from_raw(0xFFFF_FFFF).is_success());
        assert!(Status::from_raw(0x7FFF_FFFF).is_success());
    }

    #[test]
    fn default_is_pending() {
        assert_eq!(Status::default(), Status::PENDING);
    }

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(Status::SUCCESS.to_string(), "SUCCESS (0x00000000)");
        assert_eq!(Status::INVALID_DEVICE_STATE.to_string(), "INVALID_DEVICE_STATE (0xc0000184)");
        assert_eq!(Status::from_raw(0xC000_1234).to_string(), "0xc0001234");
        assert_eq!(format!("{:?}", Status::CANCELLED), "CANCELLED (0xc0000120)");
    }

    #[test]
    fn raw_conversions() {
        let status = Status::from(0xC000_0001);
        assert_eq!(status, Status::UNSUCCESSFUL);
        assert_eq!(u32::from(status), 0xC000_0001);
        assert_eq!(status.as_u32(), 0xC000_0001);
    }
}
