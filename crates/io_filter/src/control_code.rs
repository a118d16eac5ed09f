// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Display, Formatter};

/// The selector code of a device control request.
///
/// A control code packs four fields into 32 bits:
///
/// ```text
///  31              16 15  14 13                2 1      0
/// +------------------+------+-------------------+--------+
/// |   device type    |access|     function      | method |
/// +------------------+------+-------------------+--------+
/// ```
///
/// The filter treats control codes as opaque values: only equality with the observed code
/// matters when classifying. The field accessors exist for logging and for targets that
/// need to interpret the code.
///
/// # Examples
///
/// ```
/// use io_filter::{DeviceType, IoControlCode, RequiredAccess, TransferMethod};
///
/// let code = IoControlCode::new(DeviceType::UNKNOWN, 2048, TransferMethod::Buffered, RequiredAccess::Any);
///
/// assert_eq!(code.as_u32(), 0x0022_2000);
/// assert_eq!(code.function(), 2048);
/// assert!(code.is_vendor_defined());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct IoControlCode(u32);

/// The control code that [`Classifier::default`](crate::Classifier) observes.
///
/// This is a vendor-defined code (function 2048) on an unknown device type, using buffered
/// transfer and requiring no particular access rights.
pub const OBSERVED_CONTROL_CODE: IoControlCode =
    IoControlCode::new(DeviceType::UNKNOWN, 2048, TransferMethod::Buffered, RequiredAccess::Any);

/// Function codes at or above this value are reserved for vendors.
const VENDOR_FUNCTION_BASE: u16 = 0x800;

const FUNCTION_MASK: u32 = 0x0FFF;
const TWO_BIT_MASK: u32 = 0b11;

/// The device type field of a control code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceType(pub u16);

impl DeviceType {
    /// A device type that does not match any predefined category.
    pub const UNKNOWN: Self = Self(0x22);

    /// Disk devices.
    pub const DISK: Self = Self(0x07);
}

/// How the buffers of a control request are passed to the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransferMethod {
    /// Input and output share a system buffer.
    Buffered = 0,
    /// Direct I/O, output buffer used as input.
    InDirect = 1,
    /// Direct I/O, output buffer used as output.
    OutDirect = 2,
    /// No buffering; the target receives the caller's addresses.
    Neither = 3,
}

/// Access rights the caller must hold to issue a control request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequiredAccess {
    /// No particular access.
    Any = 0,
    /// Read access.
    Read = 1,
    /// Write access.
    Write = 2,
    /// Read and write access.
    ReadWrite = 3,
}

impl IoControlCode {
    /// Packs the four fields into a control code.
    ///
    /// Only the low 12 bits of `function` are used.
    #[must_use]
    #[expect(clippy::cast_lossless, reason = "From conversions are not const")]
    pub const fn new(device_type: DeviceType, function: u16, method: TransferMethod, access: RequiredAccess) -> Self {
        Self(
            ((device_type.0 as u32) << 16)
                | ((access as u32) << 14)
                | (((function as u32) & FUNCTION_MASK) << 2)
                | (method as u32),
        )
    }

    /// Wraps a raw control code value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw control code value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the device type field.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "the shift leaves exactly 16 bits")]
    pub const fn device_type(self) -> DeviceType {
        DeviceType((self.0 >> 16) as u16)
    }

    /// Returns the function field.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "the mask leaves 12 bits")]
    pub const fn function(self) -> u16 {
        ((self.0 >> 2) & FUNCTION_MASK) as u16
    }

    /// Returns the transfer method field.
    #[must_use]
    pub const fn method(self) -> TransferMethod {
        match self.0 & TWO_BIT_MASK {
            0 => TransferMethod::Buffered,
            1 => TransferMethod::InDirect,
            2 => TransferMethod::OutDirect,
            _ => TransferMethod::Neither,
        }
    }

    /// Returns the required access field.
    #[must_use]
    pub const fn access(self) -> RequiredAccess {
        match (self.0 >> 14) & TWO_BIT_MASK {
            0 => RequiredAccess::Any,
            1 => RequiredAccess::Read,
            2 => RequiredAccess::Write,
            _ => RequiredAccess::ReadWrite,
        }
    }

    /// Returns `true` if the function code lies in the vendor-defined range.
    #[must_use]
    pub const fn is_vendor_defined(self) -> bool {
        self.function() >= VENDOR_FUNCTION_BASE
    }
}

impl From<u32> for IoControlCode {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for IoControlCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Debug for IoControlCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoControlCode")
            .field("raw", &format_args!("{:#010x}", self.0))
            .field("device_type", &self.device_type())
            .field("function", &self.function())
            .field("method", &self.method())
            .field("access", &self.access())
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_code_value() {
        assert_eq!(OBSERVED_CONTROL_CODE.as_u32(), 0x0022_2000);
    }

    #[test]
    fn fields_decode() {
        let code = IoControlCode::new(DeviceType::DISK, 0x45, TransferMethod::OutDirect, RequiredAccess::ReadWrite);

        assert_eq!(code.device_type(), DeviceType::DISK);
        assert_eq!(code.function(), 0x45);
        assert_eq!(code.method(), TransferMethod::OutDirect);
        assert_eq!(code.access(), RequiredAccess::ReadWrite);
        assert!(!code.is_vendor_defined());
    }

    #[test]
    fn function_is_truncated_to_twelve_bits() {
        let code = IoControlCode::new(DeviceType::UNKNOWN, 0xF801, TransferMethod::Neither, RequiredAccess::Any);

        assert_eq!(code.function(), 0x801);
        assert_eq!(code.device_type(), DeviceType::UNKNOWN);
        assert_eq!(code.method(), TransferMethod::Neither);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(IoControlCode::from_raw(0x1234).to_string(), "0x00001234");
        assert!(format!("{OBSERVED_CONTROL_CODE:?}").contains("function: 2048"));
    }
}
