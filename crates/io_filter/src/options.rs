// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{IoControlCode, OBSERVED_CONTROL_CODE};

pub(crate) const DEFAULT_DEVICE_NAME: &str = "default";

/// Settings of a filter, as they would be loaded from configuration.
///
/// With the `serde` feature enabled this type can be deserialized; fields that are missing
/// fall back to their defaults.
///
/// # Examples
///
/// ```
/// use io_filter::{Filter, FilterOptions, IoControlCode, Request, Status, SubmitOutcome, TargetFn};
///
/// let options = FilterOptions::default()
///     .name("disk0")
///     .observed_control_code(IoControlCode::from_raw(0x0007_c088));
///
/// let target = TargetFn::new(|request: Request, _observer| SubmitOutcome::Rejected {
///     request,
///     status: Status::DEVICE_BUSY,
/// });
/// let filter = Filter::attach(target, &options);
///
/// assert_eq!(filter.context().name(), "disk0");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct FilterOptions {
    // Name of the filtered device, used in log events.
    pub(crate) name: String,
    pub(crate) observed_control_code: IoControlCode,
}

impl FilterOptions {
    /// Sets the device name used in log events. Prefer `snake_case`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the device control code whose completion the filter observes.
    #[must_use]
    pub const fn observed_control_code(mut self, code: IoControlCode) -> Self {
        self.observed_control_code = code;
        self
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_DEVICE_NAME.to_string(),
            observed_control_code: OBSERVED_CONTROL_CODE,
        }
    }
}
