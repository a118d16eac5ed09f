// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

/// Per-device state of an attached filter.
///
/// Built once when the filter is attached and never modified afterwards, so it can be read
/// from any number of threads without synchronization. The filter shares it through an
/// `Arc`, which keeps it alive for as long as any observed request is still in flight.
#[derive(Debug)]
pub struct DeviceContext<T> {
    name: Cow<'static, str>,
    target: T,
}

impl<T> DeviceContext<T> {
    /// Creates the context for a device whose requests go to `target`.
    pub fn new(name: impl Into<Cow<'static, str>>, target: T) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// The device name used in log events.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target forwarded requests are submitted to.
    #[must_use]
    pub const fn target(&self) -> &T {
        &self.target
    }
}
