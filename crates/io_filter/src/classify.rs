// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::{IoControlCode, OBSERVED_CONTROL_CODE};

/// How a request is forwarded to the target.
///
/// Chosen per request and never stored beyond the dispatch call that chose it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForwardingMode {
    /// Forward the request and relinquish all interest in it.
    FireAndForget,
    /// Forward the request with a completion observer that finalizes it.
    Observed,
}

/// Maps device control codes to a [`ForwardingMode`].
///
/// Exactly one code is observed; every other code, including codes this filter has never
/// heard of, is forwarded untouched. Unknown operations are never rejected or altered, which
/// keeps the filter composable with operations defined after it was written.
///
/// # Examples
///
/// ```
/// use io_filter::{Classifier, ForwardingMode, IoControlCode, OBSERVED_CONTROL_CODE};
///
/// let classifier = Classifier::default();
///
/// assert_eq!(classifier.classify(OBSERVED_CONTROL_CODE), ForwardingMode::Observed);
/// assert_eq!(classifier.classify(IoControlCode::from_raw(0x1234)), ForwardingMode::FireAndForget);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classifier {
    observed: IoControlCode,
}

impl Classifier {
    /// Creates a classifier that observes `observed` and forwards everything else.
    #[must_use]
    pub const fn new(observed: IoControlCode) -> Self {
        Self { observed }
    }

    /// The one control code this classifier observes.
    #[must_use]
    pub const fn observed(&self) -> IoControlCode {
        self.observed
    }

    /// Picks the forwarding mode for a device control request.
    #[must_use]
    pub fn classify(&self, io_control_code: IoControlCode) -> ForwardingMode {
        if io_control_code == self.observed {
            ForwardingMode::Observed
        } else {
            ForwardingMode::FireAndForget
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(OBSERVED_CONTROL_CODE)
    }
}

/// Classifies `io_control_code` against [`OBSERVED_CONTROL_CODE`].
#[must_use]
pub fn classify(io_control_code: IoControlCode) -> ForwardingMode {
    Classifier::default().classify(io_control_code)
}
