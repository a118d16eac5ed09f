// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::{RequestId, Status};

/// The issuer-side outcome of a request that never reached a terminal state.
///
/// # Thread safety
///
/// This type is thread-safe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RequestError {
    /// The request was dropped by whichever party owned it without being finalized.
    ///
    /// This always indicates a bug in the owner (typically a target that accepted a request
    /// and then lost it).
    #[error("request {id} was dropped without being finalized")]
    Abandoned {
        /// The identity of the lost request.
        id: RequestId,
    },
}

/// A request was finalized with a status that does not indicate success.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("request completed with status {status}")]
pub struct StatusError {
    status: Status,
}

impl StatusError {
    pub(crate) const fn new(status: Status) -> Self {
        Self { status }
    }

    /// The failure status the request was finalized with.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}
