// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

use crate::{IoStatus, Request, Status};

/// The result a target reports when it finishes a request that carried an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionParams {
    status: Status,
    information: usize,
}

impl CompletionParams {
    /// Creates completion parameters from a status and an operation-specific quantity.
    #[must_use]
    pub const fn new(status: Status, information: usize) -> Self {
        Self { status, information }
    }

    /// The final status of the operation.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The operation-specific result quantity, typically the number of bytes transferred.
    #[must_use]
    pub const fn information(&self) -> usize {
        self.information
    }
}

impl From<IoStatus> for CompletionParams {
    fn from(io_status: IoStatus) -> Self {
        Self::new(io_status.status, io_status.information)
    }
}

/// A callback attached to a submitted request, invoked by the target when it finishes.
///
/// [`complete`](Self::complete) consumes both the observer and the request, so a target
/// can invoke an observer at most once, and only while it owns the request. A target that
/// rejects a submission hands the request back instead and simply drops the observer.
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use io_filter::{CompletionObserver, CompletionParams, Request, Status};
///
/// let observer = CompletionObserver::new(|request: Request, params: CompletionParams| {
///     request.finalize(params.status());
/// });
///
/// let (request, pending) = Request::read(16);
/// observer.complete(request, CompletionParams::new(Status::SUCCESS, 16));
///
/// assert_eq!(block_on(pending).unwrap().status(), Status::SUCCESS);
/// ```
pub struct CompletionObserver {
    routine: Box<dyn FnOnce(Request, CompletionParams) + Send>,
}

impl CompletionObserver {
    /// Wraps a completion routine.
    ///
    /// The routine becomes the owner of the request and is responsible for finalizing it.
    pub fn new<F>(routine: F) -> Self
    where
        F: FnOnce(Request, CompletionParams) + Send + 'static,
    {
        Self { routine: Box::new(routine) }
    }

    /// Hands the finished request to the observer.
    pub fn complete(self, request: Request, params: CompletionParams) {
        (self.routine)(request, params);
    }
}

impl Debug for CompletionObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionObserver").finish_non_exhaustive()
    }
}
