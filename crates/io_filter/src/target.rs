// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::{CompletionObserver, Request, Status};

/// The result of offering a request to an [`IoTarget`].
#[derive(Debug)]
#[must_use = "a rejected request must be finalized by the submitter"]
pub enum SubmitOutcome {
    /// The target accepted the request and now owns it.
    ///
    /// If an observer was attached, the target will invoke it exactly once when it is done.
    /// Otherwise the target finalizes the request itself.
    Transferred,

    /// The target could not accept the request and hands it back.
    ///
    /// `status` is the failure the submitter finalizes the request with, regardless of what
    /// the request's own status block holds. The observer, if any, was dropped without being
    /// invoked.
    Rejected {
        /// The request, returned to the submitter.
        request: Request,
        /// Why the target declined.
        status: Status,
    },
}

/// The downstream entity that actually executes forwarded requests.
///
/// Implementations may execute requests on any thread and in any order. The contract is:
///
/// - Return [`SubmitOutcome::Transferred`] to take ownership. From then on the target must
///   eventually either invoke the observer (if one was attached) or finalize the request.
/// - Return [`SubmitOutcome::Rejected`] to decline, handing the request back together with
///   the failure status it should be finalized with.
///
/// # Examples
///
/// ```
/// use io_filter::{CompletionObserver, CompletionParams, IoTarget, Request, Status, SubmitOutcome};
///
/// struct CompleteInline;
///
/// impl IoTarget for CompleteInline {
///     fn submit(&self, mut request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
///         request.set_information(0);
///         match observer {
///             Some(observer) => observer.complete(request, CompletionParams::new(Status::SUCCESS, 0)),
///             None => request.finalize(Status::SUCCESS),
///         }
///         SubmitOutcome::Transferred
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait IoTarget: Send + Sync {
    /// Offers `request` to the target, optionally with an observer to invoke on completion.
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome;
}

impl<T> IoTarget for Box<T>
where
    T: IoTarget + ?Sized,
{
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
        (**self).submit(request, observer)
    }
}

impl<T> IoTarget for Arc<T>
where
    T: IoTarget + ?Sized,
{
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
        (**self).submit(request, observer)
    }
}

impl<T> IoTarget for &T
where
    T: IoTarget + ?Sized,
{
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
        (**self).submit(request, observer)
    }
}

/// An [`IoTarget`] built from a function or closure.
///
/// Handy for adapting an existing submission routine and for tests.
///
/// # Examples
///
/// ```
/// use io_filter::{Request, Status, SubmitOutcome, TargetFn};
///
/// // A target that is never ready.
/// let stopped = TargetFn::new(|request: Request, _observer| SubmitOutcome::Rejected {
///     request,
///     status: Status::INVALID_DEVICE_STATE,
/// });
/// # let _ = stopped;
/// ```
#[derive(Clone)]
pub struct TargetFn<F>(F);

impl<F> TargetFn<F>
where
    F: Fn(Request, Option<CompletionObserver>) -> SubmitOutcome + Send + Sync,
{
    /// Wraps `f` as a target.
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> IoTarget for TargetFn<F>
where
    F: Fn(Request, Option<CompletionObserver>) -> SubmitOutcome + Send + Sync,
{
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
        (self.0)(request, observer)
    }
}

impl<F> Debug for TargetFn<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetFn").finish_non_exhaustive()
    }
}
