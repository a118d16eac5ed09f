// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{Display, Formatter};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures_channel::oneshot;
use tracing::{Level, event};

use crate::{IoControlCode, RequestError, Status, StatusError};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`Request`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the numeric value of the identity.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The category of operation a request performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Reads data from the device.
    Read,
    /// Writes data to the device.
    Write,
    /// Executes a device control operation identified by a control code.
    DeviceControl,
}

impl RequestKind {
    /// A short lowercase name suitable for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::DeviceControl => "device_control",
        }
    }
}

/// The operation-specific parameters of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parameters {
    /// A read of `length` bytes.
    Read {
        /// Number of bytes to read.
        length: usize,
    },
    /// A write of `length` bytes.
    Write {
        /// Number of bytes to write.
        length: usize,
    },
    /// A device control operation.
    DeviceControl {
        /// Length of the caller's output buffer.
        output_buffer_length: usize,
        /// Length of the caller's input buffer.
        input_buffer_length: usize,
        /// The operation being requested.
        io_control_code: IoControlCode,
    },
}

impl Parameters {
    /// Returns the kind of operation these parameters describe.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Read { .. } => RequestKind::Read,
            Self::Write { .. } => RequestKind::Write,
            Self::DeviceControl { .. } => RequestKind::DeviceControl,
        }
    }
}

/// The mutable status block of a request: a status plus an operation-specific quantity
/// (typically the number of bytes transferred).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoStatus {
    /// The status of the operation.
    pub status: Status,
    /// Operation-specific result quantity.
    pub information: usize,
}

/// One in-flight I/O operation.
///
/// A request has exactly one owner at any time. Every API in this crate that accepts a
/// request takes it by value, and [`finalize`](Self::finalize) consumes it, so the
/// single-owner rule and the at-most-once finalization rule are enforced by the compiler.
///
/// A request that is dropped without being finalized is considered leaked: an error event
/// is logged and the issuer's [`PendingRequest`] resolves to
/// [`RequestError::Abandoned`].
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use io_filter::{Request, Status};
///
/// let (mut request, pending) = Request::read(4096);
/// request.set_information(4096);
/// request.finalize(Status::SUCCESS);
///
/// let completion = block_on(pending).unwrap();
/// assert_eq!(completion.status(), Status::SUCCESS);
/// assert_eq!(completion.information(), 4096);
/// ```
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    parameters: Parameters,
    io_status: IoStatus,
    // Taken exactly once, either by `finalize` or by `Drop`.
    completion_tx: Option<oneshot::Sender<Completion>>,
}

impl Request {
    /// Creates a request together with the issuer-side handle that observes its completion.
    #[must_use]
    pub fn new(parameters: Parameters) -> (Self, PendingRequest) {
        let id = RequestId::next();
        let (completion_tx, completion_rx) = oneshot::channel();

        let request = Self {
            id,
            parameters,
            io_status: IoStatus::default(),
            completion_tx: Some(completion_tx),
        };

        (request, PendingRequest { id, completion_rx })
    }

    /// Creates a read request.
    #[must_use]
    pub fn read(length: usize) -> (Self, PendingRequest) {
        Self::new(Parameters::Read { length })
    }

    /// Creates a write request.
    #[must_use]
    pub fn write(length: usize) -> (Self, PendingRequest) {
        Self::new(Parameters::Write { length })
    }

    /// Creates a device control request.
    #[must_use]
    pub fn device_control(
        io_control_code: IoControlCode,
        output_buffer_length: usize,
        input_buffer_length: usize,
    ) -> (Self, PendingRequest) {
        Self::new(Parameters::DeviceControl {
            output_buffer_length,
            input_buffer_length,
            io_control_code,
        })
    }

    /// The identity of this request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The kind of operation this request performs.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.parameters.kind()
    }

    /// The operation-specific parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The control code, for device control requests.
    #[must_use]
    pub const fn io_control_code(&self) -> Option<IoControlCode> {
        match self.parameters {
            Parameters::DeviceControl { io_control_code, .. } => Some(io_control_code),
            Parameters::Read { .. } | Parameters::Write { .. } => None,
        }
    }

    /// The current status block.
    #[must_use]
    pub const fn io_status(&self) -> IoStatus {
        self.io_status
    }

    /// The status currently recorded on the request.
    ///
    /// After a target rejects a submission, this holds the reason for the rejection.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.io_status.status
    }

    /// Records a status on the request without finalizing it.
    pub const fn set_status(&mut self, status: Status) {
        self.io_status.status = status;
    }

    /// The operation-specific result quantity currently recorded on the request.
    #[must_use]
    pub const fn information(&self) -> usize {
        self.io_status.information
    }

    /// Records the operation-specific result quantity.
    pub const fn set_information(&mut self, information: usize) {
        self.io_status.information = information;
    }

    /// Prepares the request to be sent on to the next target as the same kind of operation.
    ///
    /// The parameters are carried forward unchanged; the status block is reset so the next
    /// target starts from a clean slate.
    pub fn format_using_current_type(&mut self) {
        self.io_status = IoStatus::default();
    }

    /// Marks the request as complete with `status` and hands the result to the issuer.
    ///
    /// This is the single terminal action of a request. The information currently recorded
    /// on the request is delivered alongside the status.
    pub fn finalize(mut self, status: Status) {
        self.io_status.status = status;

        let completion = Completion {
            id: self.id,
            status,
            information: self.io_status.information,
        };

        event!(
            name: "io_filter.finalize",
            Level::TRACE,
            request.id = self.id.0,
            status = %status,
            information = completion.information,
        );

        if let Some(completion_tx) = self.completion_tx.take() {
            // The issuer may have stopped caring about the outcome, which is fine.
            _ = completion_tx.send(completion);
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if self.completion_tx.is_some() {
            event!(
                name: "io_filter.abandoned",
                Level::ERROR,
                request.id = self.id.0,
                request.kind = self.kind().as_str(),
                "request dropped without being finalized"
            );
        }
    }
}

/// The terminal result of a request, as observed by its issuer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    id: RequestId,
    status: Status,
    information: usize,
}

impl Completion {
    /// The identity of the completed request.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// The status the request was finalized with.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// The operation-specific result quantity.
    #[must_use]
    pub const fn information(&self) -> usize {
        self.information
    }

    /// Converts the completion into a result, keyed on the status severity.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] if the request was finalized with a status that does not
    /// indicate success.
    pub const fn into_result(self) -> Result<usize, StatusError> {
        if self.status.is_success() {
            Ok(self.information)
        } else {
            Err(StatusError::new(self.status))
        }
    }
}

/// The issuer's view of a request that has been handed off for processing.
///
/// Resolves once the request is finalized, or with [`RequestError::Abandoned`] if the
/// request is dropped without being finalized.
#[derive(Debug)]
#[must_use = "dropping the pending request discards the completion"]
pub struct PendingRequest {
    id: RequestId,
    completion_rx: oneshot::Receiver<Completion>,
}

impl PendingRequest {
    /// The identity of the request this handle observes.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.id
    }

    /// Checks for the outcome without waiting.
    ///
    /// Returns `None` while the request is still in flight. Once an outcome has been
    /// returned, later calls report [`RequestError::Abandoned`].
    pub fn try_completion(&mut self) -> Option<Result<Completion, RequestError>> {
        match self.completion_rx.try_recv() {
            Ok(Some(completion)) => Some(Ok(completion)),
            Ok(None) => None,
            Err(_canceled) => Some(Err(RequestError::Abandoned { id: self.id })),
        }
    }
}

impl Future for PendingRequest {
    type Output = Result<Completion, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let id = self.id;
        Pin::new(&mut self.completion_rx)
            .poll(cx)
            .map(|result| result.map_err(|_canceled| RequestError::Abandoned { id }))
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::OBSERVED_CONTROL_CODE;
    use crate::testing::LogCapture;

    #[test]
    fn thread_safe_types() {
        assert_impl_all!(Request: Send, Sync, std::fmt::Debug);
        assert_impl_all!(PendingRequest: Send, Sync, std::fmt::Debug);
        assert_impl_all!(Completion: Send, Sync, Copy);
    }

    #[test]
    fn ids_are_unique() {
        let (first, _first_pending) = Request::read(1);
        let (second, _second_pending) = Request::read(1);

        assert_ne!(first.id(), second.id());

        first.finalize(Status::SUCCESS);
        second.finalize(Status::SUCCESS);
    }

    #[test]
    fn new_request_is_pending() {
        let (request, mut pending) = Request::write(512);

        assert_eq!(request.kind(), RequestKind::Write);
        assert_eq!(request.parameters(), &Parameters::Write { length: 512 });
        assert_eq!(request.status(), Status::PENDING);
        assert_eq!(request.information(), 0);
        assert_eq!(request.io_control_code(), None);
        assert_eq!(pending.id(), request.id());
        assert!(pending.try_completion().is_none());

        request.finalize(Status::SUCCESS);
    }

    #[test]
    fn finalize_delivers_status_and_information() {
        let (mut request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 16, 8);
        let id = request.id();
        request.set_information(16);
        request.finalize(Status::SUCCESS);

        let completion = block_on(pending).unwrap();
        assert_eq!(completion.id(), id);
        assert_eq!(completion.status(), Status::SUCCESS);
        assert_eq!(completion.information(), 16);
        assert_eq!(completion.into_result(), Ok(16));
    }

    #[test]
    fn failure_status_into_result() {
        let (request, pending) = Request::read(1);
        request.finalize(Status::DEVICE_BUSY);

        let error = block_on(pending).unwrap().into_result().unwrap_err();
        assert_eq!(error.status(), Status::DEVICE_BUSY);
    }

    #[test]
    fn finalize_after_issuer_gone_is_silent() {
        let (request, pending) = Request::read(1);
        drop(pending);

        request.finalize(Status::SUCCESS);
    }

    #[test]
    fn format_resets_status_block_only() {
        let (mut request, _pending) = Request::device_control(OBSERVED_CONTROL_CODE, 32, 4);
        request.set_status(Status::DEVICE_BUSY);
        request.set_information(99);
        let parameters = *request.parameters();

        request.format_using_current_type();

        assert_eq!(request.io_status(), IoStatus::default());
        assert_eq!(request.parameters(), &parameters);
        assert_eq!(request.io_control_code(), Some(OBSERVED_CONTROL_CODE));

        request.finalize(Status::SUCCESS);
    }

    #[test]
    fn dropped_request_is_abandoned() {
        use tracing_subscriber::util::SubscriberInitExt;

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let (request, mut pending) = Request::read(8);
        let id = request.id();
        drop(request);

        assert_eq!(pending.try_completion(), Some(Err(RequestError::Abandoned { id })));
        log_capture.assert_contains("ERROR");
        log_capture.assert_contains("request dropped without being finalized");
        log_capture.assert_contains(&format!("request.id={}", id.as_u64()));
    }

    #[test]
    fn abandoned_future_resolves() {
        let (request, pending) = Request::write(8);
        let id = request.id();
        drop(request);

        assert_eq!(block_on(pending), Err(RequestError::Abandoned { id }));
    }
}
