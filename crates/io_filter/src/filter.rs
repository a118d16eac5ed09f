// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use tracing::{Level, event};

use crate::forward::{send_and_forget, send_with_callback};
use crate::{Classifier, DeviceContext, FilterOptions, ForwardingMode, IoControlCode, IoTarget, Parameters, Request};

/// Entry points the host invokes for each request delivered to an attached device.
///
/// The host may call these concurrently from any number of threads. Each call takes
/// ownership of the request; implementations must leave it either finalized or owned by
/// someone who will finalize it.
pub trait IoQueueCallbacks: Send + Sync {
    /// Handles a read request of `length` bytes.
    fn on_read(&self, request: Request, length: usize);

    /// Handles a write request of `length` bytes.
    fn on_write(&self, request: Request, length: usize);

    /// Handles a device control request.
    fn on_device_control(
        &self,
        request: Request,
        output_buffer_length: usize,
        input_buffer_length: usize,
        io_control_code: IoControlCode,
    );

    /// Routes `request` to the entry point matching its parameters.
    ///
    /// This is what the host's default queue does for every request it receives.
    fn dispatch(&self, request: Request) {
        match *request.parameters() {
            Parameters::Read { length } => self.on_read(request, length),
            Parameters::Write { length } => self.on_write(request, length),
            Parameters::DeviceControl {
                output_buffer_length,
                input_buffer_length,
                io_control_code,
            } => self.on_device_control(request, output_buffer_length, input_buffer_length, io_control_code),
        }
    }
}

/// A passthrough filter attached in front of an [`IoTarget`].
///
/// Reads and writes are forwarded untouched. Device control requests are classified: the
/// observed control code is forwarded with a completion observer, every other code is
/// forwarded untouched. The filter keeps no state across requests.
///
/// Attach a filter with [`Filter::attach`] or through its [`Layer`](tower_layer::Layer)
/// returned by [`Filter::layer`].
///
/// # Examples
///
/// ```
/// use futures::executor::block_on;
/// use io_filter::{Filter, FilterOptions, IoQueueCallbacks, Request, Status, SubmitOutcome, TargetFn};
///
/// let target = TargetFn::new(|mut request: Request, _observer| {
///     request.set_information(512);
///     request.finalize(Status::SUCCESS);
///     SubmitOutcome::Transferred
/// });
///
/// let filter = Filter::attach(target, &FilterOptions::default().name("disk0"));
///
/// let (request, pending) = Request::read(512);
/// filter.dispatch(request);
///
/// assert_eq!(block_on(pending).unwrap().information(), 512);
/// ```
#[derive(Debug)]
pub struct Filter<T> {
    context: Arc<DeviceContext<T>>,
    classifier: Classifier,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            classifier: self.classifier,
        }
    }
}

impl Filter<()> {
    /// Creates a [`FilterLayer`] with default options.
    ///
    /// # Examples
    ///
    /// ```
    /// use io_filter::{Filter, IoControlCode, Request, Status, SubmitOutcome, TargetFn};
    /// use tower_layer::Layer;
    ///
    /// let layer = Filter::layer().name("disk0").observed_control_code(IoControlCode::from_raw(0x0007_c088));
    ///
    /// let filter = layer.layer(TargetFn::new(|request: Request, _observer| SubmitOutcome::Rejected {
    ///     request,
    ///     status: Status::DEVICE_BUSY,
    /// }));
    /// assert_eq!(filter.context().name(), "disk0");
    /// ```
    #[must_use]
    pub fn layer() -> FilterLayer {
        FilterLayer::default()
    }
}

impl<T> Filter<T>
where
    T: IoTarget + 'static,
{
    /// Attaches a filter in front of `target`.
    ///
    /// This is the explicit initialization step: it builds the device context and returns
    /// a ready-to-use filter. Call it once per device.
    pub fn attach(target: T, options: &FilterOptions) -> Self {
        let context = DeviceContext::new(options.name.clone(), target);

        event!(
            name: "io_filter.attach",
            Level::DEBUG,
            device.name = context.name(),
            observed_control_code = %options.observed_control_code,
            "filter attached",
        );

        Self {
            context: Arc::new(context),
            classifier: Classifier::new(options.observed_control_code),
        }
    }

    /// The per-device context shared with in-flight observers.
    #[must_use]
    pub const fn context(&self) -> &Arc<DeviceContext<T>> {
        &self.context
    }

    /// The classifier applied to device control requests.
    #[must_use]
    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn forward(&self, request: Request, mode: ForwardingMode) {
        event!(
            name: "io_filter.dispatch",
            Level::TRACE,
            device.name = self.context.name(),
            request.id = request.id().as_u64(),
            request.kind = request.kind().as_str(),
            mode = ?mode
        );

        match mode {
            ForwardingMode::FireAndForget => send_and_forget(request, &self.context),
            ForwardingMode::Observed => send_with_callback(request, &self.context),
        }
    }
}

impl<T> IoQueueCallbacks for Filter<T>
where
    T: IoTarget + 'static,
{
    fn on_read(&self, request: Request, _length: usize) {
        self.forward(request, ForwardingMode::FireAndForget);
    }

    fn on_write(&self, request: Request, _length: usize) {
        self.forward(request, ForwardingMode::FireAndForget);
    }

    fn on_device_control(
        &self,
        request: Request,
        _output_buffer_length: usize,
        _input_buffer_length: usize,
        io_control_code: IoControlCode,
    ) {
        let mode = self.classifier.classify(io_control_code);

        if mode == ForwardingMode::Observed {
            event!(
                name: "io_filter.observed",
                Level::DEBUG,
                device.name = self.context.name(),
                request.id = request.id().as_u64(),
                io_control_code = %io_control_code,
                "observed control code found",
            );
        }

        self.forward(request, mode);
    }
}

/// Builds a [`Filter`] in front of a target.
///
/// Created with [`Filter::layer`] or from [`FilterOptions`]. Implements
/// [`Layer`](tower_layer::Layer) over any [`IoTarget`]; the resulting [`Filter`] is the
/// outermost piece and is driven through [`IoQueueCallbacks`], not wrapped again.
#[derive(Clone, Debug, Default)]
pub struct FilterLayer {
    options: FilterOptions,
}

impl FilterLayer {
    /// Sets the device name used in log events.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options = self.options.name(name);
        self
    }

    /// Sets the device control code whose completion the filter observes.
    #[must_use]
    pub fn observed_control_code(mut self, code: IoControlCode) -> Self {
        self.options = self.options.observed_control_code(code);
        self
    }

    /// The options every filter built by this layer is attached with.
    #[must_use]
    pub const fn options(&self) -> &FilterOptions {
        &self.options
    }
}

impl From<FilterOptions> for FilterLayer {
    fn from(options: FilterOptions) -> Self {
        Self { options }
    }
}

impl<T> tower_layer::Layer<T> for FilterLayer
where
    T: IoTarget + 'static,
{
    type Service = Filter<T>;

    fn layer(&self, target: T) -> Self::Service {
        Filter::attach(target, &self.options)
    }
}
