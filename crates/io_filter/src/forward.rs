// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The two ways a request can be handed to the target.
//!
//! Both functions take the request by value and return nothing: once they return, the
//! caller has permanently given the request up, whether the target accepted it or not.
//! Sending is the equivalent of completing from the caller's point of view.

use std::sync::Arc;

use tracing::{Level, event};

use crate::{CompletionObserver, CompletionParams, DeviceContext, IoTarget, Request, Status, SubmitOutcome};

/// Forwards `request` to the device's target without keeping any interest in its outcome.
///
/// If the target accepts the request it is solely responsible for finalizing it. If the
/// target rejects it, the request is finalized here with the status the target rejected it with.
pub fn send_and_forget<T>(request: Request, context: &DeviceContext<T>)
where
    T: IoTarget,
{
    let id = request.id();

    match context.target().submit(request, None) {
        SubmitOutcome::Transferred => {
            event!(
                name: "io_filter.forwarded",
                Level::TRACE,
                device.name = context.name(),
                request.id = id.as_u64(),
                mode = "fire_and_forget"
            );
        }
        SubmitOutcome::Rejected { request, status } => finalize_rejected(request, status, context),
    }
}

/// Forwards `request` to the device's target with a completion observer attached.
///
/// The observer holds a reference to `context` and finalizes the request with the status
/// the target reports. If the target rejects the request, the observer is never invoked and
/// the request is finalized here with the status the target rejected it with.
pub fn send_with_callback<T>(mut request: Request, context: &Arc<DeviceContext<T>>)
where
    T: IoTarget + 'static,
{
    let id = request.id();

    request.format_using_current_type();

    let observer = {
        let context = Arc::clone(context);
        CompletionObserver::new(move |request, params| on_completion(request, context.target(), params, &context))
    };

    match context.target().submit(request, Some(observer)) {
        SubmitOutcome::Transferred => {
            event!(
                name: "io_filter.forwarded",
                Level::TRACE,
                device.name = context.name(),
                request.id = id.as_u64(),
                mode = "observed"
            );
        }
        SubmitOutcome::Rejected { request, status } => finalize_rejected(request, status, context),
    }
}

fn finalize_rejected<T>(request: Request, status: Status, context: &DeviceContext<T>) {
    event!(
        name: "io_filter.rejected",
        Level::WARN,
        device.name = context.name(),
        request.id = request.id().as_u64(),
        request.kind = request.kind().as_str(),
        status = %status,
        "target rejected request",
    );

    request.finalize(status);
}

/// Runs on whatever thread the target finishes the request on.
fn on_completion<T>(mut request: Request, _target: &T, params: CompletionParams, context: &DeviceContext<T>) {
    event!(
        name: "io_filter.completion",
        Level::DEBUG,
        device.name = context.name(),
        request.id = request.id().as_u64(),
        status = %params.status(),
        information = params.information(),
        "observed request completed",
    );

    // The completed request is available here for inspection before it is finalized.

    request.set_information(params.information());
    request.finalize(params.status());
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use futures::executor::block_on;
    use mockall::predicate;
    use tracing_subscriber::util::SubscriberInitExt;

    use super::*;
    use crate::testing::LogCapture;
    use crate::{MockIoTarget, OBSERVED_CONTROL_CODE};

    fn context(target: MockIoTarget) -> Arc<DeviceContext<MockIoTarget>> {
        Arc::new(DeviceContext::new("mock", target))
    }

    #[test]
    fn send_and_forget_accepted_leaves_request_to_target() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let held_clone = Arc::clone(&held);

        let mut target = MockIoTarget::new();
        target
            .expect_submit()
            .withf(|_request, observer| observer.is_none())
            .times(1)
            .returning(move |request, _observer| {
                held_clone.lock().unwrap().push(request);
                SubmitOutcome::Transferred
            });

        let (request, mut pending) = Request::read(4096);
        send_and_forget(request, &context(target));

        assert!(pending.try_completion().is_none());

        let request = held.lock().unwrap().pop().unwrap();
        request.finalize(Status::SUCCESS);
        assert_eq!(block_on(pending).unwrap().status(), Status::SUCCESS);
    }

    #[test]
    fn send_and_forget_rejected_finalizes_with_rejection_status() {
        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let mut target = MockIoTarget::new();
        target.expect_submit().times(1).returning(|request, _observer| SubmitOutcome::Rejected {
            request,
            status: Status::INSUFFICIENT_RESOURCES,
        });

        let (request, pending) = Request::write(10);
        send_and_forget(request, &context(target));

        assert_eq!(block_on(pending).unwrap().status(), Status::INSUFFICIENT_RESOURCES);
        log_capture.assert_contains("WARN");
        log_capture.assert_contains("target rejected request");
        log_capture.assert_contains("INSUFFICIENT_RESOURCES");
    }

    #[test]
    fn send_with_callback_accepted_finalizes_from_observer() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let held_clone = Arc::clone(&held);

        let mut target = MockIoTarget::new();
        target
            .expect_submit()
            .withf(|_request, observer| observer.is_some())
            .times(1)
            .returning(move |request, observer| {
                held_clone.lock().unwrap().push((request, observer.unwrap()));
                SubmitOutcome::Transferred
            });

        let (request, mut pending) = Request::device_control(OBSERVED_CONTROL_CODE, 8, 8);
        send_with_callback(request, &context(target));

        assert!(pending.try_completion().is_none());

        let (request, observer) = held.lock().unwrap().pop().unwrap();
        observer.complete(request, CompletionParams::new(Status::SUCCESS, 8));

        let completion = block_on(pending).unwrap();
        assert_eq!(completion.status(), Status::SUCCESS);
        assert_eq!(completion.information(), 8);
    }

    #[test]
    fn send_with_callback_formats_request() {
        let mut target = MockIoTarget::new();
        target
            .expect_submit()
            .withf(|request, _observer| request.status() == Status::PENDING && request.information() == 0)
            .times(1)
            .returning(|request, _observer| SubmitOutcome::Rejected {
                request,
                status: Status::DEVICE_BUSY,
            });

        let (mut request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 0, 0);
        request.set_status(Status::UNSUCCESSFUL);
        request.set_information(5);
        send_with_callback(request, &context(target));

        let completion = block_on(pending).unwrap();
        assert_eq!(completion.status(), Status::DEVICE_BUSY);
        assert!(completion.into_result().is_err());
    }

    #[test]
    fn rejection_status_wins_over_status_block() {
        for observed in [false, true] {
            let mut target = MockIoTarget::new();
            target.expect_submit().times(1).returning(|mut request, _observer| {
                // A stale success in the block must not leak to the issuer.
                request.set_status(Status::SUCCESS);
                SubmitOutcome::Rejected {
                    request,
                    status: Status::INVALID_DEVICE_STATE,
                }
            });
            let context = context(target);

            let (request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 0, 0);
            if observed {
                send_with_callback(request, &context);
            } else {
                send_and_forget(request, &context);
            }

            let completion = block_on(pending).unwrap();
            assert_eq!(completion.status(), Status::INVALID_DEVICE_STATE);
            assert_eq!(completion.into_result().unwrap_err().status(), Status::INVALID_DEVICE_STATE);
        }
    }

    #[test]
    fn send_with_callback_rejected_skips_observer() {
        let mut target = MockIoTarget::new();
        target.expect_submit().times(1).returning(|request, observer| {
            // Dropping the observer is how a rejecting target declines to call it.
            drop(observer);
            SubmitOutcome::Rejected {
                request,
                status: Status::DEVICE_BUSY,
            }
        });

        let log_capture = LogCapture::new();
        let _guard = log_capture.subscriber().set_default();

        let (request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 0, 0);
        send_with_callback(request, &context(target));

        assert_eq!(block_on(pending).unwrap().status(), Status::DEVICE_BUSY);
        assert!(!log_capture.output().contains("observed request completed"));
    }

    #[test]
    fn observer_keeps_context_alive() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let held_clone = Arc::clone(&held);

        let mut target = MockIoTarget::new();
        target
            .expect_submit()
            .with(predicate::always(), predicate::always())
            .returning(move |request, observer| {
                held_clone.lock().unwrap().push((request, observer.unwrap()));
                SubmitOutcome::Transferred
            });

        let context = context(target);
        let (request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 0, 0);
        send_with_callback(request, &context);

        assert_eq!(Arc::strong_count(&context), 2);
        drop(context);

        let (request, observer) = held.lock().unwrap().pop().unwrap();
        observer.complete(request, CompletionParams::new(Status::CANCELLED, 0));
        assert_eq!(block_on(pending).unwrap().status(), Status::CANCELLED);
    }
}
