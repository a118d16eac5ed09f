// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # I/O Filter
//!
//! A passthrough filter that sits between a host delivering I/O requests and the target
//! that executes them.
//!
//! Every request is forwarded to the target. Reads, writes and almost all device control
//! requests are forwarded untouched and forgotten. Exactly one device control code, the
//! *observed* code, is forwarded with a completion observer so the filter sees the request
//! again after the target finishes it and can finalize it itself.
//!
//! ## Quick Start
//!
//! ```
//! use futures::executor::block_on;
//! use io_filter::{Filter, FilterOptions, IoQueueCallbacks, OBSERVED_CONTROL_CODE, Request, Status, SubmitOutcome, TargetFn};
//!
//! // A target that completes everything inline, notifying the observer when there is one.
//! let target = TargetFn::new(|request: Request, observer: Option<io_filter::CompletionObserver>| {
//!     match observer {
//!         Some(observer) => observer.complete(request, io_filter::CompletionParams::new(Status::SUCCESS, 4)),
//!         None => request.finalize(Status::SUCCESS),
//!     }
//!     SubmitOutcome::Transferred
//! });
//!
//! let filter = Filter::attach(target, &FilterOptions::default().name("disk0"));
//!
//! let (request, pending) = Request::device_control(OBSERVED_CONTROL_CODE, 4, 0);
//! filter.dispatch(request);
//!
//! let completion = block_on(pending).unwrap();
//! assert_eq!(completion.status(), Status::SUCCESS);
//! assert_eq!(completion.information(), 4);
//! ```
//!
//! ## Ownership
//!
//! A [`Request`] has exactly one owner at any time and is not [`Clone`]. Handing it to the
//! target moves it; a target that declines hands it back inside [`SubmitOutcome::Rejected`]
//! together with the failure status the issuer will see.
//! [`Request::finalize`] consumes it, so a request can be finalized at most once. Dropping a
//! request without finalizing it logs an error and resolves the issuer's [`PendingRequest`]
//! with [`RequestError::Abandoned`].
//!
//! ## Layers
//!
//! [`FilterLayer`] implements [`Layer`](tower_layer::Layer), so a filter can be built in
//! front of any [`IoTarget`] the same way middleware is built in front of a service:
//!
//! ```
//! use io_filter::{Filter, Request, Status, SubmitOutcome, TargetFn};
//! use tower_layer::Layer;
//!
//! let filter = Filter::layer()
//!     .name("keyboard")
//!     .layer(TargetFn::new(|request: Request, _observer| SubmitOutcome::Rejected {
//!         request,
//!         status: Status::DEVICE_BUSY,
//!     }));
//!
//! assert_eq!(filter.context().name(), "keyboard");
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: dispatch and forwarding decisions at `TRACE`,
//! observed requests and their completions at `DEBUG`, rejected requests at `WARN` and
//! abandoned requests at `ERROR`. Every event carries `device.name` and `request.id`.
//!
//! ## Features
//!
//! - **`serde`**: Implements `Serialize` and `Deserialize` for [`FilterOptions`],
//!   [`IoControlCode`] and [`Status`].

mod status;
pub use status::Status;

mod control_code;
pub use control_code::{DeviceType, IoControlCode, OBSERVED_CONTROL_CODE, RequiredAccess, TransferMethod};

mod error;
pub use error::{RequestError, StatusError};

mod request;
pub use request::{Completion, IoStatus, Parameters, PendingRequest, Request, RequestId, RequestKind};

mod completion;
pub use completion::{CompletionObserver, CompletionParams};

mod target;
#[cfg(test)]
pub(crate) use target::MockIoTarget;
pub use target::{IoTarget, SubmitOutcome, TargetFn};

mod classify;
pub use classify::{Classifier, ForwardingMode, classify};

mod context;
pub use context::DeviceContext;

mod options;
pub use options::FilterOptions;

pub mod forward;

mod filter;
pub use filter::{Filter, FilterLayer, IoQueueCallbacks};

pub mod prelude;

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
pub(crate) mod testing;
