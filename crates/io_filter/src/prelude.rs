// Copyright (c) Microsoft Corporation.

//! Common imports for writing filters and targets.
//!
//! Re-exports the most commonly used types from [`io_filter`][crate].

pub use crate::{
    CompletionObserver, CompletionParams, Filter, FilterOptions, IoQueueCallbacks, IoTarget, PendingRequest, Request, Status,
    SubmitOutcome,
};
