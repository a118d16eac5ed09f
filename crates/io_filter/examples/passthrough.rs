// Copyright (c) Microsoft Corporation.

//! Passthrough filter in front of a threaded target.
//!
//! The target executes requests on a worker thread, so every completion, including the
//! observed one, happens on a different thread than the dispatch.

use std::sync::Mutex;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use futures::executor::block_on;
use io_filter::prelude::*;
use io_filter::{IoControlCode, OBSERVED_CONTROL_CODE};
use tracing::Level;

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::TRACE).init();

    let (target, worker) = WorkerTarget::spawn();
    let filter = Filter::attach(target, &FilterOptions::default().name("example_disk"));

    let requests = vec![
        Request::read(4096),
        Request::write(512),
        Request::device_control(OBSERVED_CONTROL_CODE, 64, 0),
        Request::device_control(IoControlCode::from_raw(0x1234), 0, 0),
    ];

    let pending: Vec<PendingRequest> = requests
        .into_iter()
        .map(|(request, pending)| {
            filter.dispatch(request);
            pending
        })
        .collect();

    for pending in pending {
        match block_on(pending) {
            Ok(completion) => println!(
                "request {} completed: {} ({} bytes)",
                completion.id(),
                completion.status(),
                completion.information()
            ),
            Err(e) => println!("{e}"),
        }
    }

    // Dropping the filter drops the target, which closes the worker queue.
    drop(filter);
    worker.join().expect("worker thread panicked");
}

type Work = (Request, Option<CompletionObserver>);

/// A target that hands every request to a single worker thread.
#[derive(Debug)]
struct WorkerTarget {
    queue: Mutex<Sender<Work>>,
}

impl WorkerTarget {
    fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Work>();

        let worker = thread::spawn(move || {
            for (mut request, observer) in rx {
                let (status, information) = match *request.parameters() {
                    io_filter::Parameters::Read { length } | io_filter::Parameters::Write { length } => (Status::SUCCESS, length),
                    io_filter::Parameters::DeviceControl { io_control_code, .. } if io_control_code == OBSERVED_CONTROL_CODE => {
                        (Status::SUCCESS, 0)
                    }
                    io_filter::Parameters::DeviceControl { .. } => (Status::INVALID_DEVICE_REQUEST, 0),
                };

                match observer {
                    Some(observer) => observer.complete(request, CompletionParams::new(status, information)),
                    None => {
                        request.set_information(information);
                        request.finalize(status);
                    }
                }
            }
        });

        (Self { queue: Mutex::new(tx) }, worker)
    }
}

impl IoTarget for WorkerTarget {
    fn submit(&self, request: Request, observer: Option<CompletionObserver>) -> SubmitOutcome {
        let Ok(queue) = self.queue.lock() else {
            return SubmitOutcome::Rejected {
                request,
                status: Status::INVALID_DEVICE_STATE,
            };
        };

        match queue.send((request, observer)) {
            Ok(()) => SubmitOutcome::Transferred,
            Err(mpsc::SendError((request, _observer))) => SubmitOutcome::Rejected {
                request,
                status: Status::DEVICE_BUSY,
            },
        }
    }
}
