// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A reusable bounded-concurrency executor: a fixed set of worker
//! threads draining a FIFO queue.  `enqueue` hands back a handle that
//! resolves when the task finishes, carrying either its value or its
//! panic payload — a panicking task takes down neither its worker nor
//! its siblings.
//!
//! Shutdown signals the stop flag, wakes every worker, and joins
//! them.  Tasks still queued when the flag goes up are never started;
//! a caller that needs the queue drained awaits its handles before
//! shutting down.  There are no priorities and no cancellation: a
//! task that has started runs to completion.

use std::collections::VecDeque;
use std::panic;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crossbeam::channel;
use crossbeam::channel::Receiver;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct State {
    jobs: VecDeque<Job>,
    stop: bool,
}

struct Shared {
    queue: Mutex<State>,
    ready: Condvar,
}

/// The bounded worker pool.  Dropping it shuts it down.
pub struct TaskPool {
    workers: Vec<thread::JoinHandle<()>>,
    shared: Arc<Shared>,
}

/// Completion handle for one enqueued task.
pub struct TaskHandle<T> {
    result: Receiver<thread::Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run, returning its value, or its
    /// panic payload if it blew up.  A task discarded by a shutdown
    /// that beat it to the queue also comes back as an `Err`.
    pub fn wait(self) -> thread::Result<T> {
        match self.result.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(Box::new("task discarded before it started")),
        }
    }
}

impl TaskPool {
    /// Spins up `workers` threads waiting on the queue.
    pub fn new(workers: usize) -> TaskPool {
        assert!(workers > 0, "a task pool needs at least one worker");
        let shared = Arc::new(Shared {
            queue: Mutex::new(State {
                jobs: VecDeque::new(),
                stop: false,
            }),
            ready: Condvar::new(),
        });
        let workers = (0..workers)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        TaskPool { workers, shared }
    }

    /// Appends a task to the queue and returns its completion handle.
    pub fn enqueue<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = channel::bounded(1);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(panic::AssertUnwindSafe(task));
            // the receiver may be gone; the task still ran, which is
            // all the contract promises
            let _ = sender.send(outcome);
        });
        {
            let mut state = self.shared.queue.lock().unwrap();
            state.jobs.push_back(job);
        }
        self.shared.ready.notify_one();
        TaskHandle { result: receiver }
    }

    /// Signals stop, wakes all workers, and joins them.  Queued tasks
    /// that have not started are discarded.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        {
            let mut state = self.shared.queue.lock().unwrap();
            state.stop = true;
        }
        self.shared.ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.queue.lock().unwrap();
            loop {
                if state.stop {
                    return;
                }
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                state = shared.ready.wait(state).unwrap();
            }
        };
        job();
    }
}
