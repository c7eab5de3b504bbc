//! Background retraining.
//!
//! A single worker thread drains a FIFO queue of retrain jobs so the caller
//! never blocks on a fit. Each scheduled job hands back a [`RetrainTicket`]
//! that resolves to the fit outcome.

use crate::engine::{Engine, FitOutcome};
use parking_lot::{Condvar, Mutex};
use schoolrec_core::{Error, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

struct RetrainJob {
    engine: Arc<Engine>,
    force: bool,
    reply: Sender<Result<FitOutcome>>,
}

impl RetrainJob {
    fn execute(self) {
        let result = self.engine.retrain(self.force);
        if let Err(e) = &result {
            error!("Background retrain failed: {}", e);
        }
        // The ticket may have been dropped; nobody is waiting then.
        let _ = self.reply.send(result);
    }
}

struct Shared {
    jobs: Mutex<VecDeque<RetrainJob>>,
    condvar: Condvar,
    running: AtomicBool,
    scheduled: AtomicU64,
    processed: AtomicU64,
}

/// Pending result of a scheduled retrain.
pub struct RetrainTicket {
    rx: Receiver<Result<FitOutcome>>,
}

impl RetrainTicket {
    /// Block until the retrain finishes.
    pub fn wait(self) -> Result<FitOutcome> {
        self.rx.recv().map_err(|_| Error::WorkerStopped)?
    }

    /// Block for at most `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<FitOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(Error::WorkerStopped),
        }
    }
}

/// Worker thread running retrains off the query path.
pub struct RetrainWorker {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetrainWorker {
    pub fn start() -> Result<Self> {
        let shared = Arc::new(Shared {
            jobs: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            running: AtomicBool::new(true),
            scheduled: AtomicU64::new(0),
            processed: AtomicU64::new(0),
        });

        let worker = shared.clone();
        let handle = thread::Builder::new()
            .name("retrain-worker".to_string())
            .spawn(move || Self::run(&worker))?;

        debug!("Retrain worker started");
        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn run(shared: &Shared) {
        loop {
            let mut jobs = shared.jobs.lock();

            while jobs.is_empty() && shared.running.load(Ordering::Acquire) {
                shared.condvar.wait(&mut jobs);
            }

            if jobs.is_empty() && !shared.running.load(Ordering::Acquire) {
                break;
            }

            while let Some(job) = jobs.pop_front() {
                drop(jobs);
                job.execute();
                shared.processed.fetch_add(1, Ordering::Relaxed);
                jobs = shared.jobs.lock();
            }
        }
        debug!("Retrain worker exiting");
    }

    /// Queue a retrain of `engine`.
    ///
    /// After [`RetrainWorker::shutdown`] the ticket resolves to
    /// [`Error::WorkerStopped`].
    pub fn schedule(&self, engine: Arc<Engine>, force: bool) -> RetrainTicket {
        let (reply, rx) = mpsc::channel();
        let mut jobs = self.shared.jobs.lock();
        if !self.shared.running.load(Ordering::Acquire) {
            let _ = reply.send(Err(Error::WorkerStopped));
            return RetrainTicket { rx };
        }

        self.shared.scheduled.fetch_add(1, Ordering::Relaxed);
        jobs.push_back(RetrainJob { engine, force, reply });
        self.shared.condvar.notify_one();
        info!("Retrain scheduled (force={}), {} pending", force, jobs.len());
        RetrainTicket { rx }
    }

    pub fn pending_jobs(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    pub fn jobs_scheduled(&self) -> u64 {
        self.shared.scheduled.load(Ordering::Relaxed)
    }

    pub fn jobs_processed(&self) -> u64 {
        self.shared.processed.load(Ordering::Relaxed)
    }

    /// Stop accepting jobs, finish the queued ones and join the thread.
    pub fn shutdown(&self) {
        {
            // Flip under the queue lock so the worker cannot miss the wakeup.
            let _jobs = self.shared.jobs.lock();
            self.shared.running.store(false, Ordering::Release);
            self.shared.condvar.notify_all();
        }

        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                error!("Retrain worker panicked");
            }
        }
    }
}

impl Drop for RetrainWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
