//! Dispatch queue - decouples job acceptance from delivery.
//!
//! Submitting never waits on delivery: the job is placed on a bounded
//! channel and a single background worker runs jobs one after another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::attachment::upload::discard_descriptor;
use crate::job::Job;

use super::engine::Dispatcher;

/// Acknowledgement that a job was accepted for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobTicket {
    pub job_id: u64,
}

/// Why a job could not be accepted. The job is handed back to the caller.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("dispatch queue is full")]
    Full(Job),

    #[error("dispatch queue is closed")]
    Closed(Job),
}

impl QueueError {
    pub fn into_job(self) -> Job {
        match self {
            QueueError::Full(job) | QueueError::Closed(job) => job,
        }
    }
}

struct QueuedJob {
    job_id: u64,
    job: Job,
}

/// Handle for submitting jobs to the dispatch worker.
#[derive(Clone)]
pub struct DispatchQueue {
    sender: mpsc::Sender<QueuedJob>,
    next_id: Arc<AtomicU64>,
}

impl DispatchQueue {
    /// Spawn the dispatch worker and return a submission handle.
    ///
    /// The worker stops once every handle has been dropped and the queue
    /// has drained, or when [`DispatchWorker::shutdown`] is called.
    pub fn start(dispatcher: Arc<Dispatcher>, capacity: usize) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(dispatcher, receiver, shutdown_rx));

        let queue = Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (queue, DispatchWorker { handle, shutdown })
    }

    /// Accept a job without waiting for any part of its delivery.
    pub fn submit(&self, job: Job) -> Result<JobTicket, QueueError> {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);

        match self.sender.try_send(QueuedJob { job_id, job }) {
            Ok(()) => {
                info!(
                    job_id = job_id,
                    queued = self.sender.max_capacity() - self.sender.capacity(),
                    "dispatch_job_queued"
                );
                Ok(JobTicket { job_id })
            }
            Err(TrySendError::Full(queued)) => {
                warn!(job_id = job_id, "dispatch_queue_full");
                Err(QueueError::Full(queued.job))
            }
            Err(TrySendError::Closed(queued)) => {
                warn!(job_id = job_id, "dispatch_queue_closed");
                Err(QueueError::Closed(queued.job))
            }
        }
    }
}

/// Handle to the background dispatch worker.
pub struct DispatchWorker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl DispatchWorker {
    /// Stop the worker and wait for it.
    ///
    /// The running job is interrupted and jobs still queued are dropped;
    /// their uploaded files are deleted.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("dispatch_worker_already_stopped");
        }
        self.join().await;
    }

    /// Wait for the worker to finish on its own.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "dispatch_worker_join_failed");
        }
    }
}

async fn run_worker(
    dispatcher: Arc<Dispatcher>,
    mut receiver: mpsc::Receiver<QueuedJob>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("dispatch_worker_started");

    loop {
        let next = tokio::select! {
            Ok(()) = shutdown.changed() => break,
            next = receiver.recv() => next,
        };
        let Some(QueuedJob { job_id, job }) = next else {
            break;
        };

        let interrupted = tokio::select! {
            Ok(()) = shutdown.changed() => true,
            result = dispatcher.run(job_id, &job) => {
                if let Err(e) = result {
                    debug!(job_id = job_id, error = %e, "dispatch_job_not_delivered");
                }
                false
            }
        };

        if interrupted {
            warn!(job_id = job_id, "dispatch_job_interrupted");
            discard_descriptor(job.into_attachment()).await;
            break;
        }
    }

    receiver.close();
    while let Ok(QueuedJob { job_id, job }) = receiver.try_recv() {
        warn!(job_id = job_id, "dispatch_job_dropped");
        discard_descriptor(job.into_attachment()).await;
    }

    info!("dispatch_worker_stopped");
}
