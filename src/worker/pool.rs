//! Bounded worker pool
//!
//! A fixed number of named OS threads pull [`ComputeRequest`]s from a shared
//! queue. The number of live workers therefore never exceeds the configured
//! ceiling, however many units the partition produces.
//!
//! Once the cancellation flag is set, threads drop queued requests without
//! evaluating them and in-flight units stop at their next check.

use super::{CandidateEvaluator, ComputeRequest, Worker};
use crate::Result;
use anyhow::Context;
use crossbeam::channel::{unbounded, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Fixed-size pool of worker threads fed from a request queue
pub struct WorkerPool {
    /// Request queue; `None` once the pool has been closed
    queue: Option<Sender<ComputeRequest>>,
    handles: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn `threads` workers sharing `evaluator`
    pub fn new(threads: usize, evaluator: Arc<dyn CandidateEvaluator>) -> Result<Self> {
        if threads == 0 {
            anyhow::bail!("worker pool needs at least one thread");
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (queue, requests) = unbounded::<ComputeRequest>();
        let mut handles = Vec::with_capacity(threads);

        for worker_id in 0..threads {
            let worker = Worker::new(worker_id, Arc::clone(&evaluator), Arc::clone(&cancel));
            let requests = requests.clone();
            let cancel = Arc::clone(&cancel);

            let handle = thread::Builder::new()
                .name(format!("sqsearch-worker-{}", worker_id))
                .spawn(move || {
                    for request in requests.iter() {
                        if cancel.load(Ordering::Relaxed) {
                            trace!(worker = worker_id, unit_id = request.unit_id, "dropping queued unit");
                            continue;
                        }
                        worker.run(request);
                    }
                    debug!(worker = worker_id, "worker exiting");
                })
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            handles.push(handle);
        }

        Ok(Self {
            queue: Some(queue),
            handles,
            cancel,
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Queue a request for the next idle worker
    pub fn submit(&self, request: ComputeRequest) -> Result<()> {
        let queue = self
            .queue
            .as_ref()
            .context("worker pool is closed")?;
        queue
            .send(request)
            .map_err(|_| anyhow::anyhow!("all worker threads have exited"))
    }

    /// Ask all workers to stop as soon as possible
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for every worker thread to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.queue.take();
        let mut panicked = 0;
        for handle in std::mem::take(&mut self.handles) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            anyhow::bail!("{} worker thread(s) panicked", panicked);
        }
        Ok(())
    }

    /// Cancel, close the queue and detach the threads without waiting
    ///
    /// Workers are side-effect free apart from their final send, so stragglers
    /// can finish (or notice the flag) on their own.
    pub fn abandon(mut self) {
        self.cancel();
        self.queue.take();
        self.handles.clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Threads exit once the queue drains; never block in drop
        if !self.handles.is_empty() {
            self.cancel();
        }
        self.queue.take();
    }
}
