//! Worker thread spawning and joining
//!
//! Each worker is a named OS thread (`worker-<id>`) running inside a
//! `worker` tracing span, so every diagnostic line it emits carries its id.
//! Requests are validated before any thread of a batch is started.

use super::ScenarioContext;
use crate::core::{run_operation, run_transfer, OperationReport, TransferEnv, TransferOutcome};
use crate::types::{OperationRequest, SimulationError, TransferRequest, WorkerId};
use std::thread::{self, JoinHandle};
use tracing::info_span;

/// A batch of running workers that produce `T`
#[derive(Debug)]
pub struct WorkerSet<T> {
    handles: Vec<(WorkerId, JoinHandle<T>)>,
}

impl<T: Send + 'static> WorkerSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    /// Start `task` on a new named thread
    ///
    /// # Errors
    ///
    /// Returns `WorkerSpawn` if the OS refuses to create the thread.
    pub fn spawn<F>(&mut self, worker: WorkerId, task: F) -> Result<(), SimulationError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("worker-{worker}"))
            .spawn(move || info_span!("worker", worker).in_scope(task))
            .map_err(|e| SimulationError::worker_spawn(worker, e.to_string()))?;
        self.handles.push((worker, handle));
        Ok(())
    }

    /// Number of workers in the set
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the set has no workers
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether every worker has returned
    pub fn all_finished(&self) -> bool {
        self.handles.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Wait for every worker and collect results in spawn order
    ///
    /// All workers are joined even if one panicked; the first panic is then
    /// reported as `WorkerPanicked`.
    pub fn join_all(self) -> Result<Vec<T>, SimulationError> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut panicked = None;

        for (worker, handle) in self.handles {
            match handle.join() {
                Ok(result) => results.push(result),
                Err(_) => {
                    panicked.get_or_insert(worker);
                }
            }
        }

        match panicked {
            Some(worker) => Err(SimulationError::worker_panicked(worker)),
            None => Ok(results),
        }
    }
}

impl<T: Send + 'static> Default for WorkerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate, spawn and join one worker per operation request
pub fn dispatch_operations(
    ctx: &ScenarioContext,
    requests: &[OperationRequest],
) -> Result<Vec<OperationReport>, SimulationError> {
    let len = ctx.store().len();
    for request in requests {
        request.validate(len)?;
    }

    let work_delay = ctx.config().work_delay;
    let mut workers = WorkerSet::new();
    for &request in requests {
        let store = ctx.shared_store();
        workers.spawn(request.worker, move || {
            run_operation(&store, &request, work_delay)
        })?;
    }

    workers.join_all()?.into_iter().collect()
}

/// Validate and spawn one worker per transfer request without joining
pub fn spawn_transfers(
    ctx: &ScenarioContext,
    requests: &[TransferRequest],
    env: &TransferEnv,
) -> Result<WorkerSet<Result<TransferOutcome, SimulationError>>, SimulationError> {
    let len = ctx.store().len();
    for request in requests {
        request.validate(len)?;
    }

    let mut workers = WorkerSet::new();
    for &request in requests {
        let store = ctx.shared_store();
        let env = env.clone();
        workers.spawn(request.worker, move || run_transfer(&store, &request, &env))?;
    }
    Ok(workers)
}

/// Join transfer workers and collect their outcomes in spawn order
pub fn collect_transfers(
    workers: WorkerSet<Result<TransferOutcome, SimulationError>>,
) -> Result<Vec<TransferOutcome>, SimulationError> {
    workers.join_all()?.into_iter().collect()
}
