//! Process-wide renderer state: the shared worker pool.

use std::sync::Arc;

use crate::foundation::error::KinegraphResult;
use crate::scheduler::TaskScheduler;

/// Engine configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Worker threads for shape preparation. `None` uses one less than the available
    /// parallelism; `Some(0)` runs every job on the rendering thread.
    pub threads: Option<usize>,
}

impl EngineOpts {
    /// Worker count these options resolve to on this machine.
    pub fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(0)
        })
    }
}

/// Owner of the worker pool every [`crate::Animation`] created from it shares.
///
/// Dropping the last handle to the pool joins its workers.
#[derive(Clone, Debug)]
pub struct Engine {
    scheduler: Arc<TaskScheduler>,
}

impl Engine {
    /// Start an engine with `opts`.
    #[tracing::instrument(level = "debug")]
    pub fn new(opts: EngineOpts) -> KinegraphResult<Self> {
        let scheduler = TaskScheduler::new(opts.resolved_threads())?;
        Ok(Self {
            scheduler: Arc::new(scheduler),
        })
    }

    /// Shared worker pool.
    pub fn scheduler(&self) -> &Arc<TaskScheduler> {
        &self.scheduler
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.scheduler.worker_count()
    }
}
