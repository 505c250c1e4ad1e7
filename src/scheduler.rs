//! Fixed-size worker pool with per-worker queues and work-stealing.
//!
//! Each worker owns one FIFO queue. Submission round-robins over the queues with
//! non-blocking pushes; workers scan up to `2 × workers` queues with non-blocking pops
//! before sleeping on their own queue. A pool with zero workers runs every job inline on
//! the submitting thread.

use std::{
    cell::Cell,
    collections::VecDeque,
    panic::AssertUnwindSafe,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError, TryLockError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::JoinHandle,
};

use crate::foundation::error::{KinegraphError, KinegraphResult};

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static WORKER_POOL_ID: Cell<u64> = const { Cell::new(0) };
}

struct QueueState {
    jobs: VecDeque<Job>,
    done: bool,
}

struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl TaskQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                done: false,
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock(&self) -> Option<MutexGuard<'_, QueueState>> {
        match self.state.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn try_pop(&self) -> Option<Job> {
        self.try_lock()?.jobs.pop_front()
    }

    fn try_push(&self, job: Job) -> Result<(), Job> {
        let Some(mut state) = self.try_lock() else {
            return Err(job);
        };
        if state.done {
            return Err(job);
        }
        state.jobs.push_back(job);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until a job is available or the queue is completed and drained.
    fn pop(&self) -> Option<Job> {
        let mut state = self.lock();
        while state.jobs.is_empty() && !state.done {
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.jobs.pop_front()
    }

    /// Hands the job back once the queue is completed, since its worker may already be gone.
    fn push(&self, job: Job) -> Result<(), Job> {
        let mut state = self.lock();
        if state.done {
            return Err(job);
        }
        state.jobs.push_back(job);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    fn complete(&self) {
        self.lock().done = true;
        self.ready.notify_all();
    }
}

enum TaskState<T> {
    Pending,
    Ready(Option<T>),
}

struct TaskSlot<T> {
    state: Mutex<TaskState<T>>,
    done: Condvar,
}

impl<T> TaskSlot<T> {
    fn fulfill(&self, value: Option<T>) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TaskState::Ready(value);
        self.done.notify_all();
    }
}

/// Completion handle for a job submitted through [`TaskScheduler::request`].
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot<T>>,
}

impl<T> TaskHandle<T> {
    fn new() -> Self {
        Self {
            slot: Arc::new(TaskSlot {
                state: Mutex::new(TaskState::Pending),
                done: Condvar::new(),
            }),
        }
    }

    /// `true` once the job has finished (or panicked).
    pub fn is_done(&self) -> bool {
        matches!(
            *self.slot.state.lock().unwrap_or_else(PoisonError::into_inner),
            TaskState::Ready(_)
        )
    }

    /// Block until the job has run and take its output.
    ///
    /// Returns `None` when the job panicked.
    pub fn join(self) -> Option<T> {
        let mut state = self.slot.state.lock().unwrap_or_else(PoisonError::into_inner);
        while matches!(*state, TaskState::Pending) {
            state = self
                .slot
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        match std::mem::replace(&mut *state, TaskState::Ready(None)) {
            TaskState::Ready(value) => value,
            TaskState::Pending => None,
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Work-stealing worker pool.
///
/// Jobs receive the 1-based id of the worker running them, or `0` when executed inline.
pub struct TaskScheduler {
    id: u64,
    queues: Arc<Vec<TaskQueue>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    next: AtomicUsize,
    terminated: AtomicBool,
}

impl TaskScheduler {
    /// Spawn `worker_count` workers. `0` yields a pool that runs jobs on the caller.
    pub fn new(worker_count: usize) -> KinegraphResult<Self> {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let queues = Arc::new((0..worker_count).map(|_| TaskQueue::new()).collect::<Vec<_>>());
        let mut threads = Vec::with_capacity(worker_count);

        for i in 0..worker_count {
            let worker_queues = Arc::clone(&queues);
            let spawned = std::thread::Builder::new()
                .name(format!("kinegraph-worker-{i}"))
                .spawn(move || worker_loop(id, i, &worker_queues));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(e) => {
                    for q in queues.iter() {
                        q.complete();
                    }
                    for t in threads {
                        let _ = t.join();
                    }
                    return Err(KinegraphError::Other(
                        anyhow::Error::new(e).context("spawn scheduler worker"),
                    ));
                }
            }
        }

        tracing::debug!(workers = worker_count, "task scheduler started");
        Ok(Self {
            id,
            queues,
            threads: Mutex::new(threads),
            next: AtomicUsize::new(0),
            terminated: AtomicBool::new(false),
        })
    }

    /// Number of worker threads (not counting the caller).
    pub fn worker_count(&self) -> usize {
        self.queues.len()
    }

    /// `true` when called from one of this pool's worker threads.
    pub fn on_worker_thread(&self) -> bool {
        WORKER_POOL_ID.with(|w| w.get() == self.id)
    }

    /// Submit a job and get a handle to its output.
    pub fn request<T, F>(&self, f: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(usize) -> T + Send + 'static,
    {
        let handle = TaskHandle::new();
        let slot = Arc::clone(&handle.slot);
        self.spawn(move |tid| {
            let out = std::panic::catch_unwind(AssertUnwindSafe(|| f(tid))).ok();
            slot.fulfill(out);
        });
        handle
    }

    /// Submit a job without a completion handle.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce(usize) + Send + 'static,
    {
        let count = self.queues.len();
        if count == 0 || self.terminated.load(Ordering::Acquire) {
            f(0);
            return;
        }

        let i = self.next.fetch_add(1, Ordering::Relaxed);
        let mut job: Job = Box::new(f);
        for n in 0..count {
            match self.queues[(i + n) % count].try_push(job) {
                Ok(()) => return,
                Err(back) => job = back,
            }
        }
        if let Err(job) = self.queues[i % count].push(job) {
            job(0);
        }
    }

    /// Drain every queue and join the workers. Later submissions run inline.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return;
        }
        for q in self.queues.iter() {
            q.complete();
        }
        let threads = std::mem::take(
            &mut *self.threads.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let me = std::thread::current().id();
        for t in threads {
            if t.thread().id() == me {
                continue;
            }
            let _ = t.join();
        }
        tracing::debug!(workers = self.queues.len(), "task scheduler terminated");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("workers", &self.queues.len())
            .field("terminated", &self.terminated.load(Ordering::Relaxed))
            .finish()
    }
}

fn worker_loop(pool_id: u64, i: usize, queues: &[TaskQueue]) {
    WORKER_POOL_ID.with(|w| w.set(pool_id));
    let count = queues.len();
    loop {
        let mut job = None;
        for x in 0..count * 2 {
            job = queues[(i + x) % count].try_pop();
            if job.is_some() {
                break;
            }
        }
        let job = match job {
            Some(job) => job,
            None => match queues[i].pop() {
                Some(job) => job,
                None => break,
            },
        };
        // A panicking job must not take the worker (and its queue) down with it.
        let _ = std::panic::catch_unwind(AssertUnwindSafe(move || job(i + 1)));
    }
}

#[cfg(test)]
#[path = "../tests/unit/scheduler.rs"]
mod tests;
