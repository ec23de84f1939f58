use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::queue::{self, TaskReceiver, TaskSender};
use crate::task::Task;
use crate::worker::Worker;
use crate::{PoolError, Result, ResultHandle};

const DEFAULT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_THREAD_CEILING: u32 = 1024;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Wait bound applied when the pool is dropped rather than joined.
const DROP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Sizing policy of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    /// The worker count is constant for the pool's lifetime.
    Fixed,
    /// The worker count grows under backlog pressure up to a ceiling
    /// and shrinks back via idle-timeout reclamation.
    Elastic,
}

/// State shared between the controller and every worker.
///
/// The sizing configuration is frozen at `start`; the mutable side
/// lives behind one mutex so scaling and reclamation can never race
/// each other on the counters or the registry.
pub(crate) struct PoolShared {
    pub(crate) mode: PoolMode,
    pub(crate) init_threads: u32,
    pub(crate) thread_ceiling: u32,
    pub(crate) idle_timeout: Duration,
    pub(crate) queue: TaskReceiver,
    pub(crate) state: Mutex<PoolState>,
    /// Rendezvous for shutdown: signaled on every deregistration,
    /// awaited until the registry drains.
    pub(crate) all_exited: Condvar,
    next_worker_id: AtomicU64,
}

impl PoolShared {
    fn next_id(&self) -> u64 {
        self.next_worker_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Counters and registry, guarded by the shared mutex.
pub(crate) struct PoolState {
    pub(crate) current_threads: u32,
    pub(crate) idle_threads: u32,
    pub(crate) registry: HashMap<u64, Worker>,
}

struct Runtime {
    tx: TaskSender,
    shared: Arc<PoolShared>,
}

/// A bounded worker thread pool.
///
/// Configure the pool before [`start`](ThreadPool::start); once it is
/// running, configuration calls are ignored. Submitted jobs are queued
/// FIFO with backpressure and executed on the workers, each returning
/// a [`ResultHandle`] for its output.
///
/// # Examples
///
/// ```
/// use taskpool::ThreadPool;
///
/// let mut pool = ThreadPool::new();
/// pool.start(4).unwrap();
/// let handle = pool.submit(|| 1 + 2);
/// assert_eq!(handle.get().extract::<i32>().unwrap(), 3);
/// pool.join();
/// ```
pub struct ThreadPool {
    mode: PoolMode,
    queue_capacity: usize,
    thread_ceiling: u32,
    idle_timeout: Duration,
    submit_timeout: Duration,
    runtime: Option<Runtime>,
}

impl Default for ThreadPool {
    fn default() -> Self {
        ThreadPool {
            mode: PoolMode::Fixed,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_ceiling: DEFAULT_THREAD_CEILING,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            runtime: None,
        }
    }
}

impl ThreadPool {
    /// Creates an unstarted pool with default configuration: fixed
    /// mode, queue capacity 1024, thread ceiling 1024, 60 s idle
    /// timeout, 1 s submission wait budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sizing mode. Ignored once the pool is running.
    pub fn set_mode(&mut self, mode: PoolMode) {
        if self.reject_when_running("mode") {
            return;
        }
        self.mode = mode;
    }

    /// Sets the task queue capacity. Ignored once the pool is running,
    /// or if `capacity` is zero.
    pub fn set_queue_capacity(&mut self, capacity: usize) {
        if self.reject_when_running("queue capacity") {
            return;
        }
        if capacity == 0 {
            warn!("Ignoring zero queue capacity");
            return;
        }
        self.queue_capacity = capacity;
    }

    /// Sets the elastic-mode thread ceiling. Ignored once the pool is
    /// running, if `ceiling` is zero, or while the mode is not
    /// [`PoolMode::Elastic`].
    pub fn set_thread_ceiling(&mut self, ceiling: u32) {
        if self.reject_when_running("thread ceiling") {
            return;
        }
        if ceiling == 0 {
            warn!("Ignoring zero thread ceiling");
            return;
        }
        if self.mode == PoolMode::Elastic {
            self.thread_ceiling = ceiling;
        }
    }

    /// Sets how long an elastic surplus worker may stay idle before it
    /// is reclaimed. Ignored once the pool is running.
    pub fn set_idle_timeout(&mut self, timeout: Duration) {
        if self.reject_when_running("idle timeout") {
            return;
        }
        self.idle_timeout = timeout;
    }

    /// Sets the wait budget a submission spends blocking on a full
    /// queue before it is rejected. Ignored once the pool is running.
    pub fn set_submit_timeout(&mut self, timeout: Duration) {
        if self.reject_when_running("submit timeout") {
            return;
        }
        self.submit_timeout = timeout;
    }

    fn reject_when_running(&self, what: &str) -> bool {
        if self.runtime.is_some() {
            warn!("Pool is already running, ignoring {what} change");
            return true;
        }
        false
    }

    /// Launches the pool with `threads` workers.
    ///
    /// Freezes the configuration, creates the bounded queue, and
    /// spawns and registers the initial workers, all counted as idle.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` on a second call; `InvalidConfig` if `threads`
    /// is zero or, in elastic mode, exceeds the thread ceiling.
    pub fn start(&mut self, threads: u32) -> Result<()> {
        if self.runtime.is_some() {
            return Err(PoolError::AlreadyStarted);
        }
        if threads == 0 {
            return Err(PoolError::InvalidConfig(
                "thread count must be positive".to_string(),
            ));
        }
        if self.mode == PoolMode::Elastic && threads > self.thread_ceiling {
            return Err(PoolError::InvalidConfig(format!(
                "thread count {} exceeds ceiling {}",
                threads, self.thread_ceiling
            )));
        }

        let (tx, rx) = queue::bounded(self.queue_capacity);
        let shared = Arc::new(PoolShared {
            mode: self.mode,
            init_threads: threads,
            thread_ceiling: self.thread_ceiling,
            idle_timeout: self.idle_timeout,
            queue: rx,
            state: Mutex::new(PoolState {
                current_threads: threads,
                idle_threads: threads,
                registry: HashMap::new(),
            }),
            all_exited: Condvar::new(),
            next_worker_id: AtomicU64::new(0),
        });

        {
            let mut state = shared.state.lock().unwrap();
            for _ in 0..threads {
                let worker = Worker::new(shared.next_id());
                worker.start(Arc::clone(&shared));
                state.registry.insert(worker.id(), worker);
            }
        }

        info!("Pool started with {} threads ({:?} mode)", threads, self.mode);
        self.runtime = Some(Runtime { tx, shared });
        Ok(())
    }

    /// Submits a job, blocking up to the submission wait budget while
    /// the queue is full.
    ///
    /// Returns a handle that is either bound to the job or, if the
    /// queue stayed full for the whole budget (or the pool is not
    /// running), pre-completed with [`TaskOutput::Rejected`] — the job
    /// is discarded in that case and never runs.
    ///
    /// [`TaskOutput::Rejected`]: crate::TaskOutput::Rejected
    pub fn submit<F, T>(&self, job: F) -> ResultHandle
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        match self.try_submit(job) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Submission rejected: {e}");
                ResultHandle::rejected()
            }
        }
    }

    /// Like [`submit`](ThreadPool::submit), but surfaces rejection as
    /// an error instead of a pre-completed handle.
    ///
    /// # Errors
    ///
    /// `NotRunning` before `start`; `QueueFull` if the queue stayed
    /// full for the whole wait budget.
    pub fn try_submit<F, T>(&self, job: F) -> Result<ResultHandle>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let Some(runtime) = &self.runtime else {
            return Err(PoolError::NotRunning);
        };

        let (task, handle) = Task::new(job);
        if let Err(task) = runtime.tx.enqueue(task, self.submit_timeout) {
            task.reject();
            return Err(PoolError::QueueFull);
        }

        if self.mode == PoolMode::Elastic {
            self.maybe_grow(runtime);
        }

        Ok(handle)
    }

    /// Spawns one extra worker when the backlog genuinely cannot be
    /// absorbed by idle capacity and the ceiling permits it.
    fn maybe_grow(&self, runtime: &Runtime) {
        let shared = &runtime.shared;
        let mut state = shared.state.lock().unwrap();

        if runtime.tx.len() > state.idle_threads as usize
            && state.current_threads < shared.thread_ceiling
        {
            let worker = Worker::new(shared.next_id());
            debug!(
                "Backlog exceeds idle capacity, spawning worker {}",
                worker.id()
            );
            worker.start(Arc::clone(shared));
            state.registry.insert(worker.id(), worker);
            state.current_threads += 1;
            state.idle_threads += 1;
        }
    }

    /// The configured sizing mode.
    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    /// Whether `start` has been called.
    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Current number of workers, zero before `start`.
    pub fn threads(&self) -> u32 {
        match &self.runtime {
            Some(runtime) => runtime.shared.state.lock().unwrap().current_threads,
            None => 0,
        }
    }

    /// Number of workers currently waiting for a task.
    pub fn idle_threads(&self) -> u32 {
        match &self.runtime {
            Some(runtime) => runtime.shared.state.lock().unwrap().idle_threads,
            None => 0,
        }
    }

    /// Number of tasks waiting in the queue.
    pub fn queued_tasks(&self) -> usize {
        match &self.runtime {
            Some(runtime) => runtime.tx.len(),
            None => 0,
        }
    }

    /// Shuts the pool down, blocking until every worker has drained
    /// the queue, deregistered, and exited.
    ///
    /// Queued tasks still run to completion before their workers
    /// observe the close; no task is abandoned.
    pub fn join(mut self) {
        if let Some(runtime) = self.runtime.take() {
            // Unbounded wait: the registry always drains once the
            // queue closes, unless a task itself never returns.
            let _ = shutdown(runtime, None);
        }
    }

    /// Like [`join`](ThreadPool::join), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// `ShutdownTimedOut` if workers are still registered when the
    /// timeout expires; remaining workers keep draining in the
    /// background.
    pub fn join_timeout(mut self, timeout: Duration) -> Result<()> {
        match self.runtime.take() {
            Some(runtime) => shutdown(runtime, Some(Instant::now() + timeout)),
            None => Ok(()),
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if shutdown(runtime, Some(Instant::now() + DROP_SHUTDOWN_TIMEOUT)).is_err() {
                error!("Shutdown timed out with workers still running");
            }
        }
    }
}

/// Closes the queue and waits on the exit rendezvous until the worker
/// registry is empty, optionally up to a deadline.
fn shutdown(runtime: Runtime, deadline: Option<Instant>) -> Result<()> {
    let Runtime { tx, shared } = runtime;
    // Dropping the sender closes the queue; workers drain what is left
    // and then deregister one by one.
    drop(tx);

    let mut state = shared.state.lock().unwrap();
    while !state.registry.is_empty() {
        state = match deadline {
            None => shared.all_exited.wait(state).unwrap(),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(PoolError::ShutdownTimedOut);
                }
                shared.all_exited.wait_timeout(state, deadline - now).unwrap().0
            }
        };
    }

    info!("All workers exited, pool shut down");
    Ok(())
}
