use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::debug;

use crate::pool::{PoolMode, PoolShared};
use crate::queue::Fetch;

/// A managed execution unit: an identity plus the run loop behind it.
///
/// Workers are registered in the pool's registry under their identity
/// and removed exactly once, on shutdown or on elastic idle
/// reclamation. The backing OS thread is detached; lifecycle is
/// tracked through the registry and the exit rendezvous instead.
pub(crate) struct Worker {
    id: u64,
}

impl Worker {
    pub(crate) fn new(id: u64) -> Self {
        Worker { id }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Launches the run loop on a named background thread.
    pub(crate) fn start(&self, shared: Arc<PoolShared>) {
        let id = self.id;
        thread::Builder::new()
            .name(format!("pool-worker-{id}"))
            .spawn(move || run_loop(id, shared))
            .expect("failed to spawn worker thread");
    }
}

/// The worker state machine: wait for a task, fetch it, execute it
/// with no lock held, deliver its output, repeat until the queue
/// closes or idle reclamation fires.
fn run_loop(id: u64, shared: Arc<PoolShared>) {
    let mut last_active = Instant::now();

    loop {
        let task = match shared.mode {
            // Fixed mode blocks indefinitely until a task or shutdown.
            PoolMode::Fixed => match shared.queue.dequeue() {
                Some(task) => task,
                None => break,
            },
            // Elastic mode also wakes once the idle timeout elapses,
            // measured from the last completed task.
            PoolMode::Elastic => match shared.queue.dequeue_deadline(last_active + shared.idle_timeout) {
                Fetch::Job(task) => task,
                Fetch::Closed => break,
                Fetch::TimedOut => {
                    if try_reclaim(id, &shared) {
                        return;
                    }
                    last_active = Instant::now();
                    continue;
                }
            },
        };

        shared.state.lock().unwrap().idle_threads -= 1;

        debug!("Worker {id} executing task");
        task.run();
        last_active = Instant::now();

        shared.state.lock().unwrap().idle_threads += 1;
    }

    // Queue closed: deregister, and let the rendezvous condition tell
    // the shutting-down controller when the registry has drained.
    debug!("Worker {id}: queue closed, exiting");
    let mut state = shared.state.lock().unwrap();
    state.registry.remove(&id);
    state.current_threads -= 1;
    state.idle_threads -= 1;
    shared.all_exited.notify_all();
}

/// Evaluates the reclamation predicate under the state lock. Only
/// capacity above the initial thread count is ever given back.
/// Returns true if this worker deregistered itself.
fn try_reclaim(id: u64, shared: &PoolShared) -> bool {
    let mut state = shared.state.lock().unwrap();
    if state.current_threads <= shared.init_threads {
        return false;
    }

    state.registry.remove(&id);
    state.current_threads -= 1;
    state.idle_threads -= 1;
    shared.all_exited.notify_all();
    debug!("Worker {id} idle past timeout, reclaimed");
    true
}
