use std::sync::{Arc, Condvar, Mutex};

use crate::value::TaskOutput;

/// One-shot slot a worker posts a task's output into.
///
/// The first `post` wins; it stores the output and releases all
/// current and future waiters. Later posts are ignored, which is what
/// keeps delivery exactly-once even if a caller misuses the slot.
pub(crate) struct ResultSlot {
    cell: Mutex<Option<TaskOutput>>,
    ready: Condvar,
}

impl ResultSlot {
    fn new() -> Self {
        ResultSlot {
            cell: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Stores the output if the slot is still empty and wakes every
    /// waiter.
    pub(crate) fn post(&self, output: TaskOutput) {
        let mut cell = self.cell.lock().unwrap();
        if cell.is_none() {
            *cell = Some(output);
            self.ready.notify_all();
        }
    }

    fn wait(&self) -> TaskOutput {
        let mut cell = self.cell.lock().unwrap();
        loop {
            if let Some(output) = cell.as_ref() {
                return output.clone();
            }
            cell = self.ready.wait(cell).unwrap();
        }
    }

    fn peek(&self) -> Option<TaskOutput> {
        self.cell.lock().unwrap().clone()
    }
}

/// A future-like handle to the output of one submitted task.
///
/// Created by [`ThreadPool::submit`](crate::ThreadPool::submit).
/// Cloneable; all clones refer to the same slot, and concurrent
/// readers observe the identical output. A handle for a rejected
/// submission is pre-completed with [`TaskOutput::Rejected`], so its
/// `get` returns immediately without touching any worker.
#[derive(Clone)]
pub struct ResultHandle {
    slot: Arc<ResultSlot>,
}

impl ResultHandle {
    pub(crate) fn new() -> (ResultHandle, Arc<ResultSlot>) {
        let slot = Arc::new(ResultSlot::new());
        let handle = ResultHandle {
            slot: Arc::clone(&slot),
        };
        (handle, slot)
    }

    /// A handle whose submission never reached the queue.
    pub(crate) fn rejected() -> ResultHandle {
        let (handle, slot) = ResultHandle::new();
        slot.post(TaskOutput::Rejected);
        handle
    }

    /// Blocks until the bound worker posts the task's output.
    ///
    /// Returns immediately for rejected submissions. May be called any
    /// number of times, from any number of threads; every call returns
    /// the same output.
    pub fn get(&self) -> TaskOutput {
        self.slot.wait()
    }

    /// Returns the output if it has been posted, without blocking.
    pub fn try_get(&self) -> Option<TaskOutput> {
        self.slot.peek()
    }

    /// Whether this handle's submission was refused, without blocking.
    pub fn is_rejected(&self) -> bool {
        matches!(self.try_get(), Some(TaskOutput::Rejected))
    }
}
