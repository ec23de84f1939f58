use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::task::Task;

/// Creates the bounded FIFO task queue, split into its producer and
/// consumer halves.
///
/// The channel's capacity encodes the not-full/not-empty conditions:
/// producers block while the buffer is full, consumers while it is
/// empty, and dropping the producer half closes the queue, which is
/// the pool's shutdown signal. Order is strict FIFO.
pub(crate) fn bounded(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = channel::bounded(capacity);
    (TaskSender { tx }, TaskReceiver { rx })
}

/// Producer half of the task queue, held by the pool controller.
pub(crate) struct TaskSender {
    tx: Sender<Task>,
}

impl TaskSender {
    /// Blocks until there is room or the timeout elapses. On timeout
    /// the task is handed back, never stored.
    pub(crate) fn enqueue(&self, task: Task, timeout: Duration) -> Result<(), Task> {
        self.tx.send_timeout(task, timeout).map_err(|e| e.into_inner())
    }

    /// Number of tasks currently queued.
    pub(crate) fn len(&self) -> usize {
        self.tx.len()
    }
}

/// Outcome of a deadline-bounded dequeue.
pub(crate) enum Fetch {
    /// A task was pulled from the queue.
    Job(Task),
    /// The deadline passed with the queue still empty.
    TimedOut,
    /// The queue is closed and drained.
    Closed,
}

/// Consumer half of the task queue, shared by all workers.
pub(crate) struct TaskReceiver {
    rx: Receiver<Task>,
}

impl TaskReceiver {
    /// Blocks until a task arrives. `None` once the queue is closed
    /// and every remaining task has been drained.
    pub(crate) fn dequeue(&self) -> Option<Task> {
        self.rx.recv().ok()
    }

    /// Like `dequeue`, but additionally wakes at `deadline` so elastic
    /// workers can evaluate idle reclamation.
    pub(crate) fn dequeue_deadline(&self, deadline: Instant) -> Fetch {
        match self.rx.recv_deadline(deadline) {
            Ok(task) => Fetch::Job(task),
            Err(RecvTimeoutError::Timeout) => Fetch::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Fetch::Closed,
        }
    }

    /// Number of tasks currently queued.
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}
