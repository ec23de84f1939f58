use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::handle::{ResultHandle, ResultSlot};
use crate::value::{TaskOutput, TaskValue};

/// One unit of queued work: a boxed job bound to the slot its output
/// is delivered through.
///
/// Owned by the submitter until enqueued, then by the queue, then by
/// the executing worker, then dropped.
pub(crate) struct Task {
    job: Box<dyn FnOnce() -> TaskValue + Send + 'static>,
    slot: Arc<ResultSlot>,
}

impl Task {
    /// Packages a job and returns it together with the handle its
    /// output will be read through.
    pub(crate) fn new<F, T>(job: F) -> (Task, ResultHandle)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (handle, slot) = ResultHandle::new();
        let task = Task {
            job: Box::new(move || TaskValue::new(job())),
            slot,
        };
        (task, handle)
    }

    /// Runs the job and posts its output to the bound slot.
    ///
    /// A panicking job is reported as `TaskOutput::Failed` so the
    /// worker loop continues.
    pub(crate) fn run(self) {
        let Task { job, slot } = self;
        let output = match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(value) => TaskOutput::Value(value),
            Err(payload) => TaskOutput::Failed(panic_message(payload.as_ref())),
        };
        slot.post(output);
    }

    /// Marks a task that never made it into the queue, completing its
    /// handle with `Rejected`.
    pub(crate) fn reject(self) {
        self.slot.post(TaskOutput::Rejected);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
