use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{PoolError, Result};

/// A type-erased value produced by a task.
///
/// Wraps one concrete value behind a shared handle, recording its type
/// name at construction. Extraction is checked: asking for a different
/// type than the one stored fails with [`PoolError::TypeMismatch`]
/// rather than truncating silently. Clones share the same underlying
/// value, so every reader of a result handle observes the identical
/// allocation.
#[derive(Clone)]
pub struct TaskValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl TaskValue {
    /// Wraps a concrete value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        TaskValue {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Downcasts to the stored type, sharing the underlying value.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if `T` is not the type the value was
    /// constructed with.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        Arc::clone(&self.value)
            .downcast::<T>()
            .map_err(|_| PoolError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: self.type_name,
            })
    }

    /// Clones the stored value out.
    ///
    /// # Errors
    ///
    /// Returns `TypeMismatch` if `T` is not the stored type.
    pub fn extract<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        self.downcast::<T>().map(|v| (*v).clone())
    }

    /// Name of the concrete type stored at construction.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for TaskValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskValue").field(&self.type_name).finish()
    }
}

/// What a result handle yields for one submitted task.
///
/// A rejected submission is kept visibly distinct from a genuine
/// produced value, so callers never confuse "the queue was full" with
/// "the task ran and returned nothing".
#[derive(Debug, Clone)]
pub enum TaskOutput {
    /// The task ran to completion and produced this value.
    Value(TaskValue),
    /// The task panicked; carries the panic message.
    Failed(String),
    /// The submission was refused and the task never ran.
    Rejected,
}

impl TaskOutput {
    /// Extracts the produced value as a concrete type.
    ///
    /// # Errors
    ///
    /// `TaskFailed` if the task panicked, `Rejected` if the submission
    /// was refused, `TypeMismatch` if `T` is not the produced type.
    pub fn extract<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        match self {
            TaskOutput::Value(value) => value.extract(),
            TaskOutput::Failed(msg) => Err(PoolError::TaskFailed(msg.clone())),
            TaskOutput::Rejected => Err(PoolError::Rejected),
        }
    }

    /// The produced value, if the task completed.
    pub fn value(&self) -> Option<&TaskValue> {
        match self {
            TaskOutput::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the submission was refused.
    pub fn is_rejected(&self) -> bool {
        matches!(self, TaskOutput::Rejected)
    }

    /// Whether the task panicked.
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutput::Failed(_))
    }
}
