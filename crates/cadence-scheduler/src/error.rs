use cadence_core::ValidationErrors;
use cadence_store::StoreError;
use thiserror::Error;

/// Errors surfaced to the API layer by the scheduler.
///
/// Failed outbound calls never show up here: they are retried by the
/// executor, recorded in the task status and alerted on.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No task with the given ID exists in the store.
    #[error("task not found with given id: {id}")]
    NotFound { id: String },

    /// The submitted task definition is invalid.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The store failed for a reason other than a missing task.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SchedulerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { id } => SchedulerError::NotFound { id },
            other => SchedulerError::Store(other),
        }
    }
}

impl SchedulerError {
    /// Short error code string returned to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::NotFound { .. } => "TASK_NOT_FOUND",
            SchedulerError::Validation(_) => "VALIDATION_FAILED",
            SchedulerError::Store(_) => "STORE_ERROR",
        }
    }

    /// Errors the caller caused; reported as an invalid request, never retried.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            SchedulerError::NotFound { .. } | SchedulerError::Validation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
