//! Step contract

use crate::core::ChainContext;
use crate::persistence::StoreError;
use async_trait::async_trait;
use thiserror::Error;

/// Unexpected faults that abort a chain run.
///
/// These are never recorded in the context; expected failures are recorded
/// with [`ChainContext::break_with`] instead.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("step {step} failed: {message}")]
    Step { step: &'static str, message: String },
}

/// A single unit of work in a chain
#[async_trait]
pub trait Step: Send + Sync {
    /// Name used in logs and events
    fn name(&self) -> &'static str;

    /// Do the work. May mutate the pipeline, record errors, or mark the
    /// context stopped. An `Err` is a fault, not a validation failure.
    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError>;

    /// Queried by the runner right after `execute`
    fn should_stop(&self, context: &ChainContext) -> bool {
        context.is_stopped()
    }
}

/// Owned, dynamically dispatched step
pub type BoxedStep = Box<dyn Step>;
