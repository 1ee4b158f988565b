//! Pipeline construction chain
//!
//! A chain is an ordered list of steps run against one [`ChainContext`].
//! Each step may change the pipeline under construction, record errors, or
//! stop the chain.
//!
//! [`ChainContext`]: crate::core::ChainContext

pub mod runner;
pub mod step;
pub mod steps;

pub use runner::{ChainEvent, ChainRunner, EventHandler, RunResult};
pub use step::{BoxedStep, ChainError, Step};

use crate::persistence::PipelineStore;
use std::sync::Arc;

/// Steps that check a request without saving anything
pub fn validate_sequence() -> Vec<BoxedStep> {
    vec![
        Box::new(steps::Build),
        Box::new(steps::Abilities),
        Box::new(steps::Repository),
        Box::new(steps::Populate),
    ]
}

/// Steps that check a request and persist the resulting pipeline
pub fn create_sequence(store: Arc<dyn PipelineStore>) -> Vec<BoxedStep> {
    let mut sequence = validate_sequence();
    sequence.push(Box::new(steps::Create::new(store)));
    sequence
}
