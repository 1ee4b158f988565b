//! pipeline-chain - Builds CI pipeline graphs through an ordered chain of steps

pub mod chain;
pub mod cli;
pub mod core;
pub mod persistence;

// Re-export commonly used types
pub use chain::{BoxedStep, ChainError, ChainEvent, ChainRunner, RunResult, Step};
pub use core::{ChainContext, Command, Pipeline, PipelineStatus, Project, Stage, User};
pub use persistence::{InMemoryStore, PipelineStore, StoreError};
