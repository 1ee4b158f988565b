//! Core domain models
//!
//! This module defines the pipeline graph under construction (pipeline,
//! stages, builds, environments, deployments), the project it belongs to,
//! and the context shared by the chain steps.

pub mod config;
pub mod context;
pub mod environment;
pub mod pipeline;
pub mod project;
pub mod state;
pub mod validation;

pub use context::*;
pub use environment::*;
pub use pipeline::*;
pub use project::*;
pub use state::*;
pub use validation::ValidationErrors;
