//! Concrete chain steps

pub mod build;
pub mod create;
pub mod populate;
pub mod validate;

pub use build::Build;
pub use create::{Create, PERSIST_ERROR_PREFIX};
pub use populate::Populate;
pub use validate::{Abilities, Repository};
