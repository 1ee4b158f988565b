//! Validation steps that run before anything is built or saved

use crate::chain::step::{ChainError, Step};
use crate::core::ChainContext;
use async_trait::async_trait;
use tracing::debug;

/// Breaks unless the current user may create pipelines in the project
#[derive(Debug, Default)]
pub struct Abilities;

#[async_trait]
impl Step for Abilities {
    fn name(&self) -> &'static str {
        "validate_abilities"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        let allowed = context
            .command
            .current_user
            .as_ref()
            .is_some_and(|user| context.command.project.can_create_pipeline(user));

        if !allowed {
            debug!(project = %context.command.project.path, "User may not create pipelines");
            context.break_with("Insufficient permissions to create a new pipeline");
        }

        Ok(())
    }
}

/// Breaks unless the requested ref resolves to exactly one branch or tag
#[derive(Debug, Default)]
pub struct Repository;

#[async_trait]
impl Step for Repository {
    fn name(&self) -> &'static str {
        "validate_repository"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        let command = &context.command;

        if !command.branch_exists() && !command.tag_exists() {
            context.break_with("Reference not found");
        } else if command.ambiguous_ref() {
            context.break_with("Ref is ambiguous");
        }

        Ok(())
    }
}
