//! Assigns pipeline attributes from the command

use crate::chain::step::{ChainError, Step};
use crate::core::ChainContext;
use async_trait::async_trait;

/// Copies ref, sha, source, user and project from the command onto the
/// pipeline. Never breaks the chain.
#[derive(Debug, Default)]
pub struct Build;

#[async_trait]
impl Step for Build {
    fn name(&self) -> &'static str {
        "build"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        let command = &context.command;
        let pipeline = &mut context.pipeline;

        pipeline.project_id = command.project.id;
        pipeline.source = command.source;
        pipeline.tag = command.tag_exists();

        if let Some(ref_name) = command.ref_name() {
            pipeline.ref_name = Some(ref_name.to_string());
        }
        if let Some(sha) = &command.checkout_sha {
            pipeline.sha = Some(sha.clone());
        }
        if let Some(user) = &command.current_user {
            pipeline.user_id = Some(user.id);
        }

        Ok(())
    }
}
