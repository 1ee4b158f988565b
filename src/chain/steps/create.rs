//! Persists the pipeline graph

use crate::chain::step::{ChainError, Step};
use crate::core::{ChainContext, Pipeline};
use crate::persistence::{PersistError, PipelineStore, StoreTransaction};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Prefix of the error recorded when the pipeline cannot be saved
pub const PERSIST_ERROR_PREFIX: &str = "Failed to persist the pipeline";

/// Saves the pipeline with its stages and builds, then makes sure every build
/// that names an environment has that environment and one deployment.
///
/// All writes share one transaction. If any of them is invalid nothing is
/// kept, one error is recorded, and the chain breaks. A pipeline that already
/// has an id is left untouched.
pub struct Create {
    store: Arc<dyn PipelineStore>,
}

impl Create {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }

    async fn persist(
        tx: &mut dyn StoreTransaction,
        pipeline: &Pipeline,
    ) -> Result<Pipeline, PersistError> {
        let saved = tx.save_with_children(pipeline).await?;

        for build in saved.builds_with_environment() {
            let Some(name) = build.environment_name() else {
                continue;
            };
            let environment = tx
                .find_or_create_environment(saved.project_id, name)
                .await?;
            let deployment = tx.create_deployment(&saved, build, &environment).await?;
            debug!(
                build = %build.name,
                environment = %environment.name,
                deployment_id = deployment.id,
                "Linked build to environment"
            );
        }

        Ok(saved)
    }
}

#[async_trait]
impl Step for Create {
    fn name(&self) -> &'static str {
        "create"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        if context.pipeline.is_persisted() {
            debug!(pipeline_id = ?context.pipeline.id, "Pipeline already persisted");
            return Ok(());
        }

        let mut tx = self.store.begin().await?;

        match Self::persist(tx.as_mut(), &context.pipeline).await {
            Ok(saved) => {
                tx.commit().await?;
                info!(
                    run_id = %context.run_id,
                    pipeline_id = ?saved.id,
                    stages = saved.stages.len(),
                    "Pipeline persisted"
                );
                context.pipeline = saved;
            }
            Err(PersistError::Invalid(errors)) => {
                tx.rollback().await?;
                context.break_with(format!("{}: {}", PERSIST_ERROR_PREFIX, errors));
            }
            // Dropping the transaction discards everything written so far
            Err(PersistError::Store(err)) => return Err(err.into()),
        }

        Ok(())
    }
}
