//! Builds in-memory stages and builds from the pipeline definition

use crate::chain::step::{ChainError, Step};
use crate::core::{pipeline, ChainContext, Stage};
use async_trait::async_trait;
use tracing::debug;

/// Populates the pipeline from `command.definition`.
///
/// Declared stages without jobs are skipped with a warning. Does nothing when
/// the command carries no definition or when every stage with jobs is
/// already on the pipeline.
#[derive(Debug, Default)]
pub struct Populate;

#[async_trait]
impl Step for Populate {
    fn name(&self) -> &'static str {
        "populate"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        let Some(definition) = context.command.definition.clone() else {
            return Ok(());
        };

        let mut populated = definition
            .stages
            .iter()
            .filter(|name| definition.jobs_for_stage(name).next().is_some())
            .peekable();
        if populated.peek().is_some()
            && populated.all(|name| context.pipeline.stages.iter().any(|s| &s.name == name))
        {
            debug!("Definition stages already populated");
            return Ok(());
        }

        let project_id = context.pipeline.project_id;
        let offset = context
            .pipeline
            .stages
            .iter()
            .map(|s| s.position + 1)
            .max()
            .unwrap_or(0);

        for (index, stage_name) in definition.stages.iter().enumerate() {
            let mut stage = Stage::new(stage_name.clone(), offset + index as i32, project_id);
            for job in definition.jobs_for_stage(stage_name) {
                let mut build = pipeline::Build::new(job.name.clone());
                build.environment = job.environment.clone();
                build.status = job.when.initial_status();
                stage.builds.push(build);
            }

            if stage.builds.is_empty() {
                context.record_warning(format!("Stage '{}' has no jobs and was skipped", stage_name));
                continue;
            }

            debug!(stage = %stage.name, builds = stage.builds.len(), "Populated stage");
            context.pipeline.stages.push(stage);
        }

        if context.pipeline.stages.is_empty() {
            context.break_with("No stages / jobs for this pipeline.");
        }

        Ok(())
    }
}
