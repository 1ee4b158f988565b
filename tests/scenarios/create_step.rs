//! Test: Create step - persisting pipelines, stages, environments, deployments

use crate::helpers::*;
use pipeline_chain::chain::steps::{Create, PERSIST_ERROR_PREFIX};
use pipeline_chain::chain::BoxedStep;
use pipeline_chain::core::{Build, Pipeline, Stage};
use pipeline_chain::persistence::{InMemoryStore, PipelineStore};
use std::sync::Arc;

fn create_only(store: Arc<dyn PipelineStore>) -> Vec<BoxedStep> {
    vec![Box::new(Create::new(store))]
}

/// A valid pipeline with one stage is saved together with the stage
#[tokio::test]
async fn test_valid_pipeline_is_persisted() {
    let store = InMemoryStore::new();
    let mut ctx = context_for(pipeline_with_stage());

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;

    assert!(result.success);
    assert!(result.errors.is_empty());
    assert!(ctx.pipeline.is_persisted());
    assert_eq!(result.pipeline_id, ctx.pipeline.id);

    let reloaded = store
        .load_pipeline(ctx.pipeline.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.stages.len(), 1);
    assert!(reloaded.stages[0].is_persisted());
    assert_eq!(reloaded.stages[0].name, "test");
}

/// A pipeline without a ref breaks the chain with one persistence error
#[tokio::test]
async fn test_pipeline_without_ref_breaks_chain() {
    let store = InMemoryStore::new();
    let pipeline = Pipeline::new(PROJECT_ID).with_stage(Stage::new("test", 0, PROJECT_ID));
    let mut ctx = context_for(pipeline);

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Failed to persist the pipeline"));
    assert!(result.errors[0].contains("Ref can't be blank"));
    assert!(ctx.is_stopped());
    assert!(!ctx.pipeline.is_persisted());
    assert_eq!(store.stage_count().await, 0);
    assert!(store.list_pipelines(PROJECT_ID).await.unwrap().is_empty());
}

/// Two stages sharing a position are rejected before anything is written
#[tokio::test]
async fn test_duplicate_stage_position_breaks_chain() {
    let store = InMemoryStore::new();
    let pipeline = Pipeline::for_ref(PROJECT_ID, "master")
        .with_stage(Stage::new("build", 0, PROJECT_ID).with_build(Build::new("compile")))
        .with_stage(Stage::new("test", 0, PROJECT_ID).with_build(Build::new("rspec")));
    let mut ctx = context_for(pipeline);

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with(PERSIST_ERROR_PREFIX));
    assert!(result.errors[0].contains("Stages position 0 has already been taken"));
    assert!(!ctx.pipeline.is_persisted());
    assert_eq!(store.stage_count().await, 0);
}

/// A build with an environment gets one environment and one deployment
#[tokio::test]
async fn test_build_with_environment_creates_deployment() {
    let store = InMemoryStore::new();
    let mut ctx = context_for(pipeline_with_deploy("production"));

    assert_eq!(store.environment_count().await, 0);
    assert_eq!(store.deployment_count().await, 0);

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;
    assert!(result.success);

    assert_eq!(store.environment_count().await, 1);
    assert_eq!(store.deployment_count().await, 1);

    let environments = store.environments(PROJECT_ID).await.unwrap();
    assert_eq!(environments[0].name, "production");

    let deployments = store.deployments(environments[0].id).await.unwrap();
    let build_id = ctx.pipeline.stages[0].builds[0].id;
    assert_eq!(Some(deployments[0].build_id), build_id);
    assert_eq!(deployments[0].ref_name, "master");
}

/// Re-running with the same environment name reuses the environment
#[tokio::test]
async fn test_environment_is_reused_across_runs() {
    let store = InMemoryStore::new();

    for _ in 0..3 {
        let mut ctx = context_for(pipeline_with_deploy("production"));
        let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;
        assert!(result.success);
    }

    assert_eq!(store.environment_count().await, 1);
    assert_eq!(store.deployment_count().await, 3);
    assert_eq!(store.list_pipelines(PROJECT_ID).await.unwrap().len(), 3);
}

/// Builds without an environment are left alone
#[tokio::test]
async fn test_builds_without_environment_are_noop() {
    let store = InMemoryStore::new();
    let pipeline = Pipeline::for_ref(PROJECT_ID, "master").with_stage(
        Stage::new("test", 0, PROJECT_ID)
            .with_build(Build::new("rspec"))
            .with_build(Build::new("lint").with_environment("")),
    );
    let mut ctx = context_for(pipeline);

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;

    assert!(result.success);
    assert_eq!(store.environment_count().await, 0);
    assert_eq!(store.deployment_count().await, 0);
}

/// An invalid environment name rolls back the pipeline too
#[tokio::test]
async fn test_invalid_environment_fails_whole_save() {
    let store = InMemoryStore::new();
    let mut ctx = context_for(pipeline_with_deploy("prod!"));

    let result = run(&create_only(Arc::new(store.clone())), &mut ctx).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with(PERSIST_ERROR_PREFIX));
    assert!(store.list_pipelines(PROJECT_ID).await.unwrap().is_empty());
    assert_eq!(store.environment_count().await, 0);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use pipeline_chain::persistence::SqlitePipelineStore;

    #[tokio::test]
    async fn test_sqlite_scenarios() {
        let store: Arc<dyn PipelineStore> =
            Arc::new(SqlitePipelineStore::new(":memory:").await.unwrap());

        let mut valid = context_for(pipeline_with_deploy("production"));
        let result = run(&create_only(store.clone()), &mut valid).await;
        assert!(result.success);

        let mut invalid = context_for(Pipeline::new(PROJECT_ID));
        let result = run(&create_only(store.clone()), &mut invalid).await;
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Failed to persist the pipeline"));

        let pipelines = store.list_pipelines(PROJECT_ID).await.unwrap();
        assert_eq!(pipelines.len(), 1);
        assert_eq!(pipelines[0].stage_count, 1);

        let environments = store.environments(PROJECT_ID).await.unwrap();
        assert_eq!(environments.len(), 1);
        assert_eq!(store.deployments(environments[0].id).await.unwrap().len(), 1);
    }
}
