//! Test: Fatal faults - propagated out of the runner, never recorded

use crate::helpers::*;
use pipeline_chain::chain::steps::Create;
use pipeline_chain::chain::{BoxedStep, ChainError, ChainRunner};
use pipeline_chain::persistence::{PipelineStore, StoreError};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Test that a faulting step aborts the run with its error
#[tokio::test]
async fn test_step_fault_propagates() {
    let after = CountingStep::passing("after");
    let after_count = after.counter();
    let steps: Vec<BoxedStep> = vec![Box::new(FaultyStep), Box::new(after)];
    let mut ctx = context_for(pipeline_with_stage());

    let err = ChainRunner::new().run(&steps, &mut ctx).await.unwrap_err();

    assert!(matches!(err, ChainError::Step { step: "faulty", .. }));
    assert!(ctx.errors().is_empty());
    assert!(!ctx.is_stopped());
    assert_eq!(after_count.load(Ordering::SeqCst), 0);
}

/// Test that an unreachable store is a fault, not a recorded error
#[tokio::test]
async fn test_unavailable_store_is_fatal() {
    let steps: Vec<BoxedStep> = vec![Box::new(Create::new(Arc::new(UnavailableStore)))];
    let mut ctx = context_for(pipeline_with_stage());

    let err = ChainRunner::new().run(&steps, &mut ctx).await.unwrap_err();

    assert!(matches!(err, ChainError::Store(StoreError::Unavailable(_))));
    assert!(ctx.errors().is_empty());
    assert!(!ctx.pipeline.is_persisted());
}

/// Test that a fault halfway through the transaction leaves nothing behind
#[tokio::test]
async fn test_fault_during_deployment_rolls_back() {
    let store = DeploymentFaultStore::default();
    let steps: Vec<BoxedStep> = vec![Box::new(Create::new(Arc::new(store.clone())))];
    let mut ctx = context_for(pipeline_with_deploy("production"));

    let err = ChainRunner::new().run(&steps, &mut ctx).await.unwrap_err();

    assert!(matches!(err, ChainError::Store(_)));
    assert!(ctx.errors().is_empty());
    assert!(store.list_pipelines(PROJECT_ID).await.unwrap().is_empty());
    assert_eq!(store.inner.environment_count().await, 0);
    assert_eq!(store.inner.stage_count().await, 0);
}
