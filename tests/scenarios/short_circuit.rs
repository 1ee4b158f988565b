//! Test: Short circuit - a stopping step prevents every later step

use crate::helpers::*;
use async_trait::async_trait;
use pipeline_chain::chain::{BoxedStep, ChainError, Step};
use pipeline_chain::core::ChainContext;
use std::sync::atomic::Ordering;

/// Test that no step after the breaking one runs
#[tokio::test]
async fn test_steps_after_break_never_run() {
    let first = CountingStep::passing("first");
    let breaker = CountingStep::breaking("breaker");
    let last = CountingStep::passing("last");
    let (first_count, breaker_count, last_count) =
        (first.counter(), breaker.counter(), last.counter());

    let steps: Vec<BoxedStep> = vec![Box::new(first), Box::new(breaker), Box::new(last)];
    let mut ctx = context_for(pipeline_with_stage());

    let result = run(&steps, &mut ctx).await;

    assert_eq!(first_count.load(Ordering::SeqCst), 1);
    assert_eq!(breaker_count.load(Ordering::SeqCst), 1);
    assert_eq!(last_count.load(Ordering::SeqCst), 0);

    assert!(!result.success);
    assert_eq!(result.executed, vec!["first", "breaker"]);
    assert_eq!(result.errors, vec!["breaker stopped the chain".to_string()]);
}

/// Test that every step runs exactly once when nothing breaks
#[tokio::test]
async fn test_every_step_runs_once() {
    let steps: Vec<CountingStep> = (0..5).map(|_| CountingStep::passing("counting")).collect();
    let counters: Vec<_> = steps.iter().map(|s| s.counter()).collect();
    let steps: Vec<BoxedStep> = steps
        .into_iter()
        .map(|s| Box::new(s) as BoxedStep)
        .collect();

    let mut ctx = context_for(pipeline_with_stage());
    let result = run(&steps, &mut ctx).await;

    assert!(result.success);
    assert_eq!(result.executed.len(), 5);
    assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
}

/// A step may decide on its own when the chain should stop
struct StopsOnWarnings;

#[async_trait]
impl Step for StopsOnWarnings {
    fn name(&self) -> &'static str {
        "stops_on_warnings"
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        context.record_warning("pipeline looks odd");
        Ok(())
    }

    fn should_stop(&self, context: &ChainContext) -> bool {
        !context.warnings().is_empty()
    }
}

/// Test that an overridden should_stop is honored
#[tokio::test]
async fn test_custom_should_stop() {
    let after = CountingStep::passing("after");
    let after_count = after.counter();
    let steps: Vec<BoxedStep> = vec![Box::new(StopsOnWarnings), Box::new(after)];

    let mut ctx = context_for(pipeline_with_stage());
    let result = run(&steps, &mut ctx).await;

    assert_eq!(after_count.load(Ordering::SeqCst), 0);
    assert_eq!(result.executed, vec!["stops_on_warnings"]);
    // Nothing was recorded and the context was never marked stopped
    assert!(result.success);
    assert_eq!(result.warnings, vec!["pipeline looks odd".to_string()]);
}
