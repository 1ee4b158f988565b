//! Chain runner - executes an ordered list of steps against one context

use crate::{
    chain::step::{BoxedStep, ChainError},
    core::ChainContext,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Events that can occur during a chain run
#[derive(Debug, Clone)]
pub enum ChainEvent {
    ChainStarted {
        run_id: Uuid,
        steps: usize,
    },
    StepStarted {
        step: &'static str,
    },
    StepCompleted {
        step: &'static str,
    },
    /// A step stopped the chain; later steps do not run
    ChainBroken {
        step: &'static str,
        errors: Vec<String>,
    },
    ChainCompleted {
        run_id: Uuid,
        success: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ChainEvent) + Send + Sync>;

/// Outcome of a chain run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// No errors were recorded and no step stopped the chain
    pub success: bool,

    /// Recorded errors, in order
    pub errors: Vec<String>,

    pub warnings: Vec<String>,

    /// Names of the steps that ran, in order
    pub executed: Vec<String>,

    /// Id of the persisted pipeline, if it was saved
    pub pipeline_id: Option<i64>,
}

impl RunResult {
    fn from_context(context: &ChainContext, executed: Vec<String>) -> Self {
        Self {
            success: !context.has_errors() && !context.is_stopped(),
            errors: context.errors().to_vec(),
            warnings: context.warnings().to_vec(),
            executed,
            pipeline_id: context.pipeline.id,
        }
    }
}

/// Runs steps strictly in the given order, one at a time
#[derive(Default)]
pub struct ChainRunner {
    event_handlers: Vec<EventHandler>,
}

impl ChainRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ChainEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ChainEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Run `steps` against `context`.
    ///
    /// Stops after the first step whose `should_stop` returns true. A step
    /// returning `Err` aborts the run and the error is returned as is.
    pub async fn run(
        &self,
        steps: &[BoxedStep],
        context: &mut ChainContext,
    ) -> Result<RunResult, ChainError> {
        let run_id = context.run_id;
        info!(%run_id, steps = steps.len(), "Starting pipeline chain");
        self.emit_event(ChainEvent::ChainStarted {
            run_id,
            steps: steps.len(),
        });

        let mut executed = Vec::with_capacity(steps.len());

        for step in steps {
            let name = step.name();
            debug!(%run_id, step = name, "Executing step");
            self.emit_event(ChainEvent::StepStarted { step: name });

            step.execute(context).await?;
            executed.push(name.to_string());

            if step.should_stop(context) {
                warn!(%run_id, step = name, errors = ?context.errors(), "Chain broken");
                self.emit_event(ChainEvent::ChainBroken {
                    step: name,
                    errors: context.errors().to_vec(),
                });
                break;
            }

            self.emit_event(ChainEvent::StepCompleted { step: name });
        }

        let result = RunResult::from_context(context, executed);
        info!(%run_id, success = result.success, "Pipeline chain finished");
        self.emit_event(ChainEvent::ChainCompleted {
            run_id,
            success: result.success,
        });

        Ok(result)
    }
}
