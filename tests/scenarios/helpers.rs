//! Test utility functions for pipeline-chain

use async_trait::async_trait;
use pipeline_chain::chain::{BoxedStep, ChainError, ChainRunner, RunResult, Step};
use pipeline_chain::core::config::PipelineDefinition;
use pipeline_chain::core::{
    AccessLevel, Build, ChainContext, Command, Deployment, Environment, Pipeline, Project, Stage,
    User,
};
use pipeline_chain::persistence::{
    InMemoryStore, PersistError, PipelineStore, PipelineSummary, StoreError, StoreTransaction,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PROJECT_ID: i64 = 1;

pub fn developer() -> User {
    User::new(10, "dev")
}

pub fn guest() -> User {
    User::new(11, "guest")
}

pub fn project() -> Project {
    Project::new(PROJECT_ID, "group/app")
        .with_branch("master")
        .with_branch("feature")
        .with_tag("v1.0")
        .with_member(&developer(), AccessLevel::Developer)
        .with_member(&guest(), AccessLevel::Guest)
}

pub fn command() -> Command {
    Command::new(project())
}

/// Context around a pre-built pipeline
pub fn context_for(pipeline: Pipeline) -> ChainContext {
    ChainContext::new(pipeline, command())
}

/// Valid pipeline with one stage
pub fn pipeline_with_stage() -> Pipeline {
    Pipeline::for_ref(PROJECT_ID, "master").with_stage(Stage::new("test", 0, PROJECT_ID))
}

/// Valid pipeline with one stage and one build deploying to `environment`
pub fn pipeline_with_deploy(environment: &str) -> Pipeline {
    Pipeline::for_ref(PROJECT_ID, "master").with_stage(
        Stage::new("test", 0, PROJECT_ID)
            .with_build(Build::new("deploy").with_environment(environment)),
    )
}

pub fn definition(yaml: &str) -> PipelineDefinition {
    PipelineDefinition::from_yaml(yaml).expect("definition should parse")
}

/// Run steps with a plain runner
pub async fn run(steps: &[BoxedStep], context: &mut ChainContext) -> RunResult {
    ChainRunner::new()
        .run(steps, context)
        .await
        .expect("chain should not fault")
}

/// Step double that counts its executions and optionally stops the chain
pub struct CountingStep {
    name: &'static str,
    counter: Arc<AtomicUsize>,
    stop: bool,
}

impl CountingStep {
    pub fn passing(name: &'static str) -> Self {
        Self {
            name,
            counter: Arc::new(AtomicUsize::new(0)),
            stop: false,
        }
    }

    pub fn breaking(name: &'static str) -> Self {
        Self {
            stop: true,
            ..Self::passing(name)
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.counter.clone()
    }
}

#[async_trait]
impl Step for CountingStep {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn execute(&self, context: &mut ChainContext) -> Result<(), ChainError> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        if self.stop {
            context.break_with(format!("{} stopped the chain", self.name));
        }
        Ok(())
    }
}

/// Step double that raises a fault
pub struct FaultyStep;

#[async_trait]
impl Step for FaultyStep {
    fn name(&self) -> &'static str {
        "faulty"
    }

    async fn execute(&self, _context: &mut ChainContext) -> Result<(), ChainError> {
        Err(ChainError::Step {
            step: "faulty",
            message: "disk on fire".to_string(),
        })
    }
}

/// Store that cannot be reached
pub struct UnavailableStore;

#[async_trait]
impl PipelineStore for UnavailableStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn load_pipeline(&self, _id: i64) -> Result<Option<Pipeline>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn list_pipelines(&self, _project_id: i64) -> Result<Vec<PipelineSummary>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn environments(&self, _project_id: i64) -> Result<Vec<Environment>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn deployments(&self, _environment_id: i64) -> Result<Vec<Deployment>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// In-memory store whose transactions fault when creating a deployment
#[derive(Clone, Default)]
pub struct DeploymentFaultStore {
    pub inner: InMemoryStore,
}

struct DeploymentFaultTransaction {
    inner: Box<dyn StoreTransaction>,
}

#[async_trait]
impl PipelineStore for DeploymentFaultStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(DeploymentFaultTransaction { inner }))
    }

    async fn load_pipeline(&self, id: i64) -> Result<Option<Pipeline>, StoreError> {
        self.inner.load_pipeline(id).await
    }

    async fn list_pipelines(&self, project_id: i64) -> Result<Vec<PipelineSummary>, StoreError> {
        self.inner.list_pipelines(project_id).await
    }

    async fn environments(&self, project_id: i64) -> Result<Vec<Environment>, StoreError> {
        self.inner.environments(project_id).await
    }

    async fn deployments(&self, environment_id: i64) -> Result<Vec<Deployment>, StoreError> {
        self.inner.deployments(environment_id).await
    }
}

#[async_trait]
impl StoreTransaction for DeploymentFaultTransaction {
    async fn save_with_children(&mut self, pipeline: &Pipeline) -> Result<Pipeline, PersistError> {
        self.inner.save_with_children(pipeline).await
    }

    async fn find_or_create_environment(
        &mut self,
        project_id: i64,
        name: &str,
    ) -> Result<Environment, PersistError> {
        self.inner.find_or_create_environment(project_id, name).await
    }

    async fn create_deployment(
        &mut self,
        _pipeline: &Pipeline,
        _build: &Build,
        _environment: &Environment,
    ) -> Result<Deployment, PersistError> {
        Err(StoreError::Unavailable("lost connection mid-transaction".to_string()).into())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollback().await
    }
}
