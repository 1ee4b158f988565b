//! Persistence layer for pipeline graphs
//!
//! Every write goes through a [`StoreTransaction`]. Nothing written inside a
//! transaction is visible to readers until `commit`; dropping or rolling back
//! a transaction discards all of it.

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqlitePipelineStore;

use crate::core::{
    validate_environment_name, Build, Deployment, Environment, Pipeline, PipelineStatus,
    ValidationErrors,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Faults of the storage backend itself
#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Outcome of a failed write inside a transaction
#[derive(Debug, Error)]
pub enum PersistError {
    /// The entity did not pass validation; nothing should be kept
    #[error("{0}")]
    Invalid(#[from] ValidationErrors),

    /// The backend failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of a persisted pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub id: i64,
    pub project_id: i64,
    pub ref_name: String,
    pub sha: Option<String>,
    pub status: PipelineStatus,
    pub stage_count: usize,
    pub build_count: usize,
    pub created_at: DateTime<Utc>,
}

impl PipelineSummary {
    /// Summarize a persisted pipeline, `None` if it has no id yet
    pub fn from_pipeline(pipeline: &Pipeline) -> Option<Self> {
        Some(Self {
            id: pipeline.id?,
            project_id: pipeline.project_id,
            ref_name: pipeline.ref_name.clone().unwrap_or_default(),
            sha: pipeline.sha.clone(),
            status: pipeline.status,
            stage_count: pipeline.stages.len(),
            build_count: pipeline.builds().count(),
            created_at: pipeline.created_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Trait for persistence backends
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Open a write transaction
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Load a pipeline with its stages and builds
    async fn load_pipeline(&self, id: i64) -> Result<Option<Pipeline>, StoreError>;

    /// List persisted pipelines of a project, newest first
    async fn list_pipelines(&self, project_id: i64) -> Result<Vec<PipelineSummary>, StoreError>;

    /// List environments of a project
    async fn environments(&self, project_id: i64) -> Result<Vec<Environment>, StoreError>;

    /// List deployments to an environment
    async fn deployments(&self, environment_id: i64) -> Result<Vec<Deployment>, StoreError>;
}

/// A unit of work against a [`PipelineStore`]
#[async_trait]
pub trait StoreTransaction: Send {
    /// Validate and insert a pipeline with all its stages and builds.
    /// Returns a copy carrying the assigned ids.
    async fn save_with_children(&mut self, pipeline: &Pipeline) -> Result<Pipeline, PersistError>;

    /// Return the project's environment with this name, creating it if needed
    async fn find_or_create_environment(
        &mut self,
        project_id: i64,
        name: &str,
    ) -> Result<Environment, PersistError>;

    /// Link a saved build to an environment
    async fn create_deployment(
        &mut self,
        pipeline: &Pipeline,
        build: &Build,
        environment: &Environment,
    ) -> Result<Deployment, PersistError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    pipelines: BTreeMap<i64, Pipeline>,
    environments: Vec<Environment>,
    deployments: Vec<Deployment>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory persistence (for testing or ephemeral use)
///
/// Transactions hold the store lock until they finish, so they never
/// interleave.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of environments across all projects
    pub async fn environment_count(&self) -> usize {
        self.state.lock().await.environments.len()
    }

    /// Number of deployments across all projects
    pub async fn deployment_count(&self) -> usize {
        self.state.lock().await.deployments.len()
    }

    /// Number of stages across all pipelines
    pub async fn stage_count(&self) -> usize {
        self.state
            .lock()
            .await
            .pipelines
            .values()
            .map(|p| p.stages.len())
            .sum()
    }
}

#[async_trait]
impl PipelineStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTransaction { guard, working }))
    }

    async fn load_pipeline(&self, id: i64) -> Result<Option<Pipeline>, StoreError> {
        Ok(self.state.lock().await.pipelines.get(&id).cloned())
    }

    async fn list_pipelines(&self, project_id: i64) -> Result<Vec<PipelineSummary>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .pipelines
            .values()
            .rev()
            .filter(|p| p.project_id == project_id)
            .filter_map(PipelineSummary::from_pipeline)
            .collect())
    }

    async fn environments(&self, project_id: i64) -> Result<Vec<Environment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .environments
            .iter()
            .filter(|e| e.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn deployments(&self, environment_id: i64) -> Result<Vec<Deployment>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .deployments
            .iter()
            .filter(|d| d.environment_id == environment_id)
            .cloned()
            .collect())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn save_with_children(&mut self, pipeline: &Pipeline) -> Result<Pipeline, PersistError> {
        pipeline.validate()?;

        let mut saved = pipeline.clone();
        saved.id = Some(self.working.next_id());
        saved.created_at = Some(Utc::now());
        saved.stages.sort_by_key(|s| s.position);
        for stage in &mut saved.stages {
            stage.id = Some(self.working.next_id());
            for build in &mut stage.builds {
                build.id = Some(self.working.next_id());
            }
        }

        if let Some(id) = saved.id {
            self.working.pipelines.insert(id, saved.clone());
        }
        Ok(saved)
    }

    async fn find_or_create_environment(
        &mut self,
        project_id: i64,
        name: &str,
    ) -> Result<Environment, PersistError> {
        if let Some(existing) = self
            .working
            .environments
            .iter()
            .find(|e| e.project_id == project_id && e.name == name)
        {
            return Ok(existing.clone());
        }

        validate_environment_name(name)?;

        let environment = Environment {
            id: self.working.next_id(),
            project_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.working.environments.push(environment.clone());
        Ok(environment)
    }

    async fn create_deployment(
        &mut self,
        pipeline: &Pipeline,
        build: &Build,
        environment: &Environment,
    ) -> Result<Deployment, PersistError> {
        let build_id = build.id.ok_or_else(|| {
            StoreError::Integrity(format!("build {} has not been saved", build.name))
        })?;

        if self.working.deployments.iter().any(|d| d.build_id == build_id) {
            return Err(StoreError::Integrity(format!(
                "build {} already has a deployment",
                build_id
            ))
            .into());
        }

        let deployment = Deployment {
            id: self.working.next_id(),
            project_id: pipeline.project_id,
            environment_id: environment.id,
            build_id,
            ref_name: pipeline.ref_name.clone().unwrap_or_default(),
            sha: pipeline.sha.clone(),
            created_at: Utc::now(),
        };
        self.working.deployments.push(deployment.clone());
        Ok(deployment)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
