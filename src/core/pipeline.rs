//! Pipeline domain model
//!
//! A pipeline owns its stages, and every stage owns its builds. The whole
//! graph is saved in one go by the persistence layer.

use crate::core::{
    state::{BuildStatus, PipelineSource, PipelineStatus},
    validation::ValidationErrors,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A CI pipeline (aggregate root)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Store-assigned id, `None` until persisted
    pub id: Option<i64>,

    pub project_id: i64,

    /// Branch or tag name the pipeline runs for
    pub ref_name: Option<String>,

    /// Commit the pipeline runs for
    pub sha: Option<String>,

    /// Whether `ref_name` names a tag
    pub tag: bool,

    pub source: PipelineSource,

    pub status: PipelineStatus,

    /// User who triggered the pipeline
    pub user_id: Option<i64>,

    /// Stages in position order
    pub stages: Vec<Stage>,

    pub created_at: Option<DateTime<Utc>>,
}

/// An ordered phase within a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Option<i64>,
    pub name: String,

    /// Unique per pipeline, defines execution order
    pub position: i32,

    pub project_id: i64,
    pub builds: Vec<Build>,
}

/// A job inside a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: Option<i64>,
    pub name: String,

    /// Name of the environment this build deploys to
    pub environment: Option<String>,

    pub status: BuildStatus,
}

impl Pipeline {
    /// Create an empty, unsaved pipeline for a project
    pub fn new(project_id: i64) -> Self {
        Self {
            id: None,
            project_id,
            ref_name: None,
            sha: None,
            tag: false,
            source: PipelineSource::default(),
            status: PipelineStatus::default(),
            user_id: None,
            stages: Vec::new(),
            created_at: None,
        }
    }

    /// Create an unsaved pipeline for a ref
    pub fn for_ref(project_id: i64, ref_name: impl Into<String>) -> Self {
        let mut pipeline = Self::new(project_id);
        pipeline.ref_name = Some(ref_name.into());
        pipeline
    }

    /// Append a stage
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Build a new in-memory stage and return it for further setup
    pub fn build_stage(&mut self, name: impl Into<String>, position: i32) -> &mut Stage {
        let stage = Stage::new(name, position, self.project_id);
        self.stages.push(stage);
        let last = self.stages.len() - 1;
        &mut self.stages[last]
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// All builds across stages, in stage order
    pub fn builds(&self) -> impl Iterator<Item = &Build> {
        self.stages.iter().flat_map(|s| s.builds.iter())
    }

    /// Builds that deploy to a named environment
    pub fn builds_with_environment(&self) -> impl Iterator<Item = &Build> {
        self.builds().filter(|b| b.has_environment())
    }

    /// Entity-level validation, run by the store before anything is written
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self
            .ref_name
            .as_deref()
            .map_or(true, |r| r.trim().is_empty())
        {
            errors.add("Ref can't be blank");
        }

        let mut positions = HashSet::new();
        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                errors.add("Stages name can't be blank");
            }
            if !positions.insert(stage.position) {
                errors.add(format!(
                    "Stages position {} has already been taken",
                    stage.position
                ));
            }
            if stage.builds.iter().any(|b| b.name.trim().is_empty()) {
                errors.add("Builds name can't be blank");
            }
        }

        errors.into_result()
    }
}

impl Stage {
    pub fn new(name: impl Into<String>, position: i32, project_id: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            position,
            project_id,
            builds: Vec::new(),
        }
    }

    pub fn with_build(mut self, build: Build) -> Self {
        self.builds.push(build);
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl Build {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            environment: None,
            status: BuildStatus::default(),
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// The environment name, if one is set and not blank
    pub fn environment_name(&self) -> Option<&str> {
        self.environment
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn has_environment(&self) -> bool {
        self.environment_name().is_some()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}
