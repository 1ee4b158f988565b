//! Pipeline definition from YAML

use crate::core::state::BuildStatus;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Stages used when a definition declares none
pub const DEFAULT_STAGES: [&str; 3] = ["build", "test", "deploy"];

/// Stage a job lands in when it names none
pub const DEFAULT_JOB_STAGE: &str = "test";

/// Top-level pipeline definition loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Ordered stage names
    #[serde(default = "default_stages")]
    pub stages: Vec<String>,

    /// Jobs, in declaration order
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// Job configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Unique job name
    pub name: String,

    /// Stage this job belongs to
    #[serde(default = "default_job_stage")]
    pub stage: String,

    /// Environment the job deploys to
    #[serde(default)]
    pub environment: Option<String>,

    /// When the job runs
    #[serde(default)]
    pub when: When,
}

/// When a job is started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum When {
    #[default]
    OnSuccess,
    Manual,
}

impl When {
    /// Initial status of a build created for this job
    pub fn initial_status(&self) -> BuildStatus {
        match self {
            When::OnSuccess => BuildStatus::Created,
            When::Manual => BuildStatus::Manual,
        }
    }
}

fn default_stages() -> Vec<String> {
    DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
}

fn default_job_stage() -> String {
    DEFAULT_JOB_STAGE.to_string()
}

impl PipelineDefinition {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let definition: PipelineDefinition = serde_yaml::from_str(yaml)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Validate the definition
    pub fn validate(&self) -> Result<()> {
        let mut seen_stages = HashSet::new();
        for stage in &self.stages {
            if stage.trim().is_empty() {
                anyhow::bail!("Stage names can't be blank");
            }
            if !seen_stages.insert(stage.as_str()) {
                anyhow::bail!("Duplicate stage: {}", stage);
            }
        }

        let mut seen_jobs = HashSet::new();
        for job in &self.jobs {
            if job.name.trim().is_empty() {
                anyhow::bail!("Job names can't be blank");
            }
            if !seen_jobs.insert(job.name.as_str()) {
                anyhow::bail!("Duplicate job name: {}", job.name);
            }
            if !seen_stages.contains(job.stage.as_str()) {
                anyhow::bail!(
                    "Job '{}' uses stage '{}' which is not declared in stages",
                    job.name,
                    job.stage
                );
            }
        }

        Ok(())
    }

    /// Jobs of a stage, in declaration order
    pub fn jobs_for_stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a JobConfig> {
        self.jobs.iter().filter(move |job| job.stage == stage)
    }
}
