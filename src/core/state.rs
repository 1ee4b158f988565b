//! Status and source models
//!
//! Only the states a freshly constructed pipeline can be in. Transitions
//! after construction belong to job execution.

use serde::{Deserialize, Serialize};

/// Overall pipeline status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Pipeline has been built but no job was picked up yet
    #[default]
    Created,
}

impl PipelineStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Created => "created",
        }
    }

    /// Parse the database representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(PipelineStatus::Created),
            _ => None,
        }
    }
}

/// Initial state of a single build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Created,
    /// Waits for someone to start it
    Manual,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Created => "created",
            BuildStatus::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(BuildStatus::Created),
            "manual" => Some(BuildStatus::Manual),
            _ => None,
        }
    }
}

/// What triggered the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineSource {
    #[default]
    Push,
    Web,
    Trigger,
    Schedule,
    Api,
}

impl PipelineSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineSource::Push => "push",
            PipelineSource::Web => "web",
            PipelineSource::Trigger => "trigger",
            PipelineSource::Schedule => "schedule",
            PipelineSource::Api => "api",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "push" => Some(PipelineSource::Push),
            "web" => Some(PipelineSource::Web),
            "trigger" => Some(PipelineSource::Trigger),
            "schedule" => Some(PipelineSource::Schedule),
            "api" => Some(PipelineSource::Api),
            _ => None,
        }
    }
}
