//! Environment and deployment models

use crate::core::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const MAX_NAME_LENGTH: usize = 255;

const NAME_FORMAT_MESSAGE: &str = "Name can contain only letters, digits, '-', '_', '/', '$', '{', '}', '.', and spaces, but it cannot start or end with '/'";

/// A named deployment target, unique per project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Links one build to the environment it deploys to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub project_id: i64,
    pub environment_id: i64,
    pub build_id: i64,
    pub ref_name: String,
    pub sha: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9 \-_/${}.]+$").expect("environment name pattern is valid")
    })
}

/// Validate an environment name before it is created
pub fn validate_environment_name(name: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if name.trim().is_empty() {
        errors.add("Name can't be blank");
        return errors.into_result();
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        errors.add(format!(
            "Name is too long (maximum is {} characters)",
            MAX_NAME_LENGTH
        ));
    }

    if !name_regex().is_match(name) || name.starts_with('/') || name.ends_with('/') {
        errors.add(NAME_FORMAT_MESSAGE);
    }

    errors.into_result()
}
