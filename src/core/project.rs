//! Project and user models
//!
//! The chain does not manage projects or users, it only reads them: which
//! refs exist, and how much access the current user has.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Access level of a project member, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Guest,
    Reporter,
    Developer,
    Maintainer,
    Owner,
}

/// A user acting on a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// A project membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: i64,
    pub username: String,
    pub access_level: AccessLevel,
}

impl Member {
    pub fn user(&self) -> User {
        User::new(self.user_id, self.username.clone())
    }
}

/// A project with its repository refs and members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,

    /// Full path, e.g. `group/app`
    pub path: String,

    #[serde(default)]
    pub branches: Vec<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub members: Vec<Member>,
}

impl Project {
    pub fn new(id: i64, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            branches: Vec::new(),
            tags: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn with_branch(mut self, name: impl Into<String>) -> Self {
        self.branches.push(name.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.tags.push(name.into());
        self
    }

    pub fn with_member(mut self, user: &User, access_level: AccessLevel) -> Self {
        self.members.push(Member {
            user_id: user.id,
            username: user.username.clone(),
            access_level,
        });
        self
    }

    /// Load a project description from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let project: Project = serde_yaml::from_str(yaml)?;
        if project.path.trim().is_empty() {
            anyhow::bail!("Project {} has an empty path", project.id);
        }
        Ok(project)
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        self.branches.iter().any(|b| b == name)
    }

    pub fn tag_exists(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t == name)
    }

    pub fn find_member(&self, username: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.username == username)
    }

    pub fn access_level_for(&self, user: &User) -> Option<AccessLevel> {
        self.members
            .iter()
            .find(|m| m.user_id == user.id)
            .map(|m| m.access_level)
    }

    /// Developers and above may create pipelines
    pub fn can_create_pipeline(&self, user: &User) -> bool {
        self.access_level_for(user)
            .is_some_and(|level| level >= AccessLevel::Developer)
    }
}
