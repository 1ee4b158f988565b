//! Chain context - the pipeline under construction and what the steps report

use crate::core::{
    config::PipelineDefinition,
    pipeline::Pipeline,
    project::{Project, User},
    state::PipelineSource,
};
use uuid::Uuid;

/// Inputs of one pipeline creation request
#[derive(Debug, Clone)]
pub struct Command {
    /// Project the pipeline is created in
    pub project: Project,

    /// The initiating user
    pub current_user: Option<User>,

    /// Branch or tag as requested, possibly fully qualified (`refs/heads/...`)
    pub origin_ref: Option<String>,

    /// Commit to run for
    pub checkout_sha: Option<String>,

    pub source: PipelineSource,

    /// Stages and jobs to populate the pipeline with
    pub definition: Option<PipelineDefinition>,
}

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

impl Command {
    pub fn new(project: Project) -> Self {
        Self {
            project,
            current_user: None,
            origin_ref: None,
            checkout_sha: None,
            source: PipelineSource::default(),
            definition: None,
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.current_user = Some(user);
        self
    }

    pub fn with_ref(mut self, origin_ref: impl Into<String>) -> Self {
        self.origin_ref = Some(origin_ref.into());
        self
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.checkout_sha = Some(sha.into());
        self
    }

    pub fn with_source(mut self, source: PipelineSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_definition(mut self, definition: PipelineDefinition) -> Self {
        self.definition = Some(definition);
        self
    }

    /// The ref with any `refs/heads/` or `refs/tags/` prefix removed
    pub fn ref_name(&self) -> Option<&str> {
        self.origin_ref.as_deref().map(|r| {
            r.strip_prefix(BRANCH_PREFIX)
                .or_else(|| r.strip_prefix(TAG_PREFIX))
                .unwrap_or(r)
        })
    }

    /// Whether the origin ref was given as `refs/heads/...` or `refs/tags/...`
    pub fn is_qualified_ref(&self) -> bool {
        self.origin_ref
            .as_deref()
            .is_some_and(|r| r.starts_with(BRANCH_PREFIX) || r.starts_with(TAG_PREFIX))
    }

    pub fn branch_exists(&self) -> bool {
        match self.origin_ref.as_deref() {
            Some(r) if r.starts_with(TAG_PREFIX) => false,
            Some(_) => self
                .ref_name()
                .is_some_and(|name| self.project.branch_exists(name)),
            None => false,
        }
    }

    pub fn tag_exists(&self) -> bool {
        match self.origin_ref.as_deref() {
            Some(r) if r.starts_with(BRANCH_PREFIX) => false,
            Some(_) => self
                .ref_name()
                .is_some_and(|name| self.project.tag_exists(name)),
            None => false,
        }
    }

    /// The ref names both a branch and a tag and nothing disambiguates it
    pub fn ambiguous_ref(&self) -> bool {
        !self.is_qualified_ref() && self.branch_exists() && self.tag_exists()
    }
}

/// Mutable state shared by every step of one chain run
#[derive(Debug, Clone)]
pub struct ChainContext {
    /// Identifies this run in logs
    pub run_id: Uuid,

    /// The entity under construction
    pub pipeline: Pipeline,

    pub command: Command,

    errors: Vec<String>,
    warnings: Vec<String>,
    stopped: bool,
}

impl ChainContext {
    /// Create a context for a pipeline and the command that requested it
    pub fn new(pipeline: Pipeline, command: Command) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline,
            command,
            errors: Vec::new(),
            warnings: Vec::new(),
            stopped: false,
        }
    }

    /// Start from an empty pipeline for the command's project
    pub fn for_command(command: Command) -> Self {
        let pipeline = Pipeline::new(command.project.id);
        Self::new(pipeline, command)
    }

    /// Record an error; does not stop the chain on its own
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a warning; warnings never affect success
    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Ask the runner to stop after the current step
    pub fn mark_stopped(&mut self) {
        self.stopped = true;
    }

    /// Record an error and stop the chain
    pub fn break_with(&mut self, message: impl Into<String>) {
        self.record_error(message);
        self.mark_stopped();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
