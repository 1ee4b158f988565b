//! CLI command definitions

use crate::core::PipelineSource;
use clap::Args;

/// Inputs shared by `create` and `validate`
#[derive(Debug, Args, Clone)]
pub struct RequestArgs {
    /// Path to pipeline definition YAML file
    #[arg(short, long)]
    pub file: String,

    /// Path to project YAML file (refs and members)
    #[arg(short, long)]
    pub project: String,

    /// Branch or tag to run for
    #[arg(short = 'r', long = "ref")]
    pub git_ref: String,

    /// Username of the member creating the pipeline
    #[arg(short, long)]
    pub user: Option<String>,

    /// Commit SHA
    #[arg(long)]
    pub sha: Option<String>,

    /// What triggered the pipeline
    #[arg(long, value_enum, default_value_t = SourceArg::Web)]
    pub source: SourceArg,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run the full chain and persist the pipeline
#[derive(Debug, Args, Clone)]
pub struct CreateCommand {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Keep the pipeline in memory only
    #[arg(long)]
    pub no_store: bool,
}

/// Run the validation steps only
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// List persisted pipelines
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Project to list pipelines for
    #[arg(long)]
    pub project_id: i64,

    /// Number of recent pipelines to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List environments
#[derive(Debug, Args, Clone)]
pub struct EnvironmentsCommand {
    /// Project to list environments for
    #[arg(long)]
    pub project_id: i64,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Pipeline source argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceArg {
    Push,
    Web,
    Trigger,
    Schedule,
    Api,
}

impl From<SourceArg> for PipelineSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Push => PipelineSource::Push,
            SourceArg::Web => PipelineSource::Web,
            SourceArg::Trigger => PipelineSource::Trigger,
            SourceArg::Schedule => PipelineSource::Schedule,
            SourceArg::Api => PipelineSource::Api,
        }
    }
}
