use anyhow::{Context, Result};
use pipeline_chain::chain::{self, BoxedStep, ChainEvent, ChainRunner, RunResult};
use pipeline_chain::cli::commands::{
    CreateCommand, EnvironmentsCommand, ListCommand, RequestArgs, ValidateCommand,
};
use pipeline_chain::cli::output::*;
use pipeline_chain::cli::{Cli, Command};
use pipeline_chain::core::config::PipelineDefinition;
use pipeline_chain::core::{ChainContext, Command as ChainCommand, Project};
use pipeline_chain::persistence::{InMemoryStore, PipelineStore};
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Create(cmd) => create_pipeline(cmd, &cli).await?,
        Command::Validate(cmd) => validate_pipeline(cmd).await?,
        Command::List(cmd) => list_pipelines(cmd, &cli).await?,
        Command::Environments(cmd) => list_environments(cmd, &cli).await?,
    }

    Ok(())
}

/// Build the chain context from the request files and flags
fn load_context(request: &RequestArgs) -> Result<ChainContext> {
    let definition = PipelineDefinition::from_file(&request.file)
        .with_context(|| format!("Failed to load pipeline definition {}", request.file))?;
    let project = Project::from_file(&request.project)
        .with_context(|| format!("Failed to load project {}", request.project))?;

    let mut command = ChainCommand::new(project)
        .with_ref(request.git_ref.clone())
        .with_source(request.source.into())
        .with_definition(definition);

    if let Some(username) = &request.user {
        let member = command
            .project
            .find_member(username)
            .with_context(|| {
                format!("User '{}' is not a member of {}", username, command.project.path)
            })?;
        let user = member.user();
        command = command.with_user(user);
    }
    if let Some(sha) = &request.sha {
        command = command.with_sha(sha.clone());
    }

    Ok(ChainContext::for_command(command))
}

/// Open the store selected by the global flags
async fn open_store(cli: &Cli, ephemeral: bool) -> Result<Arc<dyn PipelineStore>> {
    if ephemeral {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    #[cfg(feature = "sqlite")]
    {
        use pipeline_chain::persistence::SqlitePipelineStore;

        let store = match &cli.db {
            Some(path) => SqlitePipelineStore::new(path)
                .await
                .with_context(|| format!("Failed to open database {}", path))?,
            None => SqlitePipelineStore::with_default_path().await?,
        };
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = cli;
        tracing::warn!("Built without SQLite support, pipelines are kept in memory");
        Ok(Arc::new(InMemoryStore::new()))
    }
}

/// Run a chain with a progress bar and event output
async fn run_chain(steps: &[BoxedStep], context: &mut ChainContext) -> Result<RunResult> {
    let progress = create_progress_bar(steps.len());

    let mut runner = ChainRunner::new();
    let bar = progress.clone();
    runner.add_event_handler(move |event| {
        bar.println(format_chain_event(event));
        match event {
            ChainEvent::StepStarted { step } => bar.set_message(step.to_string()),
            ChainEvent::StepCompleted { .. } | ChainEvent::ChainBroken { .. } => bar.inc(1),
            _ => {}
        }
    });

    let result = runner.run(steps, context).await;
    progress.finish_and_clear();

    Ok(result?)
}

fn print_result(result: &RunResult, context: &ChainContext, json: bool) -> Result<()> {
    if json {
        let data = serde_json::json!({
            "result": result,
            "pipeline": context.pipeline,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("\n{}", format_run_result(result));
    if result.success && !context.pipeline.stages.is_empty() {
        println!("{}", format_pipeline(&context.pipeline));
    }
    Ok(())
}

async fn create_pipeline(cmd: &CreateCommand, cli: &Cli) -> Result<()> {
    let mut context = load_context(&cmd.request)?;
    let store = open_store(cli, cmd.no_store).await?;

    if let Some(banner) =
        format_request_banner("Creating", &context.command.project.path, &cmd.request)
    {
        println!("{}", banner);
    }

    let steps = chain::create_sequence(store);
    let result = run_chain(&steps, &mut context).await?;
    print_result(&result, &context, cmd.request.json)?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}

async fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    let mut context = load_context(&cmd.request)?;
    if let Some(banner) =
        format_request_banner("Validating", &context.command.project.path, &cmd.request)
    {
        println!("{}", banner);
    }

    let steps = chain::validate_sequence();
    let result = run_chain(&steps, &mut context).await?;
    print_result(&result, &context, cmd.request.json)?;

    if !result.success {
        std::process::exit(1);
    }

    Ok(())
}

async fn list_pipelines(cmd: &ListCommand, cli: &Cli) -> Result<()> {
    let store = open_store(cli, false).await?;
    let pipelines: Vec<_> = store
        .list_pipelines(cmd.project_id)
        .await?
        .into_iter()
        .take(cmd.limit)
        .collect();

    if cmd.json {
        let data = serde_json::json!({ "pipelines": pipelines });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if pipelines.is_empty() {
        println!("{} No pipelines found for project {}", INFO, cmd.project_id);
        return Ok(());
    }

    println!(
        "{} Pipelines of project {} (showing latest {}):",
        INFO, cmd.project_id, cmd.limit
    );
    for summary in &pipelines {
        println!("  {}", format_pipeline_summary(summary));
    }

    Ok(())
}

async fn list_environments(cmd: &EnvironmentsCommand, cli: &Cli) -> Result<()> {
    let store = open_store(cli, false).await?;
    let environments = store.environments(cmd.project_id).await?;

    let mut rows = Vec::with_capacity(environments.len());
    for environment in &environments {
        let deployments = store.deployments(environment.id).await?;
        debug!(environment = %environment.name, count = deployments.len(), "Loaded deployments");
        rows.push((environment, deployments.len()));
    }

    if cmd.json {
        let data: Vec<_> = rows
            .iter()
            .map(|(env, count)| serde_json::json!({ "environment": env, "deployments": count }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "environments": data }))?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("{} No environments found for project {}", INFO, cmd.project_id);
        return Ok(());
    }

    println!("{} Environments of project {}:", INFO, cmd.project_id);
    for (environment, deployments) in &rows {
        println!("{}", format_environment(environment, *deployments));
    }

    Ok(())
}
