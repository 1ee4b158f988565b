//! CLI output formatting

use crate::{
    chain::{ChainEvent, RunResult},
    cli::commands::RequestArgs,
    core::{Environment, Pipeline, PipelineStatus},
    persistence::PipelineSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over the steps of a chain
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(template) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(template.progress_chars("#>-"));
    }
    progress
}

/// Format a pipeline status for display
pub fn format_status(status: PipelineStatus) -> String {
    match status {
        PipelineStatus::Created => style("CREATED").dim().to_string(),
    }
}

/// Line announcing a create or validate run, `None` when printing JSON
pub fn format_request_banner(
    action: &str,
    project_path: &str,
    request: &RequestArgs,
) -> Option<String> {
    if request.json {
        return None;
    }
    Some(format!(
        "{} {} pipeline for {} on {}",
        INFO,
        action,
        style(project_path).bold(),
        style(&request.git_ref).cyan()
    ))
}

/// Format a chain event for display
pub fn format_chain_event(event: &ChainEvent) -> String {
    match event {
        ChainEvent::ChainStarted { run_id, steps } => format!(
            "{} Running {} steps ({})",
            ROCKET,
            style(steps).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ChainEvent::StepStarted { step } => format!("{} {}", SPINNER, style(step).cyan()),
        ChainEvent::StepCompleted { step } => format!("{} {}", CHECK, style(step).green()),
        ChainEvent::ChainBroken { step, errors } => format!(
            "{} {}: {}",
            CROSS,
            style(step).red(),
            style(errors.join("; ")).dim()
        ),
        ChainEvent::ChainCompleted { run_id, success } => {
            let status = if *success {
                style("succeeded").green().to_string()
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Chain ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status
            )
        }
    }
}

/// Format the outcome of a chain run
pub fn format_run_result(result: &RunResult) -> String {
    let mut lines = Vec::new();

    if result.success {
        match result.pipeline_id {
            Some(id) => lines.push(format!(
                "{} Pipeline {} created",
                CHECK,
                style(format!("#{}", id)).bold()
            )),
            None => lines.push(format!("{} Pipeline is valid", CHECK)),
        }
    } else {
        lines.push(format!("{} {}", CROSS, style("Pipeline was not created").red()));
        for error in &result.errors {
            lines.push(format!("  {}", style(error).red()));
        }
    }

    for warning in &result.warnings {
        lines.push(format!("{} {}", WARN, style(warning).yellow()));
    }

    lines.join("\n")
}

/// Format the stages and builds of a pipeline
pub fn format_pipeline(pipeline: &Pipeline) -> String {
    let mut lines = Vec::new();
    for stage in &pipeline.stages {
        lines.push(format!(
            "  {} {}",
            style(format!("[{}]", stage.position)).dim(),
            style(&stage.name).bold()
        ));
        for build in &stage.builds {
            match build.environment_name() {
                Some(env) => lines.push(format!(
                    "      {} → {}",
                    build.name,
                    style(env).cyan()
                )),
                None => lines.push(format!("      {}", build.name)),
            }
        }
    }
    lines.join("\n")
}

/// Format a persisted pipeline summary
pub fn format_pipeline_summary(summary: &PipelineSummary) -> String {
    format!(
        "{} {} - {} - {} ({} stages, {} builds) - {}",
        INFO,
        style(format!("#{}", summary.id)).bold(),
        style(&summary.ref_name).cyan(),
        format_status(summary.status),
        summary.stage_count,
        summary.build_count,
        style(summary.created_at.to_rfc3339()).dim()
    )
}

/// Format an environment
pub fn format_environment(environment: &Environment, deployments: usize) -> String {
    format!(
        "  {} ({} deployments)",
        style(&environment.name).bold(),
        style(deployments).cyan()
    )
}
