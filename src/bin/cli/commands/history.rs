//! Deployment history and workflow discovery handlers

use deploy_tracker::TrackerContext;

use super::trigger::{indent, report_outcome};
use crate::cli::render;

pub async fn handle_replay_command(context: &TrackerContext, id: Option<&str>) -> anyhow::Result<()> {
    let entry = match id {
        Some(id) => context.trigger.recent(usize::MAX).await?.into_iter().find(|e| e.id == id),
        None => context.trigger.recent(1).await?.into_iter().next(),
    };
    if let Some(entry) = &entry {
        println!("Replaying deployment:");
        print!("{}", indent(&render::history_summary(entry)));
    }

    report_outcome(context.trigger.replay(id).await)
}

pub async fn handle_history_command(
    context: &TrackerContext,
    limit: usize,
    json: bool,
) -> anyhow::Result<()> {
    let entries = context.trigger.recent(limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        render::print_history(&entries);
    }
    Ok(())
}

pub async fn handle_workflows_command(
    context: &TrackerContext,
    workflow: Option<&str>,
    git_ref: &str,
) -> anyhow::Result<()> {
    let Some(workflow) = workflow else {
        let workflows = context.trigger.list_workflows().await?;
        if workflows.is_empty() {
            println!("No active workflows");
        }
        for workflow in workflows {
            println!("  {workflow}");
        }
        return Ok(());
    };

    match context.trigger.workflow_inputs(workflow, git_ref).await? {
        Some(inputs) => render::print_inputs(workflow, &inputs),
        None => println!("Workflow {workflow} not found"),
    }
    Ok(())
}
