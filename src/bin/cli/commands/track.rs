//! Track and dismiss command handlers

use deploy_tracker::{TrackerContext, Workflow};

pub async fn handle_track_command(
    context: &TrackerContext,
    run_id: &str,
    workflow: &str,
    branch: &str,
    repo: Option<&str>,
) -> anyhow::Result<()> {
    let workflow = Workflow::new(workflow)?;
    let repo = repo.unwrap_or(&context.config.gateway.repo);

    match context
        .orchestrator
        .track_deployment(run_id, workflow, branch, repo)
        .await
    {
        Ok(td) => {
            println!("✓ Tracking run {}", td.run_id());
            println!("  Workflow: {}", td.workflow());
            println!("  Branch: {}", td.branch());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Failed to track run: {}", e);
            Err(e.into())
        }
    }
}

pub async fn handle_dismiss_command(context: &TrackerContext, id: &str) -> anyhow::Result<()> {
    match context.orchestrator.dismiss_tracked(id).await {
        Ok(()) => {
            println!("✓ No longer tracking {}", id);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Failed to dismiss deployment: {}", e);
            Err(e.into())
        }
    }
}
