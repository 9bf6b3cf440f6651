//! Trigger command handler

use deploy_tracker::domain::Input;
use deploy_tracker::orchestration::TriggerOutcome;
use deploy_tracker::{TrackerContext, TriggerRequest};

pub async fn handle_trigger_command(
    context: &TrackerContext,
    workflow: &str,
    branch: &str,
    inputs: &[String],
) -> anyhow::Result<()> {
    let mut request = TriggerRequest::new(workflow, branch);
    for raw in inputs {
        let input = Input::parse_assignment(raw)?;
        request = request.with_input(input.key(), input.value());
    }

    let deployment = context.trigger.prepare(&request).await?;
    println!("Triggering deployment:");
    print!("{}", indent(&deployment.summary()));

    report_outcome(context.trigger.trigger(&request).await)
}

pub(crate) fn report_outcome(
    result: deploy_tracker::TrackerResult<TriggerOutcome>,
) -> anyhow::Result<()> {
    match result {
        Ok(outcome) => {
            println!("✓ Workflow dispatched");
            println!("  Run: {}", outcome.run);
            if !outcome.run.url().is_empty() {
                println!("  URL: {}", outcome.run.url());
            }
            println!("  Tracking as: {}", outcome.tracked.id());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Failed to trigger deployment: {}", e);
            Err(e.into())
        }
    }
}

pub(crate) fn indent(text: &str) -> String {
    text.lines().map(|line| format!("  {line}\n")).collect()
}
