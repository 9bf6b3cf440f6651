//! Log retrieval command handler

use deploy_tracker::TrackerContext;

pub async fn handle_logs_command(context: &TrackerContext, run_id: &str) -> anyhow::Result<()> {
    match context.orchestrator.get_run_logs(run_id).await {
        Ok(logs) if logs.trim().is_empty() => {
            println!("No logs available for run {}", run_id);
            Ok(())
        }
        Ok(logs) => {
            print!("{logs}");
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Failed to fetch logs for run {}: {}", run_id, e);
            if e.is_transient() {
                eprintln!("  The run source may be temporarily unavailable, try again shortly");
            }
            Err(e.into())
        }
    }
}
