//! Status, dashboard and garbage collection command handlers

use anyhow::Context;
use deploy_tracker::{TrackedDeployment, TrackerContext};
use std::io::Write;
use std::time::Duration;
use tracing::debug;

use crate::cli::render;

pub async fn handle_status_command(
    context: &TrackerContext,
    active_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let tracked = if active_only {
        context.orchestrator.list_active().await
    } else {
        context.orchestrator.list_tracked().await
    };

    let tracked = match tracked {
        Ok(tracked) => tracked,
        Err(e) => {
            eprintln!("✗ Failed to list tracked deployments: {}", e);
            return Err(e.into());
        }
    };

    print_listing(&tracked, json)
}

pub async fn handle_watch_command(
    context: &TrackerContext,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let interval = Duration::from_secs(
        interval
            .unwrap_or(context.config.dashboard.refresh_interval_secs)
            .max(1),
    );
    let mut stdout = std::io::stdout();

    loop {
        print!("⟳ Refreshing...\r");
        stdout.flush().ok();

        // A refresh may take seconds per active run; Ctrl-C must not wait for it
        let tracked = tokio::select! {
            result = context.orchestrator.list_tracked() => result,
            _ = tokio::signal::ctrl_c() => break,
        };

        // Clear the screen and move the cursor home
        print!("\x1B[2J\x1B[H");
        println!(
            "Tracked deployments (every {}s, Ctrl-C to exit)  {}",
            interval.as_secs(),
            chrono::Local::now().format("%H:%M:%S")
        );
        println!();
        match tracked {
            Ok(tracked) => render::print_table(&tracked),
            Err(e) => eprintln!("✗ Failed to list tracked deployments: {}", e),
        }
        stdout.flush().ok();

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    debug!("Dashboard stopped");
    println!();
    Ok(())
}

pub async fn handle_show_command(
    context: &TrackerContext,
    id: &str,
    json: bool,
) -> anyhow::Result<()> {
    match context.orchestrator.get_tracked(id).await {
        Ok(Some(td)) => {
            if json {
                print_listing(std::slice::from_ref(&td), true)
            } else {
                render::print_details(&td);
                Ok(())
            }
        }
        Ok(None) => {
            eprintln!("✗ Deployment {} is not tracked", id);
            anyhow::bail!("deployment {id} is not tracked")
        }
        Err(e) => {
            eprintln!("✗ Failed to get deployment: {}", e);
            Err(e.into())
        }
    }
}

pub async fn handle_prune_command(context: &TrackerContext) -> anyhow::Result<()> {
    match context.orchestrator.cleanup_stale().await {
        Ok(removed) => {
            println!(
                "✓ Removed {} stale deployment(s) older than {}",
                removed,
                render::format_elapsed(context.orchestrator.settings().retention)
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Failed to prune deployments: {}", e);
            Err(e.into())
        }
    }
}

fn print_listing(tracked: &[TrackedDeployment], json: bool) -> anyhow::Result<()> {
    if json {
        let rendered = render::to_json(tracked).context("Failed to serialize deployments")?;
        println!("{rendered}");
    } else {
        render::print_table(tracked);
    }
    Ok(())
}
