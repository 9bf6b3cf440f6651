mod common;

use common::{active_since, completed_ago, ScriptedGateway};
use deploy_tracker::domain::{Run, RunConclusion, RunStatus, Workflow};
use deploy_tracker::gateway::{GatewayError, ResilientGateway, RetryPolicy, RunGateway};
use deploy_tracker::orchestration::{ReconcileSettings, StatusOrchestrator};
use deploy_tracker::resilience::{CircuitBreakerConfig, CircuitState};
use deploy_tracker::store::{InMemoryTrackerStore, TrackerStore};
use std::sync::Arc;
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

fn setup_with(
    settings: ReconcileSettings,
) -> (Arc<InMemoryTrackerStore>, Arc<ScriptedGateway>, StatusOrchestrator) {
    let store = Arc::new(InMemoryTrackerStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    let orchestrator = StatusOrchestrator::with_settings(store.clone(), gateway.clone(), settings);
    (store, gateway, orchestrator)
}

fn setup() -> (Arc<InMemoryTrackerStore>, Arc<ScriptedGateway>, StatusOrchestrator) {
    setup_with(ReconcileSettings::default())
}

fn workflow() -> Workflow {
    Workflow::new("deploy.yml").unwrap()
}

#[tokio::test]
async fn test_refresh_preserves_record_on_gateway_failure() {
    let (store, gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("100", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    let before = store.get_by_id("100").await.unwrap().unwrap();
    gateway.fail("100");

    let listed = orchestrator.list_tracked().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], before);
    assert_eq!(store.get_by_id("100").await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_refresh_timeout_is_treated_as_failure() {
    let (store, gateway, orchestrator) = setup_with(ReconcileSettings {
        gateway_timeout: Duration::from_millis(50),
        ..ReconcileSettings::default()
    });
    orchestrator
        .track_deployment("101", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    gateway.hang("101");

    let listed = orchestrator.list_tracked().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_active());

    let fetched = orchestrator.get_tracked("101").await.unwrap().unwrap();
    assert_eq!(fetched.status(), RunStatus::Queued);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_one_failing_record_does_not_block_others() {
    let (_store, gateway, orchestrator) = setup();
    for id in ["1", "2", "3"] {
        orchestrator
            .track_deployment(id, workflow(), "main", "owner/repo")
            .await
            .unwrap();
    }
    gateway.fail("2");
    gateway.report_status("1", RunStatus::InProgress);
    gateway.report_conclusion("3", RunConclusion::Cancelled);

    let listed = orchestrator.list_tracked().await.unwrap();
    let by_id = |id: &str| listed.iter().find(|td| td.id() == id).unwrap().clone();

    assert_eq!(by_id("1").status(), RunStatus::InProgress);
    assert_eq!(by_id("2").status(), RunStatus::Queued);
    assert!(by_id("3").is_cancelled());
}

#[tokio::test]
async fn test_completed_records_are_not_polled() {
    let (store, gateway, orchestrator) = setup();
    store.save(&completed_ago("200", Duration::from_secs(60))).await.unwrap();
    store.save(&active_since("201", Duration::from_secs(60))).await.unwrap();

    orchestrator.list_tracked().await.unwrap();

    assert_eq!(gateway.get_run_calls(), 1);
}

#[tokio::test]
async fn test_completed_without_conclusion_stays_active() {
    let (store, gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("300", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    gateway.report(Run::new("300", 7, RunStatus::Completed, "main", ""));

    let td = orchestrator.get_tracked("300").await.unwrap().unwrap();
    assert!(td.is_active());
    assert!(td.conclusion().is_none());
    assert!(td.completed_at().is_none());

    // A later, complete answer is still applied
    gateway.report_conclusion("300", RunConclusion::Success);
    let td = orchestrator.get_tracked("300").await.unwrap().unwrap();
    assert!(td.is_success());
    assert!(store.get_by_id("300").await.unwrap().unwrap().is_success());
}

#[tokio::test]
async fn test_unknown_status_is_ignored() {
    let (_store, gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("301", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    gateway.report_status("301", RunStatus::Unknown);

    let td = orchestrator.get_tracked("301").await.unwrap().unwrap();
    assert_eq!(td.status(), RunStatus::Queued);
}

#[tokio::test]
async fn test_run_not_yet_visible_keeps_record() {
    let (_store, _gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("302", workflow(), "main", "owner/repo")
        .await
        .unwrap();

    let td = orchestrator.get_tracked("302").await.unwrap().unwrap();
    assert!(td.is_active());
}

#[tokio::test]
async fn test_dismiss_is_idempotent() {
    let (_store, _gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("400", workflow(), "main", "owner/repo")
        .await
        .unwrap();

    orchestrator.dismiss_tracked("400").await.unwrap();
    assert!(orchestrator.get_tracked("400").await.unwrap().is_none());

    orchestrator.dismiss_tracked("400").await.unwrap();
    assert!(orchestrator.get_tracked("400").await.unwrap().is_none());
}

#[tokio::test]
async fn test_unstorable_ids_are_not_tracked() {
    let (_store, _gateway, orchestrator) = setup();

    orchestrator.dismiss_tracked("").await.unwrap();
    orchestrator.dismiss_tracked("../etc").await.unwrap();
    assert!(orchestrator.get_tracked("a/b").await.unwrap().is_none());
    assert!(orchestrator.get_tracked("").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_active_does_not_refresh() {
    let (_store, gateway, orchestrator) = setup();
    orchestrator
        .track_deployment("500", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    gateway.report_conclusion("500", RunConclusion::Success);

    let active = orchestrator.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(gateway.get_run_calls(), 0);
}

#[tokio::test]
async fn test_list_tracked_collects_stale_records_after_listing() {
    let (store, _gateway, orchestrator) = setup();
    store.save(&completed_ago("old", 8 * DAY)).await.unwrap();
    store.save(&completed_ago("recent", DAY)).await.unwrap();

    let listed = orchestrator.list_tracked().await.unwrap();

    // The listing reflects the store before collection
    assert_eq!(listed.len(), 2);
    assert!(store.get_by_id("old").await.unwrap().is_none());
    assert!(store.get_by_id("recent").await.unwrap().is_some());
}

#[tokio::test]
async fn test_list_tracked_is_newest_first() {
    let (store, _gateway, orchestrator) = setup();
    store.save(&completed_ago("older", 2 * DAY)).await.unwrap();
    store.save(&completed_ago("newer", DAY)).await.unwrap();

    let listed = orchestrator.list_tracked().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|td| td.id()).collect();
    assert_eq!(ids, vec!["newer", "older"]);
}

#[tokio::test]
async fn test_sequential_refresh_matches_parallel() {
    let (_store, gateway, orchestrator) = setup_with(ReconcileSettings {
        refresh_concurrency: 1,
        ..ReconcileSettings::default()
    });
    for id in ["a1", "a2", "a3", "a4", "a5"] {
        orchestrator
            .track_deployment(id, workflow(), "main", "owner/repo")
            .await
            .unwrap();
        gateway.report_status(id, RunStatus::InProgress);
    }

    let listed = orchestrator.list_tracked().await.unwrap();
    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|td| td.status() == RunStatus::InProgress));
    assert_eq!(gateway.get_run_calls(), 5);
}

#[tokio::test]
async fn test_get_run_logs_surfaces_errors() {
    let (_store, gateway, orchestrator) = setup();
    gateway.set_logs("600", "step 1\nstep 2\n");

    assert_eq!(
        orchestrator.get_run_logs("600").await.unwrap(),
        "step 1\nstep 2\n"
    );
    assert!(orchestrator.get_run_logs("601").await.is_err());
}

#[tokio::test]
async fn test_run_source_recovers_after_timed_out_trial_call() {
    let store = Arc::new(InMemoryTrackerStore::new());
    let gateway = Arc::new(ResilientGateway::new(
        ScriptedGateway::new(),
        CircuitBreakerConfig {
            failure_threshold: 1,
            open_timeout: Duration::from_millis(20),
            success_threshold: 1,
        },
        RetryPolicy::none(),
    ));
    let orchestrator = StatusOrchestrator::with_settings(
        store,
        gateway.clone(),
        ReconcileSettings {
            gateway_timeout: Duration::from_millis(50),
            ..ReconcileSettings::default()
        },
    );
    orchestrator
        .track_deployment("700", workflow(), "main", "owner/repo")
        .await
        .unwrap();
    let breaker = gateway.circuit_breaker();

    gateway.inner().fail("700");
    orchestrator.get_tracked("700").await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);

    // The half-open trial call hangs past the refresh deadline
    tokio::time::sleep(Duration::from_millis(30)).await;
    gateway.inner().hang("700");
    let td = orchestrator.get_tracked("700").await.unwrap().unwrap();
    assert_eq!(td.status(), RunStatus::Queued);
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(30)).await;
    gateway.inner().report_status("700", RunStatus::InProgress);
    let td = orchestrator.get_tracked("700").await.unwrap().unwrap();
    assert_eq!(td.status(), RunStatus::InProgress);
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(!matches!(
        gateway.get_run("700").await,
        Err(GatewayError::CircuitOpen { .. })
    ));
}
