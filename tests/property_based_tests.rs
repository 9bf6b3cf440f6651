mod common;

use chrono::Utc;
use common::record;
use common::strategies::*;
use deploy_tracker::domain::{Run, RunStatus, TrackedDeployment, Workflow};
use deploy_tracker::orchestration::apply_observation;
use proptest::prelude::*;
use std::time::Duration;

fn tracked(run_id: &str) -> TrackedDeployment {
    TrackedDeployment::new(run_id, Workflow::new("deploy.yml").unwrap(), "main", "owner/repo")
}

proptest! {
    /// Property: the first conclusion fixes the completion time
    #[test]
    fn completion_time_is_fixed_by_first_conclusion(
        run_id in run_id_strategy(),
        first in conclusion_strategy(),
        second in conclusion_strategy(),
    ) {
        let mut td = tracked(&run_id);
        td.update_conclusion(first);
        let completed_at = td.completed_at();
        prop_assert!(completed_at.is_some());

        td.update_conclusion(second);
        prop_assert_eq!(td.completed_at(), completed_at);
        prop_assert!(td.is_completed());
    }

    /// Property: no observation reopens a completed record
    #[test]
    fn completed_records_never_regress(
        run_id in run_id_strategy(),
        conclusion in conclusion_strategy(),
        status in prop_oneof![
            Just(RunStatus::Queued),
            Just(RunStatus::InProgress),
            Just(RunStatus::Unknown),
        ],
    ) {
        let mut td = tracked(&run_id);
        td.update_conclusion(conclusion);
        let before = td.clone();

        let late = Run::new(run_id.as_str(), 1, status, "main", "");
        prop_assert!(!apply_observation(&mut td, &late));
        prop_assert_eq!(td, before);
    }

    /// Property: active records older than the window are stale, younger ones are not
    #[test]
    fn active_staleness_follows_start_time(max_age in max_age_secs_strategy(), slack in 1u64..3600) {
        let now = Utc::now();
        let window = Duration::from_secs(max_age);
        let secs = |s: u64| chrono::Duration::seconds(i64::try_from(s).unwrap());

        let old = record("old", RunStatus::InProgress, None, now - secs(max_age + slack), None);
        prop_assert!(old.is_stale_at(window, now));

        let young = record("young", RunStatus::InProgress, None, now - secs(max_age / 2), None);
        prop_assert!(!young.is_stale_at(window, now));
    }

    /// Property: completed records age from completion, not from start
    #[test]
    fn completed_staleness_follows_completion_time(
        max_age in max_age_secs_strategy(),
        conclusion in conclusion_strategy(),
    ) {
        let now = Utc::now();
        let window = Duration::from_secs(max_age);
        let secs = |s: u64| chrono::Duration::seconds(i64::try_from(s).unwrap());
        let started = now - secs(max_age * 3);

        let recent = record(
            "recent",
            RunStatus::Completed,
            Some(conclusion),
            started,
            Some(now - secs(max_age / 2)),
        );
        prop_assert!(!recent.is_stale_at(window, now));

        let expired = record(
            "expired",
            RunStatus::Completed,
            Some(conclusion),
            started,
            Some(now - secs(max_age + 1)),
        );
        prop_assert!(expired.is_stale_at(window, now));
    }
}

#[test]
fn test_elapsed_time_is_monotonic_while_active() {
    let td = tracked("1");
    let first = td.elapsed_time();
    std::thread::sleep(Duration::from_millis(20));
    let second = td.elapsed_time();
    assert!(second >= first);
}
