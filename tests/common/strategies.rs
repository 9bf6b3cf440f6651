use deploy_tracker::domain::RunConclusion;
use proptest::prelude::*;

/// Strategy for generating run identifiers as the run source issues them
pub fn run_id_strategy() -> impl Strategy<Value = String> {
    "[1-9][0-9]{5,11}"
}

/// Strategy for generating any conclusion
pub fn conclusion_strategy() -> impl Strategy<Value = RunConclusion> {
    prop_oneof![
        Just(RunConclusion::Success),
        Just(RunConclusion::Failure),
        Just(RunConclusion::Cancelled),
        Just(RunConclusion::Neutral),
        Just(RunConclusion::Skipped),
        Just(RunConclusion::Unknown),
    ]
}

/// Strategy for generating retention windows between one minute and thirty days
pub fn max_age_secs_strategy() -> impl Strategy<Value = u64> {
    60u64..(30 * 24 * 60 * 60)
}
