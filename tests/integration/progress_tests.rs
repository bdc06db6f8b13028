/*!
 * Progress aggregation observed through complete jobs
 */

use pdftrans::engine::mock::MockEngine;
use pdftrans::orchestrator::progress::{DEFAULT_TRANSLATING_LABEL, ProgressUpdate};
use pdftrans::orchestrator::{JobState, Phase};

use crate::common;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn assert_non_decreasing(history: &[ProgressUpdate]) {
    for pair in history.windows(2) {
        assert!(
            pair[1].value >= pair[0].value,
            "progress went from {} to {}",
            pair[0].value,
            pair[1].value
        );
    }
}

async fn run_to_end(engine: MockEngine, target: &str) -> (JobState, Vec<ProgressUpdate>) {
    let controller = common::controller(engine);
    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", target))
        .await
        .unwrap();
    let history = controller.current_job().unwrap().progress().history();
    (snapshot.state, history)
}

#[tokio::test]
async fn test_scripted_events_shouldMapIntoTranslatingRange() {
    let engine = MockEngine::scripted(vec![(3, 10), (7, 10), (10, 10)]);
    let (state, history) = run_to_end(engine, "zh-CN").await;

    assert_eq!(state, JobState::Completed);
    let values: Vec<f64> = history.iter().map(|update| update.value).collect();
    let expected = [0.55, 0.75, 0.9, 1.0];
    let mut search_from = 0;
    for value in expected {
        let position = values[search_from..]
            .iter()
            .position(|v| approx_eq(*v, value))
            .unwrap_or_else(|| panic!("{} missing from {:?}", value, values));
        search_from += position + 1;
    }
    assert_eq!(history.last().unwrap().status, Phase::Complete.status());
}

#[tokio::test]
async fn test_phases_shouldAppearInOrderWithTheirStatus() {
    let (_, history) = run_to_end(MockEngine::working(), "fr").await;
    let statuses: Vec<&str> = history.iter().map(|update| update.status.as_str()).collect();

    let phases = [
        Phase::Starting,
        Phase::ReadingDocument,
        Phase::InitializingEngine,
        Phase::ResolvingFonts,
        Phase::Translating,
        Phase::Complete,
    ];
    let mut search_from = 0;
    for phase in phases {
        let position = statuses[search_from..]
            .iter()
            .position(|status| *status == phase.status())
            .unwrap_or_else(|| panic!("{:?} missing from {:?}", phase, statuses));
        search_from += position + 1;
    }
}

#[tokio::test]
async fn test_out_of_order_events_shouldNeverDecreaseProgress() {
    let (state, history) = run_to_end(MockEngine::out_of_order(10), "ja").await;

    assert_eq!(state, JobState::Completed);
    assert_non_decreasing(&history);
    // Newest-first means only the first engine event moved the bar.
    let translating: Vec<&ProgressUpdate> = history
        .iter()
        .filter(|update| update.status == DEFAULT_TRANSLATING_LABEL)
        .collect();
    assert_eq!(translating.len(), 1);
    assert!(approx_eq(translating[0].value, 0.9));
}

#[tokio::test]
async fn test_concurrent_workers_shouldKeepProgressMonotonic() {
    let controller = common::controller(MockEngine::working());
    let config = pdftrans::orchestrator::JobConfig::new(
        "en",
        "ko",
        8,
        false,
        pdftrans::orchestrator::CachePolicy::UseCache,
    )
    .unwrap();

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), config)
        .await
        .unwrap();
    let history = controller.current_job().unwrap().progress().history();

    assert_eq!(snapshot.state, JobState::Completed);
    assert_non_decreasing(&history);
    assert!(history.iter().all(|update| (0.0..=1.0).contains(&update.value)));
    assert!(history.iter().any(|update| update.status.starts_with("Translating page")));
}

#[tokio::test]
async fn test_failed_job_shouldFreezeProgressAtLastValue() {
    let (state, history) = run_to_end(MockEngine::failing("engine crashed"), "es").await;

    assert_eq!(state, JobState::Failed);
    assert_non_decreasing(&history);
    let last = history.last().unwrap();
    assert!(approx_eq(last.value, 0.45));
    assert_eq!(last.status, "Error: API responded with error: 500 - engine crashed");
}
