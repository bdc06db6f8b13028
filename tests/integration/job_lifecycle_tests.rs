/*!
 * Job state machine tests: submission checks, terminal states and
 * what a rejected submission leaves behind
 */

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use pdftrans::access::AccessGate;
use pdftrans::app_config::{Config, EngineCredentials};
use pdftrans::engine::mock::MockEngine;
use pdftrans::errors::{ConfigError, CredentialField, SubmitError};
use pdftrans::fonts::NoFontResolver;
use pdftrans::orchestrator::{ABANDONED_STATUS, CachePolicy, JobConfig, JobState, Upload};

use crate::common::{self, FailingFontResolver, KeyArrivesLaterCredentials, StaticFontResolver};

async fn wait_until_running(controller: &pdftrans::JobController) {
    while controller.state() != JobState::Running {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_fresh_controller_shouldReportIdle() {
    let controller = common::controller(MockEngine::working());
    let snapshot = controller.snapshot();

    assert_eq!(snapshot.state, JobState::Idle);
    assert_eq!(snapshot.progress, 0.0);
    assert!(snapshot.id.is_none());
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn test_submit_withMissingApiKey_shouldRejectAndStayIdle() {
    let engine = MockEngine::working();
    let controller = common::controller_with(
        engine.clone(),
        Arc::new(NoFontResolver),
        common::credentials_without_api_key(),
    );

    let error = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap_err();

    assert_eq!(error.to_string(), "API Key is required");
    assert!(matches!(
        error,
        SubmitError::Config(ConfigError::MissingField(CredentialField::ApiKey))
    ));
    assert_eq!(controller.state(), JobState::Idle);
    assert_eq!(engine.call_count(), 0);
}

#[tokio::test]
async fn test_submit_withNoCredentials_shouldReportEndpointFirst() {
    let controller = common::controller_with(
        MockEngine::working(),
        Arc::new(NoFontResolver),
        EngineCredentials::default(),
    );

    let error = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "Azure Endpoint is required");
}

#[tokio::test]
async fn test_submit_withoutDocument_shouldAskForUpload() {
    let controller = common::controller(MockEngine::working());
    let error = controller
        .submit(None, common::job_config("en", "zh-CN"))
        .await
        .unwrap_err();

    assert!(matches!(error, SubmitError::MissingDocument));
    assert_eq!(controller.state(), JobState::Idle);
}

#[tokio::test]
async fn test_submit_withNonPdfOrEmptyUpload_shouldReject() {
    let controller = common::controller(MockEngine::working());

    let error = controller
        .submit(
            Some(Upload::from_bytes("notes.txt", Bytes::from_static(b"plain text"))),
            common::job_config("en", "fr"),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, SubmitError::InvalidDocument(_)));

    let error = controller
        .submit(Some(Upload::from_bytes("empty.pdf", Bytes::new())), common::job_config("en", "fr"))
        .await
        .unwrap_err();
    assert!(matches!(error, SubmitError::InvalidDocument(_)));
    assert_eq!(controller.state(), JobState::Idle);
}

#[tokio::test]
async fn test_submit_withWorkingEngine_shouldCompleteWithBothArtifacts() {
    common::init_logging();
    let controller = common::controller(MockEngine::working());

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap();

    assert_eq!(snapshot.state, JobState::Completed);
    assert_eq!(snapshot.progress, 1.0);
    assert_eq!(snapshot.status, "Translation complete!");
    assert_eq!(snapshot.file_name.as_deref(), Some("report.pdf"));

    let result = controller.result().unwrap();
    assert_eq!(Some(result.job_id.as_str()), snapshot.id.as_deref());
    assert!(!result.artifacts.monolingual.is_empty());
    assert!(!result.artifacts.bilingual.is_empty());
    assert_ne!(result.artifacts.monolingual, result.artifacts.bilingual);
}

#[tokio::test]
async fn test_submit_withFailingEngine_shouldFailWithoutResult() {
    common::init_logging();
    let controller = common::controller(MockEngine::failing("quota exhausted"));

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "de"))
        .await
        .unwrap();

    assert_eq!(snapshot.state, JobState::Failed);
    assert!(snapshot.status.starts_with("Error: "));
    assert!(snapshot.status.contains("quota exhausted"));
    assert!(snapshot.progress < 1.0);
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn test_submit_withMissingBilingualDocument_shouldFail() {
    let controller = common::controller(MockEngine::missing_bilingual());

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "ja"))
        .await
        .unwrap();

    assert_eq!(snapshot.state, JobState::Failed);
    assert!(snapshot.status.contains("bilingual"));
    assert!(controller.result().is_none());
}

#[tokio::test]
async fn test_submit_withFontFailure_shouldStillComplete() {
    let controller = common::controller_with(
        MockEngine::working(),
        Arc::new(FailingFontResolver),
        common::complete_credentials(),
    );

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "xx"))
        .await
        .unwrap();

    assert_eq!(snapshot.state, JobState::Completed);
    let history = controller.current_job().unwrap().progress().history();
    assert!(history.iter().any(|update| update.status.contains("default fonts")));
    assert!(controller.result().is_some());
}

#[tokio::test]
async fn test_submit_whileRunning_shouldRejectSecondJob() {
    let engine = MockEngine::slow(40);
    let controller = common::controller(engine.clone());

    let (first, second) = tokio::join!(
        controller.submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN")),
        async {
            wait_until_running(&controller).await;
            controller
                .submit(Some(common::sample_upload("other.pdf")), common::job_config("en", "ja"))
                .await
        }
    );

    assert!(matches!(second, Err(SubmitError::JobInProgress)));
    let first = first.unwrap();
    assert_eq!(first.state, JobState::Completed);
    assert_eq!(first.file_name.as_deref(), Some("report.pdf"));
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn test_snapshot_whileRunning_shouldShowRunningJob() {
    let controller = common::controller(MockEngine::slow(30));

    let (_, observed) = tokio::join!(
        controller.submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "ko")),
        async {
            wait_until_running(&controller).await;
            let snapshot = controller.snapshot();
            let result_while_running = controller.result();
            (snapshot, result_while_running)
        }
    );

    let (snapshot, result_while_running) = observed;
    assert_eq!(snapshot.state, JobState::Running);
    assert!((0.0..1.0).contains(&snapshot.progress));
    assert!(result_while_running.is_none());
}

#[tokio::test]
async fn test_rejected_submission_shouldKeepPreviousTerminalJob() {
    let controller = common::controller(MockEngine::working());
    let completed = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap();

    let error = controller.submit(None, common::job_config("en", "zh-CN")).await;
    assert!(error.is_err());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, JobState::Completed);
    assert_eq!(snapshot.id, completed.id);
    assert!(controller.result().is_some());
}

#[tokio::test]
async fn test_new_job_shouldHidePreviousResultUntilItCompletes() {
    let controller = common::controller(MockEngine::slow(20));
    let first = controller
        .submit(Some(common::sample_upload("first.pdf")), common::job_config("en", "fr"))
        .await
        .unwrap();
    assert!(controller.result().is_some());

    let (second, result_while_running) = tokio::join!(
        controller.submit(Some(common::sample_upload("second.pdf")), common::job_config("en", "fr")),
        async {
            wait_until_running(&controller).await;
            controller.result()
        }
    );

    assert!(result_while_running.is_none());
    let second = second.unwrap();
    let result = controller.result().unwrap();
    assert_eq!(Some(result.job_id.as_str()), second.id.as_deref());
    assert_ne!(first.id, second.id);
    assert_eq!(result.base_name, "second");
}

#[tokio::test]
async fn test_submit_shouldPassJobOptionsToEngine() {
    let engine = MockEngine::working();
    let controller = common::controller_with(
        engine.clone(),
        Arc::new(StaticFontResolver::default()),
        common::complete_credentials(),
    );
    let config = JobConfig::new("en", "ja", 6, true, CachePolicy::IgnoreCache).unwrap();

    controller
        .submit(Some(common::sample_upload("report.pdf")), config)
        .await
        .unwrap();

    let request = engine.last_call().unwrap().request;
    assert_eq!(request.source_language, "en");
    assert_eq!(request.target_language, "ja");
    assert_eq!(request.concurrency, 6);
    assert!(request.skip_font_subsetting);
    assert_eq!(request.cache_policy, CachePolicy::IgnoreCache);
    assert_eq!(request.env.get("AZURE_OPENAI_API_KEY"), Some("test-key"));
    assert_eq!(request.env.get("AZURE_OPENAI_MODEL"), Some("gpt-4o-mini"));
    assert_eq!(request.font.unwrap().file_name, "SourceHanSerifJP-Regular.ttf");
    assert_eq!(request.model.name(), "test-layout.onnx");
}

#[tokio::test]
async fn test_access_gate_shouldBlockUntilUnlocked() {
    let engine = MockEngine::working();
    let controller = common::controller(engine.clone()).with_access_gate(AccessGate::new(Some("letmein")));
    assert!(!controller.is_unlocked());

    let error = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap_err();
    assert!(matches!(error, SubmitError::Locked));
    assert_eq!(engine.call_count(), 0);

    assert!(!controller.unlock(Some("wrong")));
    assert!(controller.unlock(Some("letmein")));
    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap();
    assert_eq!(snapshot.state, JobState::Completed);
}

#[tokio::test]
async fn test_configured_passphrase_withWrongOrMissingAttempt_shouldStayLocked() {
    let engine = MockEngine::working();
    let config = Config {
        passphrase: Some("letmein".to_string()),
        ..Config::default()
    };
    let controller = common::controller(engine.clone()).with_access_gate(config.access_gate());

    for attempt in [None, Some("guess")] {
        assert!(!controller.unlock(attempt));
        let error = controller
            .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
            .await
            .unwrap_err();
        assert!(matches!(error, SubmitError::Locked));
    }
    assert_eq!(engine.call_count(), 0);
    assert_eq!(controller.state(), JobState::Idle);
}

#[tokio::test]
async fn test_submit_shouldRevalidateCredentialsEverySubmission() {
    let credentials = Arc::new(KeyArrivesLaterCredentials::default());
    let controller = common::controller_with_source(
        MockEngine::working(),
        Arc::new(NoFontResolver),
        credentials.clone(),
    );

    let error = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        SubmitError::Config(ConfigError::MissingField(CredentialField::ApiKey))
    ));
    assert_eq!(controller.state(), JobState::Idle);

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap();
    assert_eq!(snapshot.state, JobState::Completed);
    assert_eq!(credentials.loads.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dropped_submission_shouldFailJobAndAcceptNextOne() {
    common::init_logging();
    let controller = common::controller(MockEngine::slow(50));

    let dropped = tokio::time::timeout(
        Duration::from_millis(20),
        controller.submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN")),
    )
    .await;
    assert!(dropped.is_err());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, JobState::Failed);
    assert_eq!(snapshot.status, ABANDONED_STATUS);
    assert!(snapshot.progress < 1.0);
    assert!(controller.result().is_none());

    let snapshot = controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await
        .unwrap();
    assert_eq!(snapshot.state, JobState::Completed);
    assert!(controller.result().is_some());
}
