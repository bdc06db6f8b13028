/*!
 * Translated artifacts, downloads and the upload cache
 */

use anyhow::Result;
use pdftrans::engine::mock::MockEngine;
use pdftrans::orchestrator::{ArtifactKind, JobState, Upload};

use crate::common;

#[tokio::test]
async fn test_completed_job_shouldNameDownloadsAfterUpload() -> Result<()> {
    let controller = common::controller(MockEngine::working());
    controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "zh-CN"))
        .await?;

    let result = controller.result().unwrap();
    assert_eq!(result.file_name(ArtifactKind::Monolingual), "report-mono.pdf");
    assert_eq!(result.file_name(ArtifactKind::Bilingual), "report-dual.pdf");
    assert!(result.artifact(ArtifactKind::Monolingual).starts_with(b"%PDF"));
    Ok(())
}

#[tokio::test]
async fn test_save_to_shouldWriteBothDocumentsAndRefuseOverwrite() -> Result<()> {
    let out = common::create_temp_dir()?;
    let controller = common::controller(MockEngine::working());
    controller
        .submit(Some(common::sample_upload("report.pdf")), common::job_config("en", "de"))
        .await?;
    let result = controller.result().unwrap();

    let written = result.save_to(out.path(), false)?;
    assert_eq!(written, vec![out.path().join("report-mono.pdf"), out.path().join("report-dual.pdf")]);
    assert_eq!(std::fs::read(&written[1])?, result.artifacts.bilingual.to_vec());

    let error = result.save_to(out.path(), false).unwrap_err();
    assert!(error.to_string().contains("-f"));
    assert!(result.save_to(out.path(), true).is_ok());
    Ok(())
}

#[tokio::test]
async fn test_resubmitting_same_name_shouldReuseCachedBytes() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_file(dir.path(), "report.pdf", b"%PDF-1.7 first upload")?;

    let engine = MockEngine::working();
    let controller = common::controller(engine.clone());

    controller
        .submit(Some(Upload::from_path(&path)), common::job_config("en", "ja"))
        .await?;
    std::fs::write(&path, b"%PDF-1.7 changed on disk")?;
    let snapshot = controller
        .submit(Some(Upload::from_path(&path)), common::job_config("en", "ja"))
        .await?;

    assert_eq!(snapshot.state, JobState::Completed);
    assert_eq!(engine.call_count(), 2);
    let request = engine.last_call().unwrap().request;
    assert_eq!(&request.document.bytes[..], b"%PDF-1.7 first upload");
    assert_eq!(&controller.original().unwrap().bytes[..], b"%PDF-1.7 first upload");
    Ok(())
}

#[tokio::test]
async fn test_new_upload_name_shouldReplaceCachedOriginal() -> Result<()> {
    let controller = common::controller(MockEngine::working());
    controller
        .submit(Some(common::sample_upload("first.pdf")), common::job_config("en", "it"))
        .await?;
    controller
        .submit(
            Some(Upload::from_bytes("second.pdf", &b"%PDF-1.4 second"[..])),
            common::job_config("en", "it"),
        )
        .await?;

    let original = controller.original().unwrap();
    assert_eq!(original.file_name, "second.pdf");
    assert_eq!(controller.result().unwrap().base_name, "second");
    Ok(())
}
