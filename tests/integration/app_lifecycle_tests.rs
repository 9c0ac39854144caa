/*!
 * Integration tests for the application controller
 */

use anyhow::Result;
use std::fs;
use subshift::app_config::Config;
use subshift::app_controller::{Controller, Operation};
use subshift::errors::SubtitleError;
use subshift::translation::TranslationService;
use crate::common;
use crate::common::mock_providers::MockTranslator;

fn mock_controller(mock: &MockTranslator) -> Result<Controller> {
    let service = TranslationService::new(Box::new(mock.clone()), "en", "ru")?;
    Controller::with_translation_service(Config::default(), service)
}

#[test]
fn test_controller_with_config_shouldKeepConfig() -> Result<()> {
    let mut config = Config::default();
    config.target_language = "de".to_string();

    let controller = Controller::with_config(config)?;

    assert_eq!(controller.config().target_language, "de");
    Ok(())
}

#[test]
fn test_operation_output_prefix_shouldMatchOperation() {
    assert_eq!(Operation::Shift { offset_secs: 1.0 }.output_prefix(), "adjusted_");
    assert_eq!(Operation::Translate.output_prefix(), "translated_");
}

#[test]
fn test_shift_file_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let existing = common::create_test_file(temp_dir.path(), "adjusted_movie.srt", "keep me")?;
    let controller = Controller::with_config(Config::default())?;

    let skipped = controller.shift_file(&input, temp_dir.path(), 1.0, false)?;
    assert!(skipped.is_none());
    assert_eq!(fs::read_to_string(&existing)?, "keep me");

    let written = controller.shift_file(&input, temp_dir.path(), 1.0, true)?;
    assert_eq!(written, Some(existing.clone()));
    assert!(fs::read_to_string(&existing)?.contains("00:00:02,000 --> 00:00:05,000"));
    Ok(())
}

#[test]
fn test_shift_file_withNonSrtInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "movie.txt", common::SAMPLE_SRT)?;
    let controller = Controller::with_config(Config::default())?;

    assert!(controller.shift_file(&input, temp_dir.path(), 1.0, false).is_err());
    assert!(!temp_dir.path().join("adjusted_movie.txt").exists());
    Ok(())
}

#[test]
fn test_shift_file_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;

    let result = controller.shift_file(&temp_dir.path().join("missing.srt"), temp_dir.path(), 1.0, false);

    assert!(result.is_err());
    Ok(())
}

#[test]
fn test_shift_file_withInvalidOffset_shouldFailWithoutWriting() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let controller = Controller::with_config(Config::default())?;

    let error = controller.shift_file(&input, temp_dir.path(), f64::NAN, false).unwrap_err();

    assert!(matches!(error.downcast_ref::<SubtitleError>(), Some(SubtitleError::InvalidDelta(_))));
    assert!(!temp_dir.path().join("adjusted_movie.srt").exists());
    Ok(())
}

#[test]
fn test_shift_file_withNewOutputDir_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let output_dir = temp_dir.path().join("out").join("shifted");
    let controller = Controller::with_config(Config::default())?;

    let output = controller.shift_file(&input, &output_dir, 2.0, false)?.unwrap();

    assert_eq!(output, output_dir.join("adjusted_movie.srt"));
    assert!(output.exists());
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withMockService_shouldWriteTranslatedCopy() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let mock = MockTranslator::working();
    let controller = mock_controller(&mock)?;

    let output = controller.translate_file(&input, temp_dir.path(), false).await?.unwrap();

    assert_eq!(output, temp_dir.path().join("translated_movie.srt"));
    let content = fs::read_to_string(&output)?;
    assert!(content.contains("[ru] This is a test subtitle."));
    assert!(content.contains("00:00:01,000 --> 00:00:04,000"));
    Ok(())
}

#[tokio::test]
async fn test_translate_file_withFailingService_shouldNotLeaveOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let controller = mock_controller(&MockTranslator::failing())?;

    assert!(controller.translate_file(&input, temp_dir.path(), false).await.is_err());
    assert!(!temp_dir.path().join("translated_movie.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withMixedFiles_shouldProcessOnlySourceSubtitles() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let season = temp_dir.path().join("season1");
    fs::create_dir_all(&season)?;
    common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    common::create_test_subtitle(&season, "e01.srt")?;
    common::create_test_file(temp_dir.path(), "notes.txt", "not a subtitle")?;
    common::create_test_file(temp_dir.path(), "adjusted_old.srt", "generated earlier")?;
    let controller = Controller::with_config(Config::default())?;

    let processed = controller
        .run_folder(temp_dir.path(), &Operation::Shift { offset_secs: 1.0 }, false)
        .await?;

    assert_eq!(processed, 2);
    assert!(temp_dir.path().join("adjusted_a.srt").exists());
    assert!(season.join("adjusted_e01.srt").exists());
    assert!(!temp_dir.path().join("adjusted_adjusted_old.srt").exists());

    // Second run finds every output already present
    let processed = controller
        .run_folder(temp_dir.path(), &Operation::Shift { offset_secs: 1.0 }, false)
        .await?;
    assert_eq!(processed, 0);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withUserFileNamedLikeOutput_shouldSkipIt() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "translated_notes.srt")?;
    common::create_test_subtitle(temp_dir.path(), "b.srt")?;
    let mock = MockTranslator::working();
    let controller = mock_controller(&mock)?;

    let processed = controller.run_folder(temp_dir.path(), &Operation::Translate, false).await?;

    assert_eq!(processed, 1);
    assert_eq!(mock.call_count(), 1);
    assert!(temp_dir.path().join("translated_b.srt").exists());
    assert!(!temp_dir.path().join("translated_translated_notes.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withTranslateAndFailingService_shouldContinuePastErrors() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    common::create_test_subtitle(temp_dir.path(), "b.srt")?;
    let mock = MockTranslator::failing();
    let controller = mock_controller(&mock)?;

    let processed = controller.run_folder(temp_dir.path(), &Operation::Translate, false).await?;

    assert_eq!(processed, 0);
    assert_eq!(mock.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withInvalidOffset_shouldFailUpFront() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    let controller = Controller::with_config(Config::default())?;

    let result = controller
        .run_folder(temp_dir.path(), &Operation::Shift { offset_secs: f64::INFINITY }, false)
        .await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("adjusted_a.srt").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_folder_withMissingDirectory_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;

    let result = controller
        .run_folder(&temp_dir.path().join("nope"), &Operation::Translate, false)
        .await;

    assert!(result.is_err());
    Ok(())
}
