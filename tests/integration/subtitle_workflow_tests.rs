/*!
 * End-to-end subtitle processing tests
 */

use anyhow::Result;
use std::fs;
use subshift::app_config::Config;
use subshift::app_controller::{Controller, Operation};
use subshift::subtitle_processor::{classify_line, parse_timecode, shift_srt_string, LineKind};
use subshift::translation::TranslationService;
use crate::common;
use crate::common::mock_providers::MockTranslator;

/// Shift a file on disk and check every timing line moved while everything else stayed
#[tokio::test]
async fn test_shift_workflow_withSampleFile_shouldWriteAdjustedCopy() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let controller = Controller::with_config(Config::default())?;

    let output = controller
        .run(&input, temp_dir.path(), &Operation::Shift { offset_secs: 1.5 }, false)
        .await?
        .expect("output should be written");

    assert_eq!(output, temp_dir.path().join("adjusted_movie.srt"));
    let original = fs::read_to_string(&input)?;
    let shifted = fs::read_to_string(&output)?;
    assert_eq!(original, common::SAMPLE_SRT);

    let pairs: Vec<(&str, &str)> = original.lines().zip(shifted.lines()).collect();
    assert_eq!(pairs.len(), original.lines().count());
    assert_eq!(original.lines().count(), shifted.lines().count());
    for (before, after) in pairs {
        if classify_line(before) == LineKind::Timing {
            let (start_before, _) = before.split_once(" --> ").unwrap();
            let (start_after, _) = after.split_once(" --> ").unwrap();
            let moved = parse_timecode(start_after)?.to_duration() - parse_timecode(start_before)?.to_duration();
            assert_eq!(moved.as_millis(), 1500);
        } else {
            assert_eq!(before, after);
        }
    }
    Ok(())
}

/// A shift forward and back restores the file byte for byte
#[tokio::test]
async fn test_shift_workflow_forwardThenBack_shouldRestoreOriginal() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "crlf.srt",
        "1\r\n00:10:00,250 --> 00:10:02,750\r\nLine one\r\n\r\n",
    )?;
    let forward_dir = temp_dir.path().join("forward");
    let back_dir = temp_dir.path().join("back");
    let controller = Controller::with_config(Config::default())?;

    let forward = controller.shift_file(&input, &forward_dir, 42.125, false)?.unwrap();
    let back = controller.shift_file(&forward, &back_dir, -42.125, false)?.unwrap();

    assert_eq!(fs::read(&back)?, fs::read(&input)?);
    assert_eq!(back, back_dir.join("adjusted_adjusted_crlf.srt"));
    Ok(())
}

/// Shift and translate compose: timing comes from the shift, text from the translation
#[tokio::test]
async fn test_shift_then_translate_workflow_shouldComposeBothPasses() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt")?;
    let mock = MockTranslator::working();
    let service = TranslationService::new(Box::new(mock.clone()), "en", "ru")?;
    let controller = Controller::with_translation_service(Config::default(), service)?;

    let adjusted = controller
        .run(&input, temp_dir.path(), &Operation::Shift { offset_secs: -0.5 }, false)
        .await?
        .unwrap();
    let translated = controller
        .run(&adjusted, temp_dir.path(), &Operation::Translate, false)
        .await?
        .unwrap();

    assert_eq!(translated, temp_dir.path().join("translated_adjusted_movie.srt"));
    let expected_timing = shift_srt_string(common::SAMPLE_SRT, -0.5)?;
    let content = fs::read_to_string(&translated)?;
    assert_eq!(content.lines().count(), expected_timing.lines().count());
    assert!(content.contains("00:00:00,500 --> 00:00:03,500\n[ru] This is a test subtitle.\n"));
    assert!(content.contains("00:00:04,500 --> 00:00:08,500\n[ru] It contains multiple entries.\n"));
    assert_eq!(mock.call_count(), 1);
    Ok(())
}

/// Overflowing fields carry into the next unit and the cue is shifted with the rest
#[test]
fn test_shift_workflow_withOverflowingCue_shouldNormalizeAndShift() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "overflow.srt",
        "1\n00:75:00,000 --> 00:76:00,000\nBad\n\n2\n00:00:05,000 --> 00:00:06,000\nGood\n",
    )?;
    let controller = Controller::with_config(Config::default())?;

    let output = controller.shift_file(&input, temp_dir.path(), 1.0, false)?.unwrap();

    assert_eq!(
        fs::read_to_string(output)?,
        "1\n01:15:01,000 --> 01:16:01,000\nBad\n\n2\n00:00:06,000 --> 00:00:07,000\nGood\n"
    );
    Ok(())
}

/// Files saved with old Mac line endings are shifted too, endings intact
#[test]
fn test_shift_workflow_withCrOnlyFile_shouldShiftEveryCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "classic.srt",
        "1\r00:00:01,000 --> 00:00:02,000\rHi\r\r2\r00:00:03,000 --> 00:00:04,000\rYo\r",
    )?;
    let controller = Controller::with_config(Config::default())?;

    let output = controller.shift_file(&input, temp_dir.path(), 1.0, false)?.unwrap();

    assert_eq!(
        fs::read_to_string(output)?,
        "1\r00:00:02,000 --> 00:00:03,000\rHi\r\r2\r00:00:04,000 --> 00:00:05,000\rYo\r"
    );
    Ok(())
}
