/*!
 * # subshift - SubRip subtitle shifting and translation
 *
 * A Rust library for rewriting SubRip (`.srt`) subtitle files.
 *
 * ## What it does
 *
 * - Shift every timestamp of a document by a signed, fractional number of seconds
 * - Clamp shifted timestamps at zero, never wrap or reflect them
 * - Preserve every non-timing line byte for byte, including line endings
 * - Translate subtitle text through a LibreTranslate-compatible service
 * - Accept language codes in ISO 639-1 or either ISO 639-2 form
 *
 * ## Modules
 *
 * - `subtitle_processor`: Timecode parsing/formatting and the timestamp shifter
 * - `translation`: Document translation pass
 * - `providers`: Translation service clients:
 *   - `providers::libretranslate`: LibreTranslate API client
 * - `app_config`: JSON settings file
 * - `app_controller`: File-level orchestration used by the CLI
 * - `file_utils`: Output naming, directory walking and atomic writes
 * - `language_utils`: ISO 639 code lookup and normalization
 * - `errors`: Typed errors for each layer
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;

pub use app_config::Config;
pub use subtitle_processor::{
    format_timecode, parse_timecode, shift_document, shift_srt_string, ShiftDelta, Timecode,
};
pub use translation::TranslationService;
pub use language_utils::{language_codes_match, normalize_to_part1_or_part2t, get_language_name};
pub use errors::{AppError, ProviderError, SubtitleError, TranslationError};
