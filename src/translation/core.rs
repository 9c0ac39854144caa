/*!
 * Core translation service implementation.
 *
 * Text lines of an SRT document are collected, sent to the translator in a
 * single batch, and written back in place. Cue numbers, timing lines and
 * blank separators never leave the process.
 */

use log::{debug, info, warn};

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::language_utils;
use crate::providers::Translator;
use crate::providers::libretranslate::LibreTranslate;
use crate::subtitle_processor::{classify_line, line_terminator, split_lines, LineKind};

/// Translates whole SRT documents between two languages
#[derive(Debug)]
pub struct TranslationService {
    /// Service doing the actual text translation
    translator: Box<dyn Translator>,
    /// Normalized source language code
    source_language: String,
    /// Normalized target language code
    target_language: String,
}

impl TranslationService {
    /// Create a service for a language pair, validating both codes up front
    pub fn new(
        translator: Box<dyn Translator>,
        source_language: &str,
        target_language: &str,
    ) -> Result<Self, TranslationError> {
        Ok(Self {
            translator,
            source_language: normalize_language(source_language)?,
            target_language: normalize_language(target_language)?,
        })
    }

    /// Create a LibreTranslate-backed service from the application config
    pub fn from_config(config: &Config) -> Result<Self, TranslationError> {
        Self::new(
            Box::new(LibreTranslate::from_config(&config.translation)),
            &config.source_language,
            &config.target_language,
        )
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Check that the translation service is reachable
    pub async fn test_connection(&self) -> Result<(), TranslationError> {
        self.translator.test_connection().await?;
        Ok(())
    }

    /// Translate the text lines of a document, passing every other line through untouched
    pub async fn translate_document<I, S>(&self, lines: I) -> Result<Vec<String>, TranslationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut output: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();

        if self.source_language == self.target_language {
            info!("Source and target language are both '{}', nothing to translate", self.source_language);
            return Ok(output);
        }

        let text_indices: Vec<usize> = output
            .iter()
            .enumerate()
            .filter(|(_, line)| classify_line(line) == LineKind::Text)
            .map(|(i, _)| i)
            .collect();

        if text_indices.is_empty() {
            debug!("Document has no text lines to translate");
            return Ok(output);
        }

        let texts: Vec<String> = text_indices
            .iter()
            .map(|&i| output[i].trim().to_string())
            .collect();

        info!(
            "Translating {} text lines from {} to {}",
            texts.len(), self.source_language, self.target_language
        );

        let translated = self.translator
            .translate_batch(&texts, &self.source_language, &self.target_language)
            .await?;

        if translated.len() != texts.len() {
            return Err(TranslationError::CountMismatch {
                expected: texts.len(),
                received: translated.len(),
            });
        }

        for ((&index, source), text) in text_indices.iter().zip(&texts).zip(translated) {
            let terminator = line_terminator(&output[index]);
            let text = single_line(&text);
            if text.is_empty() {
                warn!("Empty translation for '{}', keeping the source text", source);
                output[index] = format!("{}{}", source, terminator);
            } else {
                output[index] = format!("{}{}", text, terminator);
            }
        }

        Ok(output)
    }

    /// Translate a whole SRT document held in memory
    pub async fn translate_srt_string(&self, content: &str) -> Result<String, TranslationError> {
        let lines = self.translate_document(split_lines(content)).await?;
        Ok(lines.concat())
    }
}

fn normalize_language(code: &str) -> Result<String, TranslationError> {
    language_utils::normalize_to_part1_or_part2t(code)
        .map_err(|_| TranslationError::UnsupportedLanguage(code.to_string()))
}

/// Join a translated line that came back split, so one text line stays one line
fn single_line(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
