/*!
 * Translation service clients.
 *
 * Translation is an opaque text-to-text service: the translation pass hands
 * it every text line of a document in one call and expects the same number
 * of lines back, in order.
 * - LibreTranslate: self-hosted or public LibreTranslate/Argos API
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all translation services
#[async_trait]
pub trait Translator: Send + Sync + Debug {
    /// Translate a batch of text lines
    ///
    /// # Arguments
    /// * `texts` - Lines to translate, without terminators
    /// * `source_language` - ISO 639 code of the input
    /// * `target_language` - ISO 639 code of the output
    ///
    /// # Returns
    /// * `Result<Vec<String>, ProviderError>` - One translated line per input line
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, ProviderError>;

    /// Test the connection to the service
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod libretranslate;
