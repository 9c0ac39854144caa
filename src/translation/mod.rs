/*!
 * Translation of subtitle text.
 *
 * - `core`: the document translation pass and its service definition
 */

// Re-export main types for easier usage
pub use self::core::TranslationService;

pub mod core;
