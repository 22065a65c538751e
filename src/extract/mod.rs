//! Text extraction and language detection collaborators used by the page gate

mod language;
mod text;

pub use language::{to_iso_639_1, LanguageDetector, LanguageError, WhatlangDetector};
pub use text::{extract_from_document, HtmlTextExtractor, TextExtractor};
