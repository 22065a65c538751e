//! Language detection

use thiserror::Error;

/// Errors from language detection
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LanguageError {
    #[error("no text to detect")]
    EmptyText,

    #[error("language could not be determined")]
    Undetermined,
}

/// Detects the language of a text
pub trait LanguageDetector: Send + Sync {
    /// Returns the language code, ISO 639-1 where one exists (`en`, `de`, ...)
    fn detect(&self, text: &str) -> Result<String, LanguageError>;
}

/// Detector backed by the whatlang crate
#[derive(Debug, Clone, Default)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String, LanguageError> {
        if text.trim().is_empty() {
            return Err(LanguageError::EmptyText);
        }

        let info = whatlang::detect(text).ok_or(LanguageError::Undetermined)?;
        let code = info.lang().code();
        Ok(to_iso_639_1(code).unwrap_or(code).to_string())
    }
}

/// Maps an ISO 639-3 code to its ISO 639-1 equivalent
pub fn to_iso_639_1(code: &str) -> Option<&'static str> {
    let short = match code {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    };
    Some(short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_english() {
        let text = "This guide explains how to configure a firewall on an Ubuntu server \
                    and how to open the ports that your web application needs.";
        assert_eq!(WhatlangDetector::new().detect(text).unwrap(), "en");
    }

    #[test]
    fn test_detects_german() {
        let text = "Diese Anleitung erklärt, wie man die Firewall auf einem Server \
                    einrichtet und welche Ports für die Anwendung geöffnet werden müssen.";
        assert_eq!(WhatlangDetector::new().detect(text).unwrap(), "de");
    }

    #[test]
    fn test_empty_text_is_error() {
        assert_eq!(
            WhatlangDetector::new().detect("   "),
            Err(LanguageError::EmptyText)
        );
    }

    #[test]
    fn test_digits_only_is_undetermined() {
        assert_eq!(
            WhatlangDetector::new().detect("12345 67890 !!!"),
            Err(LanguageError::Undetermined)
        );
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(to_iso_639_1("eng"), Some("en"));
        assert_eq!(to_iso_639_1("cmn"), Some("zh"));
        assert_eq!(to_iso_639_1("xxx"), None);
    }
}
