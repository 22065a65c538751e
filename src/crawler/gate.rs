//! Page gate: decides whether a fetched page becomes an article
//!
//! Checks run in order and the first failing one wins:
//!
//! | Check | Skip reason | Event |
//! |-------|-------------|-------|
//! | Content-Type contains `text/html` | `non-html` | `page.skip` |
//! | size, announced or streamed, <= 1,000,000 bytes | `too-large` | `page.skip` |
//! | no `<meta name="robots">` with noindex/nofollow | `meta-robots` | `robots.meta-skip` |
//! | extracted text present | `no-content` | `extract.skip` |
//! | extracted text >= 500 characters | `too-short` | `extract.skip` |
//! | detected language is `en` | `non-english` | `extract.skip` |
//! | language detection succeeds | `lang-detect-failed` | `extract.skip` |

use crate::crawler::fetcher::FetchedPage;
use crate::crawler::parser::extract_title;
use crate::events::EventKind;
use crate::extract::{
    HtmlTextExtractor, LanguageDetector, LanguageError, TextExtractor, WhatlangDetector,
};
use scraper::{Html, Selector};
use std::fmt;
use std::sync::Arc;

/// Pages larger than this many bytes are skipped
pub const MAX_CONTENT_LENGTH: u64 = 1_000_000;

/// Extracted text shorter than this many characters is skipped
pub const MIN_TEXT_CHARS: usize = 500;

/// Only pages in this language are kept
pub const ACCEPTED_LANGUAGE: &str = "en";

/// Why a page was not kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NonHtml,
    TooLarge,
    MetaRobots,
    NoContent,
    TooShort,
    /// Detected language code
    NonEnglish(String),
    LangDetectFailed(String),
}

impl SkipReason {
    /// Wire name of the reason
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonHtml => "non-html",
            Self::TooLarge => "too-large",
            Self::MetaRobots => "meta-robots",
            Self::NoContent => "no-content",
            Self::TooShort => "too-short",
            Self::NonEnglish(_) => "non-english",
            Self::LangDetectFailed(_) => "lang-detect-failed",
        }
    }

    /// The event published for this skip
    pub fn event_kind(&self) -> EventKind {
        match self {
            Self::NonHtml | Self::TooLarge => EventKind::PageSkip,
            Self::MetaRobots => EventKind::RobotsMetaSkip,
            _ => EventKind::ExtractSkip,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEnglish(lang) => write!(f, "non-english ({})", lang),
            Self::LangDetectFailed(error) => write!(f, "lang-detect-failed ({})", error),
            other => f.write_str(other.as_str()),
        }
    }
}

/// A page that passed every check
#[derive(Debug, Clone)]
pub struct AcceptedPage {
    pub text: String,
    pub title: Option<String>,
    pub language: String,
}

/// Runs the acceptance checks with pluggable extraction and detection
#[derive(Clone)]
pub struct PageGate {
    extractor: Arc<dyn TextExtractor>,
    detector: Arc<dyn LanguageDetector>,
}

impl Default for PageGate {
    fn default() -> Self {
        Self::new(Arc::new(HtmlTextExtractor::new()), Arc::new(WhatlangDetector::new()))
    }
}

impl PageGate {
    pub fn new(extractor: Arc<dyn TextExtractor>, detector: Arc<dyn LanguageDetector>) -> Self {
        Self {
            extractor,
            detector,
        }
    }

    /// Runs [`PageGate::check`] on the blocking thread pool
    pub async fn evaluate(
        &self,
        page: FetchedPage,
    ) -> Result<Result<AcceptedPage, SkipReason>, tokio::task::JoinError> {
        let gate = self.clone();
        tokio::task::spawn_blocking(move || gate.check(&page)).await
    }

    /// Runs every check in order against `page`
    pub fn check(&self, page: &FetchedPage) -> Result<AcceptedPage, SkipReason> {
        if !page.is_html() {
            return Err(SkipReason::NonHtml);
        }

        if page.exceeds_limit() {
            return Err(SkipReason::TooLarge);
        }

        let title = {
            let document = Html::parse_document(&page.body);
            if has_blocking_meta_robots(&document) {
                return Err(SkipReason::MetaRobots);
            }
            extract_title(&document)
        };

        let text = self
            .extractor
            .extract(&page.body)
            .filter(|text| !text.trim().is_empty())
            .ok_or(SkipReason::NoContent)?;

        if text.chars().count() < MIN_TEXT_CHARS {
            return Err(SkipReason::TooShort);
        }

        let language = self
            .detector
            .detect(&text)
            .map_err(|e: LanguageError| SkipReason::LangDetectFailed(e.to_string()))?;
        if language != ACCEPTED_LANGUAGE {
            return Err(SkipReason::NonEnglish(language));
        }

        Ok(AcceptedPage {
            text,
            title,
            language,
        })
    }
}

/// Any `<meta name="robots">` asking not to index or follow the page
fn has_blocking_meta_robots(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("meta[name]") else {
        return false;
    };

    document
        .select(&selector)
        .filter(|meta| {
            meta.value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("robots"))
        })
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::to_ascii_lowercase)
        .any(|content| content.contains("noindex") || content.contains("nofollow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    struct FixedLanguage(Result<String, LanguageError>);

    impl LanguageDetector for FixedLanguage {
        fn detect(&self, _text: &str) -> Result<String, LanguageError> {
            self.0.clone()
        }
    }

    fn gate_with_language(result: Result<&str, LanguageError>) -> PageGate {
        PageGate::new(
            Arc::new(HtmlTextExtractor::new()),
            Arc::new(FixedLanguage(result.map(str::to_string))),
        )
    }

    fn english_gate() -> PageGate {
        gate_with_language(Ok("en"))
    }

    fn html_page(body: &str) -> FetchedPage {
        FetchedPage {
            url: Url::parse("https://example.com/guide").unwrap(),
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            content_length: Some(body.len() as u64),
            oversized: false,
            body: body.to_string(),
        }
    }

    fn long_article(head: &str) -> String {
        let paragraph = "Configure the server carefully and restart the service afterwards. ";
        format!(
            "<html><head><title>Guide</title>{}</head><body><main><p>{}</p></main></body></html>",
            head,
            paragraph.repeat(12)
        )
    }

    #[test]
    fn test_accepts_long_english_page() {
        let accepted = english_gate().check(&html_page(&long_article(""))).unwrap();
        assert_eq!(accepted.title, Some("Guide".to_string()));
        assert_eq!(accepted.language, "en");
        assert!(accepted.text.chars().count() >= MIN_TEXT_CHARS);
    }

    #[test]
    fn test_non_html_skipped() {
        let mut page = html_page(&long_article(""));
        page.content_type = Some("application/pdf".to_string());
        assert_eq!(english_gate().check(&page).unwrap_err(), SkipReason::NonHtml);
    }

    #[test]
    fn test_too_large_skipped() {
        let mut page = html_page(&long_article(""));
        page.content_length = Some(MAX_CONTENT_LENGTH + 1);
        assert_eq!(english_gate().check(&page).unwrap_err(), SkipReason::TooLarge);

        page.content_length = None;
        assert!(english_gate().check(&page).is_ok());

        // Decompressed bodies carry no length header, only the streamed verdict
        page.oversized = true;
        page.body.clear();
        assert_eq!(english_gate().check(&page).unwrap_err(), SkipReason::TooLarge);
    }

    #[test]
    fn test_meta_robots_skipped() {
        for head in [
            r#"<meta name="robots" content="noindex">"#,
            r#"<meta name="ROBOTS" content="index, NoFollow">"#,
        ] {
            let page = html_page(&long_article(head));
            assert_eq!(english_gate().check(&page).unwrap_err(), SkipReason::MetaRobots);
        }

        let page = html_page(&long_article(r#"<meta name="robots" content="index, follow">"#));
        assert!(english_gate().check(&page).is_ok());
    }

    #[test]
    fn test_empty_and_short_text_skipped() {
        let empty = html_page("<html><body><script>var x = 1;</script></body></html>");
        assert_eq!(english_gate().check(&empty).unwrap_err(), SkipReason::NoContent);

        let short = html_page("<html><body><p>Just a few words.</p></body></html>");
        assert_eq!(english_gate().check(&short).unwrap_err(), SkipReason::TooShort);
    }

    #[test]
    fn test_language_checks() {
        let page = html_page(&long_article(""));

        let german = gate_with_language(Ok("de")).check(&page).unwrap_err();
        assert_eq!(german, SkipReason::NonEnglish("de".to_string()));
        assert_eq!(german.event_kind(), EventKind::ExtractSkip);

        let failed = gate_with_language(Err(LanguageError::Undetermined))
            .check(&page)
            .unwrap_err();
        assert_eq!(failed.as_str(), "lang-detect-failed");
    }

    #[test]
    fn test_skip_reason_events() {
        assert_eq!(SkipReason::NonHtml.event_kind(), EventKind::PageSkip);
        assert_eq!(SkipReason::TooLarge.event_kind(), EventKind::PageSkip);
        assert_eq!(SkipReason::MetaRobots.event_kind(), EventKind::RobotsMetaSkip);
        assert_eq!(SkipReason::TooShort.event_kind(), EventKind::ExtractSkip);
    }

    #[tokio::test]
    async fn test_evaluate_on_blocking_pool() {
        let verdict = english_gate()
            .evaluate(html_page(&long_article("")))
            .await
            .unwrap();
        assert!(verdict.is_ok());
    }
}
