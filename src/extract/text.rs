//! Main-content text extraction from HTML

use scraper::{ElementRef, Html, Node, Selector};

/// Turns an HTML document into readable plain text
pub trait TextExtractor: Send + Sync {
    /// Returns the document's main text, or `None` when there is none
    fn extract(&self, html: &str) -> Option<String>;
}

/// Elements whose text is never part of the main content
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
    "iframe", "svg", "button", "select",
];

/// Elements that start a new line of text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "dl", "dt", "dd", "pre",
    "blockquote", "table", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "hr",
    "figure", "figcaption",
];

/// Scraper-based extractor
///
/// Text is taken from the first `<main>`, else the first `<article>`, else
/// `<body>`. Navigation, boilerplate, and script elements are skipped, block
/// elements become line breaks, and runs of whitespace collapse to one space.
#[derive(Debug, Clone, Default)]
pub struct HtmlTextExtractor;

impl HtmlTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for HtmlTextExtractor {
    fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        extract_from_document(&document)
    }
}

/// Extracts main-content text from an already parsed document
pub fn extract_from_document(document: &Html) -> Option<String> {
    let root = content_root(document)?;

    let mut raw = String::new();
    collect_text(root, &mut raw);

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    for candidate in ["main", "article", "body"] {
        if let Ok(selector) = Selector::parse(candidate) {
            if let Some(element) = document.select(&selector).next() {
                return Some(element);
            }
        }
    }
    Some(document.root_element())
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn normalize_whitespace(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
