//! Keyword-based topic classification

use crate::config::{default_topics, TopicEntry};

/// Minimum score a topic needs to be assigned
pub const MIN_TOPIC_SCORE: u64 = 2;

/// Topic assigned by callers when nothing scores high enough
pub const DEFAULT_TOPIC: &str = "general";

/// Scores pages against an ordered topic table
///
/// A topic's score is the number of case-insensitive keyword occurrences in
/// the text plus twice the occurrences in the URL. The best score wins when
/// it exceeds [`MIN_TOPIC_SCORE`]; ties go to the topic declared first.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    topics: Vec<Topic>,
}

#[derive(Debug, Clone)]
struct Topic {
    name: String,
    keywords: Vec<String>,
}

impl TopicClassifier {
    /// Builds a classifier from a topic table, keeping its order
    pub fn new(entries: &[TopicEntry]) -> Self {
        let topics = entries
            .iter()
            .map(|entry| Topic {
                name: entry.name.clone(),
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { topics }
    }

    /// Topic names in declaration order
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(|t| t.name.as_str())
    }

    /// Scores every topic, in declaration order
    pub fn scores(&self, text: &str, url: &str) -> Vec<(&str, u64)> {
        let text = text.to_lowercase();
        let url = url.to_lowercase();

        self.topics
            .iter()
            .map(|topic| {
                let score = topic
                    .keywords
                    .iter()
                    .map(|k| count_occurrences(&text, k) + 2 * count_occurrences(&url, k))
                    .sum();
                (topic.name.as_str(), score)
            })
            .collect()
    }

    /// Returns the best-scoring topic, if its score exceeds the threshold
    pub fn classify(&self, text: &str, url: &str) -> Option<String> {
        let mut best: Option<(&str, u64)> = None;
        for (name, score) in self.scores(text, url) {
            // Strictly greater keeps the earlier topic on ties
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name, score));
            }
        }

        best.filter(|(_, score)| *score > MIN_TOPIC_SCORE)
            .map(|(name, _)| name.to_string())
    }

    /// Like [`classify`](Self::classify) but falls back to [`DEFAULT_TOPIC`]
    pub fn classify_or_default(&self, text: &str, url: &str) -> String {
        self.classify(text, url)
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string())
    }
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new(&default_topics())
    }
}

/// Counts non-overlapping occurrences of `needle` in `haystack`
fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_page_classified() {
        let classifier = TopicClassifier::default();
        let text = "mysql tuning: mysql buffers, mysql logs and innodb";
        let url = "https://x/mysql-guide";

        assert_eq!(classifier.classify(text, url), Some("mysql".to_string()));

        // "sql" also matches inside every "mysql"
        let scores = classifier.scores(text, url);
        let mysql = scores.iter().find(|(name, _)| *name == "mysql").unwrap();
        assert_eq!(mysql.1, (3 + 1 + 2) + (3 + 2));
    }

    #[test]
    fn test_low_scores_fall_back_to_general() {
        let classifier = TopicClassifier::default();
        let text = "hello world";

        assert_eq!(classifier.classify(text, "https://example.com/"), None);
        assert_eq!(
            classifier.classify_or_default(text, "https://example.com/"),
            "general"
        );
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let classifier = TopicClassifier::new(&[TopicEntry::new("vmware", &["esxi"])]);

        assert_eq!(classifier.classify("esxi esxi", "https://h/"), None);
        assert_eq!(
            classifier.classify("esxi esxi esxi", "https://h/"),
            Some("vmware".to_string())
        );
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let classifier = TopicClassifier::new(&[
            TopicEntry::new("first", &["alpha"]),
            TopicEntry::new("second", &["beta"]),
        ]);

        let text = "alpha alpha alpha beta beta beta";
        assert_eq!(
            classifier.classify(text, "https://h/"),
            Some("first".to_string())
        );

        let reversed = TopicClassifier::new(&[
            TopicEntry::new("second", &["beta"]),
            TopicEntry::new("first", &["alpha"]),
        ]);
        assert_eq!(
            reversed.classify(text, "https://h/"),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_url_counts_double() {
        let classifier = TopicClassifier::new(&[
            TopicEntry::new("text", &["alpha"]),
            TopicEntry::new("url", &["beta"]),
        ]);

        let scores = classifier.scores("alpha alpha alpha", "https://h/beta/beta");
        assert_eq!(scores, vec![("text", 3), ("url", 4)]);
        assert_eq!(
            classifier.classify("alpha alpha alpha", "https://h/beta/beta"),
            Some("url".to_string())
        );
    }

    #[test]
    fn test_case_insensitive_non_overlapping() {
        let classifier = TopicClassifier::new(&[TopicEntry::new("t", &["aa"])]);
        let scores = classifier.scores("AAAA aA", "");
        assert_eq!(scores, vec![("t", 3)]);
    }

    #[test]
    fn test_default_table_order() {
        let classifier = TopicClassifier::default();
        let names: Vec<_> = classifier.topic_names().collect();
        assert_eq!(names.len(), 11);
        assert_eq!(names[0], "linux");
        assert_eq!(names[10], "vulnerabilities");
    }
}
