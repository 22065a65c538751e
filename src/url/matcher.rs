/// Checks whether `candidate` belongs to the site rooted at `base_host`
///
/// The candidate matches when it equals the base host or is one of its
/// subdomains. Comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::is_same_site;
///
/// assert!(is_same_site("example.com", "example.com"));
/// assert!(is_same_site("example.com", "Docs.Example.COM"));
/// assert!(!is_same_site("example.com", "notexample.com"));
/// assert!(!is_same_site("docs.example.com", "example.com"));
/// ```
pub fn is_same_site(base_host: &str, candidate: &str) -> bool {
    if base_host.is_empty() || candidate.is_empty() {
        return false;
    }

    let base = base_host.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    candidate == base || candidate.ends_with(&format!(".{}", base))
}
