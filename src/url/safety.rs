//! URL safety filter for candidate links

use std::net::IpAddr;
use url::{Host, Url};

use super::matcher::is_same_site;

/// Returns true if `url` may be fetched while crawling the site `base_host`
///
/// All of the following must hold:
/// - the scheme is `http` or `https`
/// - the host is not `localhost`, `127.0.0.1`, or a `.local` name
/// - a literal IP host is not private, loopback, link-local, or unspecified
/// - the host is `base_host` or one of its subdomains
///
/// Unparseable URLs are rejected.
///
/// # Examples
///
/// ```
/// use knowledge_crawler::url::is_safe;
///
/// assert!(is_safe("https://example.com/a", "example.com"));
/// assert!(is_safe("https://docs.example.com/b", "example.com"));
/// assert!(!is_safe("ftp://example.com/c", "example.com"));
/// assert!(!is_safe("http://10.0.0.5/", "example.com"));
/// assert!(!is_safe("https://other.org/", "example.com"));
/// ```
pub fn is_safe(url: &str, base_host: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => LinkFilter::new(base_host, false).allows(&parsed),
        Err(_) => false,
    }
}

/// Same-site link filter for one seed site
///
/// With `allow_private_hosts` set, the loopback and private address rules are
/// skipped; the scheme and same-site rules still apply. This is only meant
/// for crawling local mirrors.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    base_host: String,
    allow_private_hosts: bool,
}

impl LinkFilter {
    pub fn new(base_host: &str, allow_private_hosts: bool) -> Self {
        Self {
            base_host: base_host.to_ascii_lowercase(),
            allow_private_hosts,
        }
    }

    /// The host this filter confines links to
    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    /// Returns true if the link passes every rule of the filter
    pub fn allows(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        let host = match url.host_str() {
            Some(h) => h.to_ascii_lowercase(),
            None => return false,
        };

        if !self.allow_private_hosts && is_restricted_host(url, &host) {
            return false;
        }

        let bare_host = host.trim_start_matches('[').trim_end_matches(']');
        is_same_site(&self.base_host, bare_host)
    }
}

fn is_restricted_host(url: &Url, host: &str) -> bool {
    if host == "localhost" || host == "127.0.0.1" || host.ends_with(".local") {
        return true;
    }

    match url.host() {
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
        _ => false,
    }
}

/// Returns true for loopback, private, link-local, and unspecified addresses
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_loopback()
                || ipv4.is_private()
                || ipv4.is_link_local()
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            // Unique local (fc00::/7)
            if (ipv6.segments()[0] & 0xfe00) == 0xfc00 {
                return true;
            }
            // Link-local (fe80::/10)
            if (ipv6.segments()[0] & 0xffc0) == 0xfe80 {
                return true;
            }
            // IPv4-mapped addresses follow the IPv4 rules
            match ipv6.to_ipv4_mapped() {
                Some(ipv4) => is_private_ip(IpAddr::V4(ipv4)),
                None => false,
            }
        }
    }
}
