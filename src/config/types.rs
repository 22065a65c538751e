use serde::Deserialize;

/// Seed sites crawled when the configuration does not list any
pub const DEFAULT_TARGETS: &[&str] = &[
    "https://www.digitalocean.com/community/tutorials",
    "https://linuxize.com",
    "https://www.tecmint.com",
    "https://www.howtoforge.com",
    "https://www.cyberciti.biz",
    "https://wiki.archlinux.org",
    "https://ubuntu.com/server/docs",
];

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Seed sites, crawled once per task in this order
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,

    /// Topic table; declaration order breaks classification ties
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// User-agent sent with every request and matched against robots.txt
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum politeness delay before each page fetch (seconds)
    #[serde(rename = "min-delay-secs", default = "default_min_delay")]
    pub min_delay_secs: f64,

    /// Per-request HTTP timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Whether robots.txt rules and crawl-delay are honoured
    #[serde(rename = "respect-robots", default = "default_true")]
    pub respect_robots: bool,

    /// Maximum number of links followed from one seed page
    #[serde(rename = "max-links-per-site", default = "default_max_links")]
    pub max_links_per_site: usize,

    /// Maximum number of links processed concurrently within a site
    #[serde(rename = "max-concurrent-links", default = "default_concurrency")]
    pub max_concurrent_links: usize,

    /// Pause between two seed sites (milliseconds)
    #[serde(rename = "site-pause-ms", default = "default_site_pause")]
    pub site_pause_ms: u64,

    /// Allow loopback and private hosts (local mirrors only)
    #[serde(rename = "allow-private-hosts", default)]
    pub allow_private_hosts: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory for exported markdown files
    #[serde(rename = "storage-path", default = "default_storage_path")]
    pub storage_path: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Whether saved articles are also written as markdown files
    #[serde(rename = "export-markdown", default = "default_true")]
    pub export_markdown: bool,
}

/// One topic of the classification table
#[derive(Debug, Clone, Deserialize)]
pub struct TopicEntry {
    /// Topic name stored with classified articles
    pub name: String,

    /// Keywords counted case-insensitively in page text and URL
    pub keywords: Vec<String>,
}

impl TopicEntry {
    pub fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            output: OutputConfig::default(),
            targets: default_targets(),
            topics: default_topics(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            min_delay_secs: default_min_delay(),
            timeout_secs: default_timeout(),
            respect_robots: true,
            max_links_per_site: default_max_links(),
            max_concurrent_links: default_concurrency(),
            site_pause_ms: default_site_pause(),
            allow_private_hosts: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            database_path: default_database_path(),
            export_markdown: true,
        }
    }
}

fn default_user_agent() -> String {
    "ServerAI Knowledge Engine Bot 1.0".to_string()
}

fn default_min_delay() -> f64 {
    2.0
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_links() -> usize {
    50
}

fn default_concurrency() -> usize {
    5
}

fn default_site_pause() -> u64 {
    1000
}

fn default_storage_path() -> String {
    "./storage".to_string()
}

fn default_database_path() -> String {
    "./storage/knowledge.db".to_string()
}

fn default_targets() -> Vec<String> {
    DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect()
}

/// The built-in topic table
pub fn default_topics() -> Vec<TopicEntry> {
    vec![
        TopicEntry::new(
            "linux",
            &["linux", "ubuntu", "centos", "debian", "rhel", "bash", "shell"],
        ),
        TopicEntry::new(
            "networking",
            &["network", "tcp", "ip", "dns", "dhcp", "vpn", "firewall"],
        ),
        TopicEntry::new("mysql", &["mysql", "mariadb", "database", "sql", "innodb"]),
        TopicEntry::new("apache", &["apache", "httpd", "mod_rewrite", "virtual host"]),
        TopicEntry::new(
            "security",
            &["security", "ssl", "tls", "encryption", "vulnerability"],
        ),
        TopicEntry::new("dns", &["dns", "bind", "nameserver", "domain", "zone"]),
        TopicEntry::new("vmware", &["vmware", "esxi", "vcenter", "virtualization"]),
        TopicEntry::new("cloud", &["aws", "azure", "gcp", "cloud", "ec2", "s3"]),
        TopicEntry::new("email", &["email", "postfix", "exim", "dovecot", "smtp"]),
        TopicEntry::new(
            "web_troubleshooting",
            &["troubleshoot", "debug", "error", "performance"],
        ),
        TopicEntry::new(
            "vulnerabilities",
            &["cve", "exploit", "patch", "malware", "rootkit"],
        ),
    ]
}
