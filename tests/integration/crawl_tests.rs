//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use knowledge_crawler::config::Config;
use knowledge_crawler::crawler::{Orchestrator, RetryPolicy, SiteOutcome};
use knowledge_crawler::events::{CrawlEvent, EventBus, EventKind};
use knowledge_crawler::storage::{SqliteStorage, Storage};
use knowledge_crawler::{CrawlError, TaskStatus};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE_SENTENCE: &str = "MySQL and MariaDB administrators tune the InnoDB storage engine so that every database query runs faster. ";

/// Creates a test configuration crawling the given seeds quickly
fn create_test_config(targets: Vec<String>, storage_dir: &Path) -> Config {
    let mut config = Config::default();
    config.targets = targets;
    config.crawler.min_delay_secs = 0.0;
    config.crawler.site_pause_ms = 0;
    config.crawler.allow_private_hosts = true;
    config.output.storage_path = storage_dir.join("articles").display().to_string();
    config.output.database_path = storage_dir.join("knowledge.db").display().to_string();
    config
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(10),
        factor: 2,
    }
}

fn build(config: Config) -> (Arc<Orchestrator>, Arc<SqliteStorage>, Arc<EventBus>) {
    let storage =
        Arc::new(SqliteStorage::new(Path::new(&config.output.database_path)).unwrap());
    let bus = Arc::new(EventBus::new());
    let orchestrator =
        Orchestrator::new(config, storage.clone(), bus.clone()).with_retry_policy(fast_retry());
    (Arc::new(orchestrator), storage, bus)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn article_page(title: &str) -> ResponseTemplate {
    html(format!(
        "<html><head><title>{}</title></head><body><main><p>{}</p></main></body></html>",
        title,
        ARTICLE_SENTENCE.repeat(8)
    ))
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn events_of(bus: &EventBus, kind: EventKind) -> Vec<CrawlEvent> {
    bus.recent(500).into_iter().filter(|e| e.is(kind)).collect()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow: /private\n").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r##"<html><head><title>Home</title></head><body>
                <a href="/guide">Guide</a>
                <a href="/guide#tuning">Guide again</a>
                <a href="/private/secret">Secret</a>
                <a href="{}/short">Short</a>
                <a href="/hidden" rel="nofollow">Hidden</a>
                <a href="https://other.org/elsewhere">Elsewhere</a>
            </body></html>"##,
            base
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(article_page("MySQL Tuning Guide"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/short"))
        .respond_with(html(
            "<html><body><p>Too little text here.</p></body></html>".to_string(),
        ))
        .expect(1)
        .mount(&server)
        .await;

    // Disallowed by robots.txt
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(article_page("Secret"))
        .expect(0)
        .mount(&server)
        .await;

    // rel="nofollow"
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(article_page("Hidden"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/", base)], dir.path());
    let export_root = config.output.storage_path.clone();
    let (orchestrator, storage, bus) = build(config);

    let task_id = orchestrator.start_crawl().unwrap();
    let status = orchestrator.run_crawl(&task_id).await.unwrap();
    assert_eq!(status, TaskStatus::Completed);

    // Article saved and classified
    let article = storage
        .get_article(&format!("{}/guide", base))
        .unwrap()
        .expect("guide should be saved");
    assert_eq!(article.topic, "mysql");
    assert_eq!(article.title.as_deref(), Some("MySQL Tuning Guide"));
    assert_eq!(storage.count_articles().unwrap(), 1);

    // Task record
    let task = storage.get_task(&task_id).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100.0);

    // Events
    let links = events_of(&bus, EventKind::SiteLinks);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].get("count").and_then(|v| v.as_u64()), Some(3));

    let disallowed = events_of(&bus, EventKind::RobotsDisallow);
    assert_eq!(disallowed.len(), 1);
    assert_eq!(
        disallowed[0].get_str("url"),
        Some(format!("{}/private/secret", base).as_str())
    );

    let skipped = events_of(&bus, EventKind::ExtractSkip);
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].get_str("reason"), Some("too-short"));

    let saved = events_of(&bus, EventKind::PageSaved);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].get_str("topic"), Some("mysql"));
    assert!(saved.iter().all(|e| e.task_id.as_deref() == Some(task_id.as_str())));

    let kinds: Vec<String> = bus.recent(500).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds.first().map(String::as_str), Some("crawl.start"));
    assert_eq!(kinds.last().map(String::as_str), Some("crawl.complete"));

    // Markdown export
    let exported: Vec<_> = std::fs::read_dir(Path::new(&export_root).join("mysql"))
        .unwrap()
        .collect();
    assert_eq!(exported.len(), 1);

    // Running slot released
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_robots_disallowed_seed_is_never_fetched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(article_page("Home"))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/", server.uri())], dir.path());
    let (orchestrator, storage, bus) = build(config);

    let task_id = orchestrator.start_crawl().unwrap();
    let status = orchestrator.run_crawl(&task_id).await.unwrap();

    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(events_of(&bus, EventKind::RobotsDisallow).len(), 1);
    assert!(events_of(&bus, EventKind::SiteLinks).is_empty());
    assert_eq!(storage.count_articles().unwrap(), 0);
}

#[tokio::test]
async fn test_robots_failure_allows_crawling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/guide">Guide</a></body></html>"#.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(article_page("Guide"))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/", server.uri())], dir.path());
    let (orchestrator, storage, _bus) = build(config);

    let task_id = orchestrator.start_crawl().unwrap();
    orchestrator.run_crawl(&task_id).await.unwrap();

    assert_eq!(storage.count_articles().unwrap(), 1);
}

#[tokio::test]
async fn test_rate_limited_link_gives_up() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/busy">Busy</a></body></html>"#.to_string()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let config = create_test_config(vec![format!("{}/", server.uri())], dir.path());
    let (orchestrator, storage, bus) = build(config);

    let task_id = orchestrator.start_crawl().unwrap();
    let status = orchestrator.run_crawl(&task_id).await.unwrap();

    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(events_of(&bus, EventKind::FetchBackoff).len(), 2);
    assert_eq!(events_of(&bus, EventKind::FetchGiveUp).len(), 1);
    assert_eq!(storage.count_articles().unwrap(), 0);
}

#[tokio::test]
async fn test_seed_errors_are_reported() {
    let broken = MockServer::start().await;
    let binary = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&broken)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(vec![0u8; 16]),
        )
        .mount(&binary)
        .await;

    let config = create_test_config(
        vec![format!("{}/", broken.uri()), format!("{}/", binary.uri())],
        dir.path(),
    );
    let (orchestrator, _storage, bus) = build(config);

    let task_id = orchestrator.start_crawl().unwrap();
    let status = orchestrator.run_crawl(&task_id).await.unwrap();
    assert_eq!(status, TaskStatus::Completed);

    let errors = events_of(&bus, EventKind::SiteError);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].get("status").and_then(|v| v.as_u64()), Some(503));

    let skips = events_of(&bus, EventKind::SiteSkip);
    assert_eq!(skips.len(), 1);
    assert_eq!(skips[0].get_str("reason"), Some("non-html"));

    let progress: Vec<f64> = events_of(&bus, EventKind::Progress)
        .iter()
        .filter_map(|e| e.get("value").and_then(|v| v.as_f64()))
        .collect();
    assert_eq!(progress, vec![50.0, 100.0]);
}

#[tokio::test]
async fn test_stop_mid_crawl_skips_remaining_sites() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&first, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>No links</body></html>".to_string()))
        .mount(&first)
        .await;

    // Nothing of the second site may be requested, robots.txt included
    Mock::given(method("GET"))
        .respond_with(article_page("Second"))
        .expect(0)
        .mount(&second)
        .await;

    let mut config = create_test_config(
        vec![format!("{}/", first.uri()), format!("{}/", second.uri())],
        dir.path(),
    );
    config.crawler.site_pause_ms = 60_000;
    let (orchestrator, storage, bus) = build(config);

    let mut events = bus.subscribe();
    let (task_id, handle) = orchestrator.spawn_crawl().unwrap();

    // Stop once the first site is done, during the pause between sites
    loop {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("progress event in time")
            .expect("bus open");
        if event.is(EventKind::Progress) {
            break;
        }
    }
    assert!(orchestrator.stop_crawl());

    let status = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("crawl stops promptly")
        .unwrap()
        .unwrap();

    assert_eq!(status, TaskStatus::Stopped);
    assert_eq!(
        storage.get_task(&task_id).unwrap().unwrap().status,
        TaskStatus::Stopped
    );
    assert_eq!(events_of(&bus, EventKind::SiteBegin).len(), 1);
    assert_eq!(events_of(&bus, EventKind::CrawlStopped).len(), 1);
    assert!(!orchestrator.is_running());
}

#[tokio::test]
async fn test_stop_while_link_in_flight_saves_it() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body>
                <a href="/slow">Slow</a>
                <a href="/next">Next</a>
                <a href="/last">Last</a>
            </body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(article_page("Slow Guide").set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;

    // Not started when the stop arrives
    for later in ["/next", "/last"] {
        Mock::given(method("GET"))
            .and(path(later))
            .respond_with(article_page("Later"))
            .expect(0)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(vec![format!("{}/", server.uri())], dir.path());
    config.crawler.max_concurrent_links = 1;
    let (orchestrator, storage, bus) = build(config);

    let (task_id, handle) = orchestrator.spawn_crawl().unwrap();

    // Stop once the slow link has been requested, before it is answered
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.iter().any(|r| r.url.path() == "/slow") {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "slow link never requested"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(orchestrator.stop_crawl());

    let status = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("crawl stops promptly")
        .unwrap()
        .unwrap();

    assert_eq!(status, TaskStatus::Stopped);
    assert_eq!(
        storage.get_task(&task_id).unwrap().unwrap().status,
        TaskStatus::Stopped
    );

    // The request already sent completes and its page is kept
    assert!(storage
        .get_article(&format!("{}/slow", server.uri()))
        .unwrap()
        .is_some());
    assert_eq!(storage.count_articles().unwrap(), 1);
    assert_eq!(events_of(&bus, EventKind::PageSaved).len(), 1);
    assert_eq!(events_of(&bus, EventKind::CrawlStopped).len(), 1);
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>No links</body></html>".to_string()))
        .mount(&server)
        .await;

    let mut config = create_test_config(
        vec![format!("{}/", server.uri()), format!("{}/", server.uri())],
        dir.path(),
    );
    config.crawler.site_pause_ms = 60_000;
    let (orchestrator, storage, _bus) = build(config);

    let (task_id, handle) = orchestrator.spawn_crawl().unwrap();

    match orchestrator.spawn_crawl() {
        Err(CrawlError::AlreadyRunning { task_id: running }) => assert_eq!(running, task_id),
        Err(other) => panic!("expected AlreadyRunning, got {:?}", other),
        Ok(_) => panic!("second crawl must be rejected"),
    }
    assert_eq!(orchestrator.current_task_id(), Some(task_id.clone()));
    assert_eq!(storage.get_latest_task().unwrap().unwrap().id, task_id);

    orchestrator.stop_crawl();
    let status = handle.await.unwrap().unwrap();
    assert_eq!(status, TaskStatus::Stopped);
}

#[tokio::test]
async fn test_crawl_single_site() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/guide">Guide</a><a href="/missing">Gone</a></body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(article_page("Guide"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(vec![], dir.path());
    config.output.export_markdown = false;
    let (orchestrator, storage, bus) = build(config);

    let report = orchestrator
        .crawl_single_site(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(report.outcome, SiteOutcome::Crawled);
    assert_eq!(report.links_found, 2);
    assert_eq!(report.pages_saved, 1);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(storage.count_articles().unwrap(), 1);
    assert_eq!(events_of(&bus, EventKind::FetchError).len(), 1);
    assert!(bus.recent(500).iter().all(|e| e.task_id.is_none()));
}
