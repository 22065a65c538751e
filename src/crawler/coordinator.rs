//! Crawl orchestrator - task lifecycle and the per-site crawl loop
//!
//! A task moves `started → running → {completed | failed | stopped}`:
//! - [`Orchestrator::start_crawl`] reserves the single running slot and
//!   records the task
//! - [`Orchestrator::run_crawl`] visits the seed sites in order, one at a
//!   time, and processes the links of each seed page with a bounded pool
//! - [`Orchestrator::stop_crawl`] cancels cooperatively; a request already
//!   sent completes and its page is still processed, later units see the
//!   token and do nothing
//!
//! Whatever way a run ends, the running slot and its task id are released.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchOutcome, FetchedPage, Fetcher, RetryPolicy};
use crate::crawler::gate::{PageGate, SkipReason};
use crate::crawler::limiter::{pause, RateLimiter};
use crate::crawler::parser::candidate_links;
use crate::events::{CrawlEvent, EventKind, EventReporter, EventSink};
use crate::output::{MarkdownExporter, NEVER};
use crate::robots::{RobotsCache, RobotsPolicy};
use crate::state::TaskStatus;
use crate::storage::Storage;
use crate::topics::TopicClassifier;
use crate::url::{extract_domain, LinkFilter};
use crate::{CrawlError, Result};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

/// The crawler's single running slot
#[derive(Debug, Default)]
struct RunState {
    task_id: Option<String>,
    cancel: Option<CancellationToken>,
}

/// Clears the running slot when a run ends, however it ends
struct RunGuard<'a> {
    state: &'a Mutex<RunState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = RunState::default();
    }
}

// Run state stays consistent under panic: every write replaces whole fields
fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything one crawl needs besides the orchestrator itself
struct CrawlContext {
    client: Client,
    fetcher: Fetcher,
    reporter: EventReporter,
    cancel: CancellationToken,
}

impl CrawlContext {
    fn new(
        client: Client,
        retry: RetryPolicy,
        reporter: EventReporter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(client.clone(), retry),
            client,
            reporter,
            cancel,
        }
    }

    fn event(&self, kind: EventKind) -> CrawlEvent {
        self.reporter.event(kind)
    }

    fn publish(&self, event: CrawlEvent) {
        self.reporter.publish(event);
    }
}

/// How the crawl of one seed site ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SiteOutcome {
    /// The seed page was fetched and its links processed
    Crawled,
    RobotsDisallowed,
    HttpError { status: u16 },
    NotHtml,
    TooLarge,
    Failed { error: String },
    Cancelled,
}

/// Summary of one seed site crawl
#[derive(Debug, Clone, Serialize)]
pub struct SiteReport {
    pub url: String,
    pub outcome: SiteOutcome,
    pub links_found: usize,
    pub pages_saved: usize,
    pub pages_skipped: usize,
    pub pages_failed: usize,
}

impl SiteReport {
    fn new(url: &Url, outcome: SiteOutcome) -> Self {
        Self {
            url: url.to_string(),
            outcome,
            links_found: 0,
            pages_saved: 0,
            pages_skipped: 0,
            pages_failed: 0,
        }
    }

    fn record(&mut self, outcome: LinkOutcome) {
        match outcome {
            LinkOutcome::Saved => self.pages_saved += 1,
            LinkOutcome::Skipped => self.pages_skipped += 1,
            LinkOutcome::Failed => self.pages_failed += 1,
            LinkOutcome::Cancelled => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkOutcome {
    Saved,
    Skipped,
    Failed,
    Cancelled,
}

/// Snapshot of the crawler for status displays
#[derive(Debug, Clone, Serialize)]
pub struct CrawlerStatus {
    pub is_running: bool,
    pub task_id: Option<String>,
    /// Percentage of seed sites done in the current task
    pub progress: f64,
    pub sites_crawled: u64,
    pub pages_found: u64,
    pub last_update: String,
}

/// Drives crawl tasks
///
/// One instance owns the running slot; share it as `Arc<Orchestrator>`.
pub struct Orchestrator {
    config: Arc<Config>,
    storage: Arc<dyn Storage>,
    events: Arc<dyn EventSink>,
    robots: RobotsCache,
    limiter: RateLimiter,
    gate: PageGate,
    classifier: TopicClassifier,
    exporter: Option<MarkdownExporter>,
    retry: RetryPolicy,
    state: Mutex<RunState>,
}

impl Orchestrator {
    /// Creates an idle orchestrator
    ///
    /// # Example
    ///
    /// ```no_run
    /// use knowledge_crawler::config::Config;
    /// use knowledge_crawler::events::EventBus;
    /// use knowledge_crawler::storage::SqliteStorage;
    /// use knowledge_crawler::Orchestrator;
    /// use std::sync::Arc;
    ///
    /// # async fn run() -> knowledge_crawler::Result<()> {
    /// let storage = Arc::new(SqliteStorage::new_in_memory()?);
    /// let orchestrator = Arc::new(Orchestrator::new(
    ///     Config::default(),
    ///     storage,
    ///     Arc::new(EventBus::new()),
    /// ));
    /// let (_task_id, handle) = orchestrator.spawn_crawl()?;
    /// let status = handle.await??;
    /// println!("Crawl ended: {}", status);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config, storage: Arc<dyn Storage>, events: Arc<dyn EventSink>) -> Self {
        let robots = RobotsCache::new(&config.crawler.user_agent, config.crawler.respect_robots);
        let limiter = RateLimiter::from_secs_f64(config.crawler.min_delay_secs);
        let classifier = TopicClassifier::new(&config.topics);
        let exporter = config
            .output
            .export_markdown
            .then(|| MarkdownExporter::new(&config.output.storage_path));

        Self {
            config: Arc::new(config),
            storage,
            events,
            robots,
            limiter,
            gate: PageGate::default(),
            classifier,
            exporter,
            retry: RetryPolicy::default(),
            state: Mutex::new(RunState::default()),
        }
    }

    /// Replaces the fetch retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the page gate (text extraction and language detection)
    pub fn with_page_gate(mut self, gate: PageGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Returns true while a task holds the running slot
    pub fn is_running(&self) -> bool {
        lock(&self.state).task_id.is_some()
    }

    pub fn current_task_id(&self) -> Option<String> {
        lock(&self.state).task_id.clone()
    }

    /// Reserves the running slot and records a new task as `started`
    ///
    /// Fails with [`CrawlError::AlreadyRunning`] when a task is running; in
    /// that case nothing is changed.
    pub fn start_crawl(&self) -> Result<String> {
        let mut state = lock(&self.state);
        if let Some(task_id) = &state.task_id {
            return Err(CrawlError::AlreadyRunning {
                task_id: task_id.clone(),
            });
        }

        let task_id = Uuid::new_v4().to_string();
        self.storage.create_task(&task_id, TaskStatus::Started)?;

        state.task_id = Some(task_id.clone());
        state.cancel = Some(CancellationToken::new());

        info!("Created crawl task {}", task_id);
        Ok(task_id)
    }

    /// Starts a task and runs it on the tokio runtime
    pub fn spawn_crawl(self: &Arc<Self>) -> Result<(String, JoinHandle<Result<TaskStatus>>)> {
        let task_id = self.start_crawl()?;

        let orchestrator = Arc::clone(self);
        let id = task_id.clone();
        let handle = tokio::spawn(async move { orchestrator.run_crawl(&id).await });

        Ok((task_id, handle))
    }

    /// Runs the task reserved by [`Orchestrator::start_crawl`] to its end
    ///
    /// Returns the final status. Failures inside the run are recorded as
    /// `failed` rather than returned; only an unknown `task_id` is an error.
    pub async fn run_crawl(&self, task_id: &str) -> Result<TaskStatus> {
        let cancel = {
            let state = lock(&self.state);
            match (&state.task_id, &state.cancel) {
                (Some(current), Some(cancel)) if current == task_id => cancel.clone(),
                _ => return Err(CrawlError::UnknownTask(task_id.to_string())),
            }
        };
        let _guard = RunGuard { state: &self.state };
        let reporter = EventReporter::new(Arc::clone(&self.events), Some(task_id));

        let result = self.crawl_targets(task_id, &reporter, &cancel).await;

        let status = match result {
            Err(e) => {
                error!("Crawl task {} failed: {}", task_id, e);
                reporter.publish(
                    reporter
                        .event(EventKind::CrawlError)
                        .with("error", e.to_string()),
                );
                TaskStatus::Failed
            }
            Ok(()) if cancel.is_cancelled() => {
                info!("Crawl task {} stopped", task_id);
                reporter.publish(reporter.event(EventKind::CrawlStopped));
                TaskStatus::Stopped
            }
            Ok(()) => {
                info!("Crawl task {} completed", task_id);
                reporter.publish(reporter.event(EventKind::CrawlComplete));
                TaskStatus::Completed
            }
        };

        if let Err(e) = self.storage.update_task(task_id, status) {
            error!("Failed to record final status of task {}: {}", task_id, e);
        }

        Ok(status)
    }

    /// Asks the running task to stop
    ///
    /// Returns true if a running task was signalled.
    pub fn stop_crawl(&self) -> bool {
        let state = lock(&self.state);
        match (&state.task_id, &state.cancel) {
            (Some(task_id), Some(cancel)) => {
                info!("Stop requested for task {}", task_id);
                cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Current crawler status with database-wide counters
    pub fn status(&self) -> Result<CrawlerStatus> {
        let task_id = self.current_task_id();
        let progress = match &task_id {
            Some(id) => self
                .storage
                .get_task(id)?
                .map(|task| task.progress)
                .unwrap_or(0.0),
            None => 0.0,
        };

        Ok(CrawlerStatus {
            is_running: task_id.is_some(),
            task_id,
            progress,
            sites_crawled: self.storage.count_sites_crawled()?,
            pages_found: self.storage.count_articles()?,
            last_update: self
                .storage
                .last_update()?
                .unwrap_or_else(|| NEVER.to_string()),
        })
    }

    /// Crawls one site outside of any task
    ///
    /// Uses its own client and is not affected by [`Orchestrator::stop_crawl`].
    /// Rejected with [`CrawlError::AlreadyRunning`] while a task is running.
    pub async fn crawl_single_site(&self, url: &str) -> Result<SiteReport> {
        if let Some(task_id) = self.current_task_id() {
            return Err(CrawlError::AlreadyRunning { task_id });
        }

        let seed = Url::parse(url)?;
        let client = build_http_client(&self.config.crawler)?;
        let ctx = CrawlContext::new(
            client,
            self.retry,
            EventReporter::new(Arc::clone(&self.events), None),
            CancellationToken::new(),
        );

        info!("Crawling single site {}", seed);
        ctx.publish(ctx.event(EventKind::SiteBegin).with("url", seed.as_str()));
        Ok(self.crawl_site(&ctx, &seed).await)
    }

    async fn crawl_targets(
        &self,
        task_id: &str,
        reporter: &EventReporter,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.storage.update_task(task_id, TaskStatus::Running)?;

        let client = build_http_client(&self.config.crawler)?;

        let targets = &self.config.targets;
        let total = targets.len();
        info!("Crawl task {} started with {} seed sites", task_id, total);
        reporter.publish(reporter.event(EventKind::CrawlStart).with("sites", total));

        let ctx = CrawlContext::new(client, self.retry, reporter.clone(), cancel.clone());
        let site_pause = Duration::from_millis(self.config.crawler.site_pause_ms);

        for (i, target) in targets.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Stop requested, skipping {} remaining sites", total - i);
                break;
            }

            ctx.publish(
                ctx.event(EventKind::SiteBegin)
                    .with("url", target.as_str())
                    .with("index", i + 1)
                    .with("total", total),
            );

            match Url::parse(target) {
                Ok(seed) => {
                    let report = self.crawl_site(&ctx, &seed).await;
                    debug!("Site {} finished: {:?}", target, report);
                }
                Err(e) => {
                    warn!("Invalid seed URL {}: {}", target, e);
                    ctx.publish(
                        ctx.event(EventKind::SiteException)
                            .with("url", target.as_str())
                            .with("error", e.to_string()),
                    );
                }
            }

            let progress = (i + 1) as f64 / total as f64 * 100.0;
            self.storage.update_progress(task_id, progress)?;
            ctx.publish(ctx.event(EventKind::Progress).with("value", progress));

            if i + 1 < total {
                pause(site_pause, cancel).await;
            }
        }

        Ok(())
    }

    async fn crawl_site(&self, ctx: &CrawlContext, seed: &Url) -> SiteReport {
        match self.try_crawl_site(ctx, seed).await {
            Ok(report) => report,
            Err(e) => {
                warn!("Error crawling {}: {}", seed, e);
                ctx.publish(
                    ctx.event(EventKind::SiteException)
                        .with("url", seed.as_str())
                        .with("error", e.to_string()),
                );
                SiteReport::new(seed, SiteOutcome::Failed { error: e.to_string() })
            }
        }
    }

    async fn try_crawl_site(&self, ctx: &CrawlContext, seed: &Url) -> Result<SiteReport> {
        let base_host =
            extract_domain(seed).ok_or_else(|| CrawlError::InvalidSite(seed.to_string()))?;

        let policy = self.robots.get_policy(&ctx.client, seed).await;
        if !self.robots.allowed(policy.as_deref(), seed) {
            info!("robots.txt disallows seed {}", seed);
            ctx.publish(ctx.event(EventKind::RobotsDisallow).with("url", seed.as_str()));
            return Ok(SiteReport::new(seed, SiteOutcome::RobotsDisallowed));
        }

        if ctx.cancel.is_cancelled() {
            return Ok(SiteReport::new(seed, SiteOutcome::Cancelled));
        }

        let page = ctx
            .fetcher
            .fetch_once(seed)
            .await
            .map_err(|source| CrawlError::Http {
                url: seed.to_string(),
                source,
            })?;

        if page.status >= 400 {
            warn!("Seed {} returned HTTP {}", seed, page.status);
            ctx.publish(
                ctx.event(EventKind::SiteError)
                    .with("url", seed.as_str())
                    .with("status", page.status),
            );
            return Ok(SiteReport::new(
                seed,
                SiteOutcome::HttpError {
                    status: page.status,
                },
            ));
        }

        if !page.is_html() {
            info!("Seed {} is not HTML, skipping site", seed);
            ctx.publish(
                ctx.event(EventKind::SiteSkip)
                    .with("url", seed.as_str())
                    .with("reason", SkipReason::NonHtml.as_str()),
            );
            return Ok(SiteReport::new(seed, SiteOutcome::NotHtml));
        }

        if page.exceeds_limit() {
            info!("Seed {} is too large, skipping site", seed);
            ctx.publish(
                ctx.event(EventKind::SiteSkip)
                    .with("url", seed.as_str())
                    .with("reason", SkipReason::TooLarge.as_str()),
            );
            return Ok(SiteReport::new(seed, SiteOutcome::TooLarge));
        }

        let filter = LinkFilter::new(&base_host, self.config.crawler.allow_private_hosts);
        let links = candidate_links(
            &page.body,
            seed,
            &filter,
            self.config.crawler.max_links_per_site,
        );

        info!("Found {} links on {}", links.len(), seed);
        ctx.publish(
            ctx.event(EventKind::SiteLinks)
                .with("url", seed.as_str())
                .with("count", links.len()),
        );

        let mut report = SiteReport::new(seed, SiteOutcome::Crawled);
        report.links_found = links.len();

        let policy = policy.as_deref();
        let outcomes: Vec<LinkOutcome> = stream::iter(links)
            .map(move |link| self.process_link(ctx, link, policy))
            .buffer_unordered(self.config.crawler.max_concurrent_links.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.record(outcome);
        }

        ctx.publish(
            ctx.event(EventKind::SiteComplete)
                .with("url", seed.as_str())
                .with("saved", report.pages_saved)
                .with("skipped", report.pages_skipped)
                .with("failed", report.pages_failed),
        );

        Ok(report)
    }

    async fn process_link(
        &self,
        ctx: &CrawlContext,
        link: Url,
        policy: Option<&RobotsPolicy>,
    ) -> LinkOutcome {
        if ctx.cancel.is_cancelled() {
            return LinkOutcome::Cancelled;
        }

        if !self.robots.allowed(policy, &link) {
            debug!("robots.txt disallows {}", link);
            ctx.publish(ctx.event(EventKind::RobotsDisallow).with("url", link.as_str()));
            return LinkOutcome::Skipped;
        }

        let delay = self
            .limiter
            .delay_before_next_fetch(self.robots.crawl_delay(policy));
        if !pause(delay, &ctx.cancel).await {
            return LinkOutcome::Cancelled;
        }

        let page = match ctx.fetcher.fetch(&link, &ctx.reporter, &ctx.cancel).await {
            FetchOutcome::Page(page) => page,
            FetchOutcome::Cancelled => return LinkOutcome::Cancelled,
            FetchOutcome::HttpError { .. } | FetchOutcome::GaveUp { .. } => {
                return LinkOutcome::Failed
            }
        };

        match self.accept_page(ctx, &link, page).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Error processing {}: {}", link, e);
                ctx.publish(
                    ctx.event(EventKind::PageException)
                        .with("url", link.as_str())
                        .with("error", e.to_string()),
                );
                LinkOutcome::Failed
            }
        }
    }

    async fn accept_page(
        &self,
        ctx: &CrawlContext,
        link: &Url,
        page: FetchedPage,
    ) -> Result<LinkOutcome> {
        let accepted = match self.gate.evaluate(page).await? {
            Ok(accepted) => accepted,
            Err(reason) => {
                debug!("Skipping {}: {}", link, reason);
                let mut event = ctx
                    .event(reason.event_kind())
                    .with("url", link.as_str())
                    .with("reason", reason.as_str());
                match &reason {
                    SkipReason::NonEnglish(lang) => event = event.with("lang", lang.as_str()),
                    SkipReason::LangDetectFailed(error) => {
                        event = event.with("error", error.as_str())
                    }
                    _ => {}
                }
                ctx.publish(event);
                return Ok(LinkOutcome::Skipped);
            }
        };

        let topic = self
            .classifier
            .classify_or_default(&accepted.text, link.as_str());

        self.storage.save_article(
            link.as_str(),
            accepted.title.as_deref(),
            &accepted.text,
            &topic,
        )?;

        if let Some(exporter) = &self.exporter {
            exporter.export(link, &topic, &accepted.text)?;
        }

        info!("Saved {} ({})", link, topic);
        ctx.publish(
            ctx.event(EventKind::PageSaved)
                .with("url", link.as_str())
                .with("topic", topic.as_str()),
        );

        Ok(LinkOutcome::Saved)
    }
}
