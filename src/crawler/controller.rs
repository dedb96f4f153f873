use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::browser::{BehaviorSimulator, Renderer};
use crate::cli::config::CrawlerSettings;
use crate::crawler::extract::extract;
use crate::crawler::frontier::Frontier;
use crate::crawler::record::PageRecord;
use crate::crawler::url::{normalize, NormalizedUrl};
use crate::error::{CrawlError, RenderError, Result};
use crate::storage::{CheckpointStore, ResultSet};
use crate::utils::CrawlStats;

/// Crawl-level state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    /// Frontier empty
    Drained,
    /// Stopped between pages by a [`StopSignal`]
    Cancelled,
    /// Renderer unusable for every remaining URL
    Aborted,
}

/// External stop request, honored between frontier iterations
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-seed crawl state. The base domain is fixed from the seed and never
/// recomputed. The frontier belongs to the controller, so a URL reached
/// from several seeds is still visited once.
#[derive(Debug)]
pub struct CrawlSession {
    seed: NormalizedUrl,
    base_domain: String,
    state: CrawlState,
}

impl CrawlSession {
    pub fn new(seed: &str) -> Result<Self> {
        let seed = normalize(seed);
        let base_domain = seed
            .host_key()
            .ok_or_else(|| CrawlError::InvalidSeed(seed.to_string()))?;

        Ok(Self {
            seed,
            base_domain,
            state: CrawlState::Running,
        })
    }

    pub fn seed(&self) -> &NormalizedUrl {
        &self.seed
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }
}

/// Outcome of a finished run
#[derive(Debug)]
pub struct CrawlReport {
    pub state: CrawlState,
    pub results: ResultSet,
    pub stats: CrawlStats,
}

/// Drives breadth-first crawls with a single renderer, checkpointing the
/// shared result set after every saved page.
pub struct CrawlerController<R: Renderer> {
    renderer: R,
    behavior: BehaviorSimulator,
    page_load_timeout: Duration,
    checkpoint: Box<dyn CheckpointStore>,
    frontier: Frontier,
    results: ResultSet,
    stats: CrawlStats,
    stop: StopSignal,
}

impl<R: Renderer> CrawlerController<R> {
    /// Create a controller around an already constructed renderer
    pub fn new(
        renderer: R,
        settings: &CrawlerSettings,
        checkpoint: Box<dyn CheckpointStore>,
        stop: StopSignal,
    ) -> Self {
        Self {
            renderer,
            behavior: BehaviorSimulator::new(settings),
            page_load_timeout: Duration::from_secs(settings.page_load_timeout),
            checkpoint,
            frontier: Frontier::new(),
            results: ResultSet::new(),
            stats: CrawlStats::new(),
            stop,
        }
    }

    /// Continue from the records of an earlier run. Saved pages are not
    /// rendered again and their unvisited internal links are queued ahead
    /// of the first seed.
    pub fn resume(mut self, previous: ResultSet) -> Self {
        let queued = self.frontier.restore(previous.records());
        info!(
            "Resuming from {} saved pages, {} URLs queued",
            previous.len(),
            queued
        );
        self.results = previous;
        self
    }

    /// Crawl every seed in turn, then close the renderer and write the
    /// final checkpoint whatever happened.
    pub async fn run(mut self, seeds: &[String]) -> Result<CrawlReport> {
        let span = info_span!("crawl", run_id = %Uuid::new_v4());

        let outcome = self.crawl_seeds(seeds).instrument(span.clone()).await;
        let teardown = self.teardown().instrument(span).await;

        let state = match (outcome, teardown) {
            (Err(e), teardown) => {
                if let Err(teardown_error) = teardown {
                    error!("Final checkpoint also failed: {}", teardown_error);
                }
                return Err(e);
            }
            (Ok(_), Err(e)) => return Err(e),
            (Ok(state), Ok(())) => state,
        };

        Ok(CrawlReport {
            state,
            results: self.results,
            stats: self.stats,
        })
    }

    async fn crawl_seeds(&mut self, seeds: &[String]) -> Result<CrawlState> {
        for seed in seeds {
            let mut session = CrawlSession::new(seed)?;
            let span = info_span!("seed", url = %session.seed);

            self.crawl(&mut session).instrument(span).await?;
            if session.state() == CrawlState::Cancelled {
                return Ok(CrawlState::Cancelled);
            }
        }

        Ok(CrawlState::Drained)
    }

    /// Run one session until its frontier drains, a stop is requested, or
    /// the renderer is lost.
    pub async fn crawl(&mut self, session: &mut CrawlSession) -> Result<()> {
        info!("Crawling {} (base domain {})", session.seed, session.base_domain);
        if !self.frontier.push(session.seed.clone()) {
            info!("{} was already crawled in this run", session.seed);
        }
        let mut first_page = true;

        while self.frontier.pending() > 0 {
            if !first_page {
                self.behavior.pause_between_pages().await;
            }
            first_page = false;

            // Checked after the pause so a stop during it takes effect
            if self.stop.is_triggered() {
                info!(
                    "Stop requested, leaving {} URLs unvisited",
                    self.frontier.pending()
                );
                session.state = CrawlState::Cancelled;
                return Ok(());
            }

            let Some(url) = self.frontier.dequeue() else {
                break;
            };

            info!("Scraping: {}", url);
            let timer = self.stats.start_timer();

            match self.process_page(&session.base_domain, &url).await {
                Ok(record) => {
                    let queued = record
                        .internal_links
                        .iter()
                        .filter(|link| self.frontier.push((*link).clone()))
                        .count();
                    debug!(
                        "Queued {} new URLs from {} ({} pending)",
                        queued,
                        url,
                        self.frontier.pending()
                    );

                    self.results.push(record);
                    self.stats.record_saved(timer.end());
                    self.save_progress().await;
                }
                Err(e) if e.is_recoverable() => {
                    warn!("Error scraping {}: {}", url, e);
                    self.stats.record_abandoned();
                }
                Err(e) => {
                    error!("Renderer unusable, aborting crawl of {}: {}", session.seed, e);
                    session.state = CrawlState::Aborted;
                    return Err(CrawlError::Aborted {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }
        }

        info!(
            "Finished {}: {} URLs visited so far",
            session.seed,
            self.frontier.visited_count()
        );
        session.state = CrawlState::Drained;
        Ok(())
    }

    async fn process_page(
        &mut self,
        base_domain: &str,
        url: &NormalizedUrl,
    ) -> std::result::Result<PageRecord, RenderError> {
        self.renderer.navigate(url.as_str()).await?;
        self.renderer.wait_until_loaded(self.page_load_timeout).await?;
        self.behavior.trigger_dynamic_content(&self.renderer).await?;

        let extraction = extract(&self.renderer, base_domain, url.as_str()).await?;

        Ok(PageRecord::new(
            url.clone(),
            extraction.metadata,
            extraction.content_text,
            extraction.content_html,
            &extraction.links,
        ))
    }

    async fn save_progress(&mut self) {
        match self.checkpoint.flush(&self.results).await {
            Ok(()) => info!("Saved {} pages", self.results.len()),
            Err(e) => {
                warn!("Checkpoint failed, progress is only in memory: {}", e);
                self.stats.record_checkpoint_failure();
            }
        }
    }

    async fn teardown(&mut self) -> Result<()> {
        if let Err(e) = self.renderer.quit().await {
            warn!("Error closing renderer: {}", e);
        }

        match self.checkpoint.flush(&self.results).await {
            Ok(()) => {
                info!(
                    "Scraping complete! Saved {} pages to {}: {}",
                    self.results.len(),
                    self.checkpoint.location(),
                    self.stats.summary()
                );
                Ok(())
            }
            Err(e) => {
                error!("Final checkpoint failed: {}", e);
                self.stats.record_checkpoint_failure();
                Err(e)
            }
        }
    }
}
