use anyhow::{Result, Context};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{BrowserKind, RendererFactory, StaticFactory, WebDriverFactory};
use crate::cli::config::CrawlerConfig;
use crate::crawler::{CrawlReport, CrawlSession, CrawlState, CrawlerController, StopSignal};
use crate::storage::{JsonCheckpoint, ResultLayout};

/// Command line overrides for a crawl
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub seeds: Vec<String>,
    pub profile: Option<String>,
    pub output: Option<PathBuf>,
    pub dynamic_wait: bool,
    pub browser: Option<String>,
    pub layout: Option<ResultLayout>,
    pub webdriver_url: Option<String>,
    pub politeness: bool,
}

impl CrawlOptions {
    /// Override configuration values with the ones given on the command line
    pub fn apply(&self, config: &mut CrawlerConfig) {
        if !self.dynamic_wait {
            config.crawler.dynamic_wait = false;
        }
        if !self.politeness {
            config.crawler.politeness_delay = (0, 0);
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(layout) = self.layout {
            config.output.layout = layout;
        }
        if let Some(browser) = &self.browser {
            config.browser.browser_type = browser.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = url.clone();
        }
    }
}

/// Crawl every seed and write the results
pub async fn crawl(options: CrawlOptions) -> Result<()> {
    let mut config = match &options.profile {
        Some(profile) => CrawlerConfig::load_profile(profile)
            .context(format!("Failed to load profile: {}", profile))?,
        None => CrawlerConfig::load_default()?,
    };
    options.apply(&mut config);

    // Reject bad seeds before any browser is started
    for seed in &options.seeds {
        let session = CrawlSession::new(seed)?;
        info!("Seed {} (base domain {})", session.seed(), session.base_domain());
    }

    let stop = StopSignal::new();
    let on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current page");
            on_interrupt.trigger();
        }
    });

    let kind = BrowserKind::from_environment(&config.browser.browser_type)?;
    info!("Rendering with {}", kind);

    let report = match kind {
        BrowserKind::Static => {
            let factory = StaticFactory::new(config.browser.user_agent.clone());
            run_crawl(&factory, &config, &options.seeds, stop).await?
        }
        BrowserKind::Chrome | BrowserKind::Firefox => {
            let factory = WebDriverFactory::new(
                kind,
                config.browser.clone(),
                Duration::from_secs(config.crawler.page_load_timeout),
            );
            run_crawl(&factory, &config, &options.seeds, stop).await?
        }
    };

    if report.state == CrawlState::Cancelled {
        warn!("Crawl stopped before every page was visited");
    }

    println!(
        "✅ Scraping complete! Saved {} pages to {} ({})",
        report.results.len(),
        config.output.path.display(),
        report.stats.summary()
    );

    Ok(())
}

/// Acquire a renderer from the factory and drive the crawl to completion
pub async fn run_crawl<F: RendererFactory>(
    factory: &F,
    config: &CrawlerConfig,
    seeds: &[String],
    stop: StopSignal,
) -> Result<CrawlReport> {
    let path = &config.output.path;
    let checkpoint = JsonCheckpoint::new(path, config.output.layout);

    let previous = if config.output.fresh_start {
        checkpoint.reset().await?;
        None
    } else if path.exists() {
        let previous = JsonCheckpoint::load(path).await
            .context(format!("Failed to read previous results from {}", path.display()))?;
        Some(previous)
    } else {
        None
    };

    let renderer = factory.create().await
        .context("Failed to start a renderer")?;

    let mut controller = CrawlerController::new(renderer, &config.crawler, Box::new(checkpoint), stop);
    if let Some(previous) = previous {
        controller = controller.resume(previous);
    }
    let report = controller.run(seeds).await?;

    Ok(report)
}

/// List all available configuration profiles
pub async fn list_profiles() -> Result<()> {
    let profiles = CrawlerConfig::list_profiles()?;

    println!("Available configuration profiles:");
    for profile in profiles {
        println!("  - {}", profile);
    }

    Ok(())
}

/// Manage a specific configuration profile
pub async fn manage_profile(profile_name: String) -> Result<()> {
    match CrawlerConfig::load_profile(&profile_name) {
        Ok(config) => {
            println!("Profile: {}", profile_name);
            println!("{:#?}", config);
        },
        Err(_) => {
            // Profile doesn't exist, create a new one
            warn!("Profile '{}' does not exist. Creating a default profile.", profile_name);
            let config = CrawlerConfig::default();
            config.save_as_profile(&profile_name)?;
            println!("Created default profile: {}", profile_name);
        }
    }

    Ok(())
}

/// Show the current configuration
pub async fn show_config() -> Result<()> {
    let config = CrawlerConfig::load_default()?;
    println!("Current configuration:");
    println!("{:#?}", config);

    Ok(())
}
