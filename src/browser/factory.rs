use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::{ChromeCapabilities, FirefoxCapabilities};
use tracing::{debug, info};

use crate::browser::{BrowserSession, RendererFactory, StaticRenderer};
use crate::cli::config::BrowserSettings;
use crate::error::CrawlError;

/// Environment variable consulted when the configured browser is `auto`
pub const BROWSER_ENV: &str = "CRAWLER_BROWSER";

/// Which renderer implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    /// Plain HTTP fetch, no JavaScript
    Static,
}

impl BrowserKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Some(Self::Chrome),
            "firefox" | "gecko" => Some(Self::Firefox),
            "static" | "http" => Some(Self::Static),
            _ => None,
        }
    }

    /// Resolve the configured browser name. `auto` defers to the
    /// environment preference, then to Chrome.
    pub fn resolve(configured: &str, env_preference: Option<&str>) -> Result<Self, CrawlError> {
        if configured.trim().eq_ignore_ascii_case("auto") {
            return match env_preference.filter(|pref| !pref.trim().is_empty()) {
                Some(pref) => Self::parse(pref).ok_or_else(|| {
                    CrawlError::Config(format!("Unsupported browser in {}: {}", BROWSER_ENV, pref))
                }),
                None => Ok(Self::Chrome),
            };
        }

        Self::parse(configured)
            .ok_or_else(|| CrawlError::Config(format!("Unsupported browser type: {}", configured)))
    }

    /// Resolve against the host's `CRAWLER_BROWSER` variable
    pub fn from_environment(configured: &str) -> Result<Self, CrawlError> {
        let preference = std::env::var(BROWSER_ENV).ok();
        Self::resolve(configured, preference.as_deref())
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Static => "static",
        };
        f.write_str(name)
    }
}

/// Starts a browser through a WebDriver server
pub struct WebDriverFactory {
    kind: BrowserKind,
    settings: BrowserSettings,
    page_load_timeout: Duration,
}

impl WebDriverFactory {
    pub fn new(kind: BrowserKind, settings: BrowserSettings, page_load_timeout: Duration) -> Self {
        Self {
            kind,
            settings,
            page_load_timeout,
        }
    }

    fn chrome_capabilities(&self) -> WebDriverResult<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();

        caps.add_chrome_arg(&format!("--user-agent={}", self.settings.user_agent))?;
        caps.add_chrome_arg(&format!(
            "--window-size={},{}",
            self.settings.viewport.width, self.settings.viewport.height
        ))?;
        caps.add_chrome_arg("--disable-gpu")?;
        caps.add_chrome_arg("--disable-dev-shm-usage")?;

        if self.settings.headless {
            caps.set_headless()?;
        }

        Ok(caps)
    }

    fn firefox_capabilities(&self) -> WebDriverResult<FirefoxCapabilities> {
        let mut caps = DesiredCapabilities::firefox();

        if self.settings.headless {
            caps.set_headless()?;
        }

        Ok(caps)
    }
}

#[async_trait]
impl RendererFactory for WebDriverFactory {
    type Output = BrowserSession;

    async fn create(&self) -> Result<BrowserSession, CrawlError> {
        let url = self.settings.webdriver_url.as_str();
        let acquisition = |e: WebDriverError| {
            CrawlError::RendererAcquisition(format!("{} via WebDriver at {}: {}", self.kind, url, e))
        };

        let driver = match self.kind {
            BrowserKind::Chrome => {
                let caps = self.chrome_capabilities().map_err(acquisition)?;
                WebDriver::new(url, caps).await.map_err(acquisition)?
            }
            BrowserKind::Firefox => {
                let caps = self.firefox_capabilities().map_err(acquisition)?;
                WebDriver::new(url, caps).await.map_err(acquisition)?
            }
            BrowserKind::Static => {
                return Err(CrawlError::RendererAcquisition(
                    "The static renderer does not use WebDriver".to_string(),
                ))
            }
        };

        // Wrap first so the driver is released even if configuration fails
        let session = BrowserSession::new(driver);
        session
            .set_page_load_timeout(self.page_load_timeout)
            .await
            .map_err(acquisition)?;

        info!("Started {} session via {}", self.kind, url);
        Ok(session)
    }
}

/// Builds the JavaScript-less renderer
pub struct StaticFactory {
    user_agent: String,
}

impl StaticFactory {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl RendererFactory for StaticFactory {
    type Output = StaticRenderer;

    async fn create(&self) -> Result<StaticRenderer, CrawlError> {
        debug!("Using static renderer");
        StaticRenderer::new(&self.user_agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_browser_wins_over_environment() {
        assert_eq!(BrowserKind::resolve("firefox", Some("chrome")).unwrap(), BrowserKind::Firefox);
        assert_eq!(BrowserKind::resolve("Static", None).unwrap(), BrowserKind::Static);
    }

    #[test]
    fn test_auto_uses_environment_then_default() {
        assert_eq!(BrowserKind::resolve("auto", Some("firefox")).unwrap(), BrowserKind::Firefox);
        assert_eq!(BrowserKind::resolve("auto", Some("  ")).unwrap(), BrowserKind::Chrome);
        assert_eq!(BrowserKind::resolve("auto", None).unwrap(), BrowserKind::Chrome);
    }

    #[test]
    fn test_unknown_browser_is_a_config_error() {
        assert!(matches!(BrowserKind::resolve("netscape", None), Err(CrawlError::Config(_))));
        assert!(matches!(BrowserKind::resolve("auto", Some("lynx")), Err(CrawlError::Config(_))));
    }

    #[tokio::test]
    async fn test_static_factory_creates_renderer() {
        assert!(StaticFactory::new("TestBot/1.0").create().await.is_ok());
    }
}
