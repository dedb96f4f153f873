use async_trait::async_trait;
use thirtyfour::prelude::*;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error};

use crate::browser::{selectors, Renderer};
use crate::error::RenderError;

/// How often the body is polled while waiting for a page to load
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Browser session backed by a WebDriver server
pub struct BrowserSession {
    /// WebDriver instance, `None` once quit
    driver: Option<WebDriver>,

    /// Last URL navigated to
    current_url: Option<String>,
}

impl BrowserSession {
    /// Wrap a connected WebDriver
    pub fn new(driver: WebDriver) -> Self {
        Self {
            driver: Some(driver),
            current_url: None,
        }
    }

    /// Bound the browser's own page-load wait
    pub async fn set_page_load_timeout(&self, timeout: Duration) -> WebDriverResult<()> {
        match &self.driver {
            Some(driver) => driver.set_page_load_timeout(timeout).await,
            None => Ok(()),
        }
    }

    fn driver(&self) -> Result<&WebDriver, RenderError> {
        self.driver
            .as_ref()
            .ok_or_else(|| RenderError::SessionLost("Browser session already closed".to_string()))
    }
}

/// Driver messages for a dead session that only arrive as generic command
/// errors
const LOST_SESSION_MESSAGES: [&str; 4] = [
    "invalid session id",
    "session deleted",
    "chrome not reachable",
    "connection refused",
];

fn is_session_lost(e: &WebDriverError) -> bool {
    match e {
        WebDriverError::NoSuchWindow(_) | WebDriverError::IoError(_) => true,
        WebDriverError::CmdError(_) => {
            let message = e.to_string().to_lowercase();
            LOST_SESSION_MESSAGES.iter().any(|lost| message.contains(lost))
        }
        _ => false,
    }
}

fn is_timeout(e: &WebDriverError) -> bool {
    match e {
        WebDriverError::Timeout(_) => true,
        // W3C "timeout" error code, surfaced as a command error
        WebDriverError::CmdError(_) => e.to_string().to_lowercase().contains("timeout"),
        _ => false,
    }
}

/// Map a WebDriver error onto the crawl's error taxonomy
fn classify(context: &str, e: WebDriverError) -> RenderError {
    if is_session_lost(&e) {
        RenderError::SessionLost(format!("{}: {}", context, e))
    } else {
        RenderError::Failure(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl Renderer for BrowserSession {
    type Element = WebElement;

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let driver = self.driver()?;

        debug!("Navigating to: {}", url);
        match driver.goto(url).await {
            Ok(()) => {}
            Err(e) if is_timeout(&e) => {
                // Page load timeout: whatever has rendered so far is still
                // checked for a body by wait_until_loaded
                debug!("Page load timed out for {}: {}", url, e);
            }
            Err(e) => return Err(classify(&format!("Failed to navigate to URL: {}", url), e)),
        }

        self.current_url = Some(url.to_string());
        Ok(())
    }

    async fn wait_until_loaded(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let driver = self.driver()?;
        let deadline = Instant::now() + timeout;

        loop {
            let bodies = driver
                .find_all(By::Tag(selectors::BODY))
                .await
                .map_err(|e| classify("Failed to look up page body", e))?;
            if !bodies.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RenderError::NavigationTimeout {
                    url: self.current_url.clone().unwrap_or_default(),
                    timeout,
                });
            }
            sleep(LOAD_POLL_INTERVAL).await;
        }
    }

    async fn current_title(&self) -> Result<String, RenderError> {
        self.driver()?
            .title()
            .await
            .map_err(|e| classify("Failed to get page title", e))
    }

    async fn query_elements(&self, selector: &str) -> Result<Vec<WebElement>, RenderError> {
        self.driver()?
            .find_all(By::Css(selector))
            .await
            .map_err(|e| classify(&format!("Failed to find elements: {}", selector), e))
    }

    async fn element_attribute(
        &self,
        element: &WebElement,
        name: &str,
    ) -> Result<Option<String>, RenderError> {
        element
            .attr(name)
            .await
            .map_err(|e| classify(&format!("Failed to read attribute: {}", name), e))
    }

    async fn element_text(&self, element: &WebElement) -> Result<String, RenderError> {
        element
            .text()
            .await
            .map_err(|e| classify("Failed to read element text", e))
    }

    async fn serialized_markup(&self) -> Result<String, RenderError> {
        self.driver()?
            .source()
            .await
            .map_err(|e| classify("Failed to get page source", e))
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, RenderError> {
        let result = self
            .driver()?
            .execute(script, Vec::new())
            .await
            .map_err(|e| classify("Failed to execute JavaScript", e))?;

        Ok(result.json().clone())
    }

    async fn quit(&mut self) -> Result<(), RenderError> {
        if let Some(driver) = self.driver.take() {
            driver
                .quit()
                .await
                .map_err(|e| classify("Error closing browser session", e))?;
            debug!("Browser session closed");
        }

        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            // Spawn a task to quit the driver
            tokio::spawn(async move {
                if let Err(e) = driver.quit().await {
                    error!("Error closing browser session during drop: {}", e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_window_is_session_loss() {
        let err = classify("Failed to get page title", WebDriverError::NoSuchWindow("window gone".to_string()));
        assert!(matches!(err, RenderError::SessionLost(_)));

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(classify("Failed to get page source", WebDriverError::IoError(io)), RenderError::SessionLost(_)));
    }

    #[test]
    fn test_page_errors_stay_recoverable() {
        let missing = classify("Failed to find elements: a", WebDriverError::NoSuchElement("a".to_string()));
        assert!(matches!(missing, RenderError::Failure(_)));
        assert!(missing.is_recoverable());

        // Text alone does not turn an unrelated error into session loss
        let custom = classify("Failed to navigate", WebDriverError::CustomError("invalid session id".to_string()));
        assert!(matches!(custom, RenderError::Failure(_)));
    }

    #[test]
    fn test_timeout_detection() {
        assert!(is_timeout(&WebDriverError::Timeout("page load".to_string())));
        assert!(!is_timeout(&WebDriverError::NoSuchWindow("timeout".to_string())));
    }
}
