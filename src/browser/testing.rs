//! Scripted in-memory renderer for driving the crawler in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::static_page::{document_title, snapshot, StaticElement};
use crate::browser::Renderer;
use crate::error::{CrawlError, RenderError};

#[derive(Debug, Clone)]
pub enum FakePage {
    Html(String),
    Timeout,
    Failure,
    SessionLost,
}

/// Renders pages from a fixed URL -> page table and records what it was
/// asked to do.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pages: HashMap<String, FakePage>,
    current: Option<String>,
    source: Option<String>,
    on_navigate: Option<Arc<dyn Fn(&str) + Send + Sync>>,
    pub visits: Arc<Mutex<Vec<String>>>,
    pub scripts: Arc<Mutex<Vec<String>>>,
    pub quits: Arc<AtomicUsize>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), FakePage::Html(html.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Run a hook whenever navigation starts
    pub fn on_navigate(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_navigate = Some(Arc::new(hook));
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    fn source(&self) -> Result<&str, RenderError> {
        self.source
            .as_deref()
            .ok_or_else(|| RenderError::Failure("No page loaded".to_string()))
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    type Element = StaticElement;

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.visits.lock().unwrap().push(url.to_string());
        if let Some(hook) = &self.on_navigate {
            hook(url);
        }
        self.current = Some(url.to_string());
        self.source = None;
        Ok(())
    }

    async fn wait_until_loaded(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let url = self.current.clone().unwrap_or_default();
        match self.pages.get(&url) {
            Some(FakePage::Html(html)) => {
                self.source = Some(html.clone());
                Ok(())
            }
            Some(FakePage::Timeout) => Err(RenderError::NavigationTimeout { url, timeout }),
            Some(FakePage::SessionLost) => {
                Err(RenderError::SessionLost("invalid session id".to_string()))
            }
            Some(FakePage::Failure) | None => {
                Err(RenderError::Failure(format!("net::ERR_FAILED at {}", url)))
            }
        }
    }

    async fn current_title(&self) -> Result<String, RenderError> {
        Ok(document_title(self.source()?))
    }

    async fn query_elements(&self, selector: &str) -> Result<Vec<StaticElement>, RenderError> {
        snapshot(self.source()?, selector)
    }

    async fn element_attribute(
        &self,
        element: &StaticElement,
        name: &str,
    ) -> Result<Option<String>, RenderError> {
        Ok(element.attributes.get(name).cloned())
    }

    async fn element_text(&self, element: &StaticElement) -> Result<String, RenderError> {
        Ok(element.text.clone())
    }

    async fn serialized_markup(&self) -> Result<String, RenderError> {
        self.source().map(str::to_string)
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, RenderError> {
        self.scripts.lock().unwrap().push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn quit(&mut self) -> Result<(), RenderError> {
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Factory handing out clones of a prepared [`FakeRenderer`].
pub struct FakeFactory {
    pub renderer: Option<FakeRenderer>,
}

#[async_trait]
impl crate::browser::RendererFactory for FakeFactory {
    type Output = FakeRenderer;

    async fn create(&self) -> Result<FakeRenderer, CrawlError> {
        self.renderer
            .clone()
            .ok_or_else(|| CrawlError::RendererAcquisition("no browser found".to_string()))
    }
}
