use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::browser::Renderer;
use crate::error::{CrawlError, RenderError};

/// Elements whose text never shows up in a rendered page
const INVISIBLE: [&str; 4] = ["script", "style", "noscript", "template"];

/// Owned snapshot of a DOM element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticElement {
    pub attributes: HashMap<String, String>,
    pub text: String,
}

/// Renderer that fetches raw HTML over HTTP and answers DOM queries with
/// an HTML parser. No JavaScript runs, so scripts are no-ops.
pub struct StaticRenderer {
    client: Client,
    target: Option<String>,
    source: Option<String>,
}

impl StaticRenderer {
    /// Create a static renderer sending the given user agent
    pub fn new(user_agent: &str) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .map_err(|e| CrawlError::RendererAcquisition(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            target: None,
            source: None,
        })
    }

    fn source(&self) -> Result<&str, RenderError> {
        self.source
            .as_deref()
            .ok_or_else(|| RenderError::Failure("No page loaded".to_string()))
    }

    async fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        debug!("GET {} -> {}", url, response.status());
        response.text().await
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    type Element = StaticElement;

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        self.target = Some(url.to_string());
        self.source = None;
        Ok(())
    }

    async fn wait_until_loaded(&mut self, timeout: Duration) -> Result<(), RenderError> {
        let url = self
            .target
            .clone()
            .ok_or_else(|| RenderError::Failure("Nothing to load, navigate first".to_string()))?;

        let timed_out = || RenderError::NavigationTimeout {
            url: url.clone(),
            timeout,
        };

        match tokio::time::timeout(timeout, self.fetch(&url)).await {
            Ok(Ok(body)) => {
                self.source = Some(body);
                Ok(())
            }
            Ok(Err(e)) if e.is_timeout() => Err(timed_out()),
            Ok(Err(e)) => Err(RenderError::Failure(format!("Failed to fetch {}: {}", url, e))),
            Err(_) => Err(timed_out()),
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
        debug!("Static renderer ignores script: {}", script);
        Ok(serde_json::Value::Null)
    }

    async fn quit(&mut self) -> Result<(), RenderError> {
        self.target = None;
        self.source = None;
        Ok(())
    }
}

/// Text of the document's `<title>`, empty when absent
pub fn document_title(source: &str) -> String {
    let Ok(title) = Selector::parse("title") else {
        return String::new();
    };
    let document = Html::parse_document(source);
    let text = document
        .select(&title)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();
    text
}

/// Select elements from an HTML document and copy out their attributes and
/// visible text.
pub fn snapshot(source: &str, selector: &str) -> Result<Vec<StaticElement>, RenderError> {
    let selector = Selector::parse(selector)
        .map_err(|e| RenderError::Failure(format!("Invalid selector '{}': {:?}", selector, e)))?;
    let document = Html::parse_document(source);

    let elements = document
        .select(&selector)
        .map(|el| StaticElement {
            attributes: el
                .value()
                .attrs()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            text: visible_text(el),
        })
        .collect();
    Ok(elements)
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| INVISIBLE.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
            text.push(' ');
        }
    }
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
