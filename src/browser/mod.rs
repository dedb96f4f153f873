pub mod behavior;
pub mod factory;
pub mod session;
pub mod static_page;

#[cfg(test)]
pub mod testing;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CrawlError, RenderError};

// Re-export common types
pub use behavior::BehaviorSimulator;
pub use factory::{BrowserKind, StaticFactory, WebDriverFactory};
pub use session::BrowserSession;
pub use static_page::StaticRenderer;

/// CSS selectors the extractor asks the renderer for.
pub mod selectors {
    pub const META: &str = "meta";
    pub const ANCHOR: &str = "a";
    pub const BODY: &str = "body";
}

/// A page renderer: navigates to a URL and exposes the resulting DOM.
///
/// One renderer serves one page at a time. Element handles are only valid
/// until the next navigation.
#[async_trait]
pub trait Renderer: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Wait until the page has a body, or fail with
    /// [`RenderError::NavigationTimeout`].
    async fn wait_until_loaded(&mut self, timeout: Duration) -> Result<(), RenderError>;

    async fn current_title(&self) -> Result<String, RenderError>;

    async fn query_elements(&self, selector: &str) -> Result<Vec<Self::Element>, RenderError>;

    async fn element_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, RenderError>;

    async fn element_text(&self, element: &Self::Element) -> Result<String, RenderError>;

    async fn serialized_markup(&self) -> Result<String, RenderError>;

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, RenderError>;

    /// Release the underlying session. Safe to call more than once.
    async fn quit(&mut self) -> Result<(), RenderError>;
}

/// Strategy for constructing a renderer at crawl start.
#[async_trait]
pub trait RendererFactory: Send + Sync {
    type Output: Renderer;

    async fn create(&self) -> Result<Self::Output, CrawlError>;
}
