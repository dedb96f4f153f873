use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure while rendering or reading a single page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Page {url} did not finish loading within {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Renderer failure: {0}")]
    Failure(String),

    /// The renderer session is gone and cannot serve any further page.
    #[error("Renderer session lost: {0}")]
    SessionLost(String),
}

impl RenderError {
    /// Whether the crawl can keep going with the same renderer.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RenderError::SessionLost(_))
    }
}

/// Crawl-level failures that propagate to the caller.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("No usable renderer could be started: {0}")]
    RendererAcquisition(String),

    #[error("Crawl aborted while processing {url}: {source}")]
    Aborted {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("Failed to write checkpoint {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
