pub mod controller;
pub mod extract;
pub mod frontier;
pub mod record;
pub mod url;

// Re-export common types
pub use controller::{CrawlReport, CrawlSession, CrawlState, CrawlerController, StopSignal};
