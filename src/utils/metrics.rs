use std::time::Instant;
use chrono::{DateTime, Utc};

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Start time of the run
    pub started_at: DateTime<Utc>,

    /// Pages extracted and added to the result set
    pub pages_saved: usize,

    /// Pages that timed out or failed and were dropped
    pub pages_abandoned: usize,

    /// Checkpoint writes that failed
    pub checkpoint_failures: usize,

    /// Total time spent rendering and extracting saved pages, in milliseconds
    pub render_millis: u64,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            pages_saved: 0,
            pages_abandoned: 0,
            checkpoint_failures: 0,
            render_millis: 0,
        }
    }
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing a page
    pub fn start_timer(&self) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
        }
    }

    pub fn record_saved(&mut self, duration_ms: u64) {
        self.pages_saved += 1;
        self.render_millis += duration_ms;
    }

    pub fn record_abandoned(&mut self) {
        self.pages_abandoned += 1;
    }

    pub fn record_checkpoint_failure(&mut self) {
        self.checkpoint_failures += 1;
    }

    /// Average render time of saved pages
    pub fn average_render_millis(&self) -> u64 {
        if self.pages_saved == 0 {
            0
        } else {
            self.render_millis / self.pages_saved as u64
        }
    }

    /// One-line human readable summary
    pub fn summary(&self) -> String {
        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0);
        format!(
            "{} pages saved, {} abandoned, {} failed checkpoints in {}s (avg {} ms/page)",
            self.pages_saved,
            self.pages_abandoned,
            self.checkpoint_failures,
            elapsed,
            self.average_render_millis()
        )
    }
}

/// Request timer for measuring page durations
pub struct RequestTimer {
    /// Start time of the request
    start: Instant,
}

impl RequestTimer {
    /// End timing and get the duration in milliseconds
    pub fn end(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_summary() {
        let mut stats = CrawlStats::new();
        stats.record_saved(100);
        stats.record_saved(300);
        stats.record_abandoned();
        stats.record_checkpoint_failure();

        assert_eq!(stats.average_render_millis(), 200);
        let summary = stats.summary();
        assert!(summary.starts_with("2 pages saved, 1 abandoned, 1 failed checkpoints"));
    }

    #[test]
    fn test_average_without_pages() {
        assert_eq!(CrawlStats::new().average_render_millis(), 0);
    }
}
