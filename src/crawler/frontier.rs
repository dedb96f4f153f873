use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::crawler::record::PageRecord;
use crate::crawler::url::NormalizedUrl;

/// Breadth-first work queue shared by every seed of a run.
///
/// `seen` holds every URL that was ever queued, so a URL enters the queue
/// at most once per run. `visited` holds URLs that have been dequeued for
/// processing, whether they succeeded or were abandoned.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<NormalizedUrl>,
    seen: HashSet<NormalizedUrl>,
    visited: HashSet<NormalizedUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick up from records saved by an earlier run: their URLs count as
    /// visited and their unvisited internal links are queued.
    pub fn restore(&mut self, records: &[PageRecord]) -> usize {
        for record in records {
            self.seen.insert(record.url.clone());
            self.visited.insert(record.url.clone());
        }
        records
            .iter()
            .flat_map(|record| record.internal_links.iter())
            .filter(|url| self.push((*url).clone()))
            .count()
    }

    /// Queue a URL unless it was already queued or visited.
    /// Membership check and insertion happen together.
    pub fn push(&mut self, url: NormalizedUrl) -> bool {
        if !self.seen.insert(url.clone()) {
            debug!("Skipping already seen URL: {}", url);
            return false;
        }
        self.queue.push_back(url);
        true
    }

    /// Take the next URL to visit and mark it visited in the same step
    pub fn dequeue(&mut self) -> Option<NormalizedUrl> {
        while let Some(url) = self.queue.pop_front() {
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    /// URLs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
