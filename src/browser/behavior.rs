use rand::{thread_rng, Rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::browser::Renderer;
use crate::cli::config::CrawlerSettings;
use crate::error::RenderError;

/// Page-level pacing: the dynamic-content trigger after load and the
/// randomized pause between visits.
pub struct BehaviorSimulator {
    dynamic_wait: bool,
    settle_delay: (u64, u64),
    politeness_delay: (u64, u64),
    scroll_script: String,
}

impl BehaviorSimulator {
    /// Create a new behavior simulator with the given crawl settings
    pub fn new(config: &CrawlerSettings) -> Self {
        Self {
            dynamic_wait: config.dynamic_wait,
            settle_delay: config.settle_delay,
            politeness_delay: config.politeness_delay,
            scroll_script: config.scroll_script.clone(),
        }
    }

    /// Scroll to the bottom so lazily loaded content renders, then give it
    /// a settle window. Does nothing when dynamic waiting is off.
    pub async fn trigger_dynamic_content<R: Renderer>(&self, renderer: &R) -> Result<(), RenderError> {
        if !self.dynamic_wait {
            return Ok(());
        }

        renderer.execute_script(&self.scroll_script).await?;

        let pause = jitter(self.settle_delay);
        debug!("Scrolled to bottom, settling for {} ms", pause.as_millis());
        sleep(pause).await;

        Ok(())
    }

    /// Randomized courtesy pause between consecutive page visits
    pub async fn pause_between_pages(&self) {
        let pause = jitter(self.politeness_delay);
        if pause.is_zero() {
            return;
        }

        debug!("Paused for {} ms", pause.as_millis());
        sleep(pause).await;
    }
}

/// Uniform random duration within an inclusive millisecond range
pub fn jitter((min, max): (u64, u64)) -> Duration {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    Duration::from_millis(thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakeRenderer;

    fn settings(dynamic_wait: bool) -> CrawlerSettings {
        CrawlerSettings {
            dynamic_wait,
            settle_delay: (0, 0),
            politeness_delay: (0, 0),
            ..CrawlerSettings::default()
        }
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let pause = jitter((10, 20));
            assert!(pause >= Duration::from_millis(10) && pause <= Duration::from_millis(20));
        }
        assert_eq!(jitter((5, 5)), Duration::from_millis(5));
        assert!(jitter((20, 10)) <= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_scroll_only_when_dynamic_wait_enabled() {
        let renderer = FakeRenderer::new();

        BehaviorSimulator::new(&settings(false))
            .trigger_dynamic_content(&renderer)
            .await
            .unwrap();
        assert!(renderer.scripts.lock().unwrap().is_empty());

        BehaviorSimulator::new(&settings(true))
            .trigger_dynamic_content(&renderer)
            .await
            .unwrap();
        assert_eq!(
            renderer.scripts.lock().unwrap().as_slice(),
            ["window.scrollTo(0, document.body.scrollHeight)".to_string()]
        );
    }
}
