use crate::engine::prelude::{AnalysisEngine, EngineSlot};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Re-checks the engine slot on a fixed interval until the engine is bound.
///
/// There is no timeout: if the engine never loads, [`ReadinessPoller::when_ready`]
/// never resolves. Callers that need a deadline wrap it themselves.
#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    slot: EngineSlot,
    interval: Duration,
}

impl ReadinessPoller {
    pub fn new(slot: EngineSlot) -> Self {
        Self {
            slot,
            interval: POLL_INTERVAL,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.slot.is_ready()
    }

    /// Runs `callback` with the engine as soon as it is bound, exactly once.
    pub async fn when_ready<F, R>(&self, callback: F) -> R
    where
        F: FnOnce(Arc<dyn AnalysisEngine>) -> R,
    {
        let mut checks = 0u64;
        loop {
            if let Some(engine) = self.slot.get() {
                trace!(checks, "engine ready");
                return callback(engine);
            }
            checks += 1;
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::prelude::MockAnalysisEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn engine() -> Arc<dyn AnalysisEngine> {
        Arc::new(MockAnalysisEngine::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_engine_runs_callback_without_waiting() {
        let poller = ReadinessPoller::new(EngineSlot::bound(engine()));
        let start = Instant::now();

        let value = poller.when_ready(|_| 7).await;

        assert_eq!(7, value);
        assert_eq!(Duration::ZERO, start.elapsed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_on_fixed_interval_until_bound() {
        let slot = EngineSlot::empty();
        let poller = ReadinessPoller::new(slot.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let loader = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            loader.publish(engine());
        });

        let start = Instant::now();
        let seen = calls.clone();
        poller
            .when_ready(move |_| seen.fetch_add(1, Ordering::SeqCst))
            .await;

        // Checks at 0, 100, 200 miss; the check at 300ms finds the engine.
        assert_eq!(Duration::from_millis(300), start.elapsed());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_loaded_engine_keeps_polling() {
        let poller = ReadinessPoller::new(EngineSlot::empty());
        assert!(!poller.is_ready());

        let waited =
            tokio::time::timeout(Duration::from_secs(60), poller.when_ready(|_| ())).await;
        assert!(waited.is_err());
    }
}
