use crate::run::prelude::OutputFormat;
use crate::shared::prelude::CaptureError;
use async_trait::async_trait;
use mockall::automock;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

mod command;
mod loader;

pub mod prelude {
    pub use super::command::{CommandEngine, EngineOptions};
    pub use super::loader::{EngineLoader, LOADER_RETRY_INTERVAL};
    pub use super::{AnalysisEngine, EngineError, EngineSlot, MockAnalysisEngine};
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unable to find the analysis engine `{binary}`")]
    NotFound { binary: String },
    #[error("Analysis engine `{binary}` did not respond to a version probe. {message}")]
    ProbeFailed { binary: String, message: String },
    #[error("Analysis failed (exit code {exit_code:?}). {message}")]
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// The external analysis engine: scores object definitions and renders the
/// report in the requested format. Opaque to this crate.
#[automock]
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn handle_score(&self, input: &str, format: OutputFormat) -> Result<String, EngineError>;
}

/// Write-once handle to the engine, shared between whoever loads the engine
/// and whoever calls it. Moves from empty to bound exactly once.
#[derive(Clone)]
pub struct EngineSlot {
    engine: Arc<watch::Sender<Option<Arc<dyn AnalysisEngine>>>>,
}

impl EngineSlot {
    pub fn empty() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            engine: Arc::new(tx),
        }
    }

    pub fn bound(engine: Arc<dyn AnalysisEngine>) -> Self {
        let slot = Self::empty();
        slot.publish(engine);
        slot
    }

    pub fn is_ready(&self) -> bool {
        self.engine.borrow().is_some()
    }

    pub fn get(&self) -> Option<Arc<dyn AnalysisEngine>> {
        self.engine.borrow().clone()
    }

    /// Binds the engine. Returns false, leaving the slot untouched, if it was already bound.
    pub fn publish(&self, engine: Arc<dyn AnalysisEngine>) -> bool {
        let mut engine = Some(engine);
        self.engine.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = engine.take();
            true
        })
    }

    /// Resolves once the engine is bound.
    pub async fn ready(&self) -> Arc<dyn AnalysisEngine> {
        let mut rx = self.engine.subscribe();
        loop {
            if let Some(engine) = rx.borrow_and_update().clone() {
                return engine;
            }
            // The sender lives in `self`, so the channel cannot close under us.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for EngineSlot {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engine_answering(answer: &'static str) -> Arc<dyn AnalysisEngine> {
        let mut engine = MockAnalysisEngine::new();
        engine
            .expect_handle_score()
            .returning(move |_, _| Ok(answer.to_string()));
        Arc::new(engine)
    }

    #[test]
    fn test_empty_slot_is_not_ready() {
        let slot = EngineSlot::empty();
        assert!(!slot.is_ready());
        assert!(slot.get().is_none());
    }

    #[tokio::test]
    async fn test_publish_happens_once() {
        let slot = EngineSlot::empty();
        assert!(slot.publish(engine_answering("first")));
        assert!(!slot.publish(engine_answering("second")));

        let engine = slot.get().unwrap();
        let output = engine.handle_score("x", OutputFormat::Ci).await.unwrap();
        assert_eq!("first", output);
    }

    #[tokio::test]
    async fn test_clones_observe_the_same_binding() {
        let slot = EngineSlot::empty();
        let observer = slot.clone();
        slot.publish(engine_answering("shared"));
        assert!(observer.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_resolves_after_publish() {
        let slot = EngineSlot::empty();
        let loader = slot.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            loader.publish(engine_answering("late"));
        });

        let engine = slot.ready().await;
        let output = engine.handle_score("x", OutputFormat::Json).await.unwrap();
        assert_eq!("late", output);
    }

    #[tokio::test]
    async fn test_ready_returns_immediately_when_bound() {
        let slot = EngineSlot::bound(engine_answering("now"));
        let engine = slot.ready().await;
        let output = engine.handle_score("x", OutputFormat::Human).await.unwrap();
        assert_eq!("now", output);
    }
}
