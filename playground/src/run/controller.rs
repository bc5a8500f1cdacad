use super::example::EXAMPLE_INPUT;
use super::format::OutputFormat;
use super::render::{render_view, OutputView, ViewSink};
use crate::engine::prelude::EngineSlot;
use tracing::{debug, info, instrument, warn};

/// Engine output for one (input, format) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub format: OutputFormat,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    LoadingEngine,
    NoInput,
    Running,
    Result,
    Failed(String),
}

/// Outcome of a single evaluation pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The engine is not bound yet; evaluate again once it is.
    AwaitingEngine,
    NoInput,
    Completed,
    Failed,
}

/// Owns the editable input, the selected format and the latest result, and
/// decides when the engine gets called.
#[derive(Debug)]
pub struct RunController {
    input: String,
    format: OutputFormat,
    phase: RunPhase,
    result: Option<AnalysisResult>,
    engine: EngineSlot,
}

impl RunController {
    pub fn new(engine: EngineSlot) -> Self {
        Self::with_input(engine, EXAMPLE_INPUT)
    }

    pub fn with_input(engine: EngineSlot, input: impl Into<String>) -> Self {
        let phase = if engine.is_ready() {
            RunPhase::Running
        } else {
            RunPhase::LoadingEngine
        };

        Self {
            input: input.into(),
            format: OutputFormat::default(),
            phase,
            result: None,
            engine,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn phase(&self) -> &RunPhase {
        &self.phase
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn is_engine_ready(&self) -> bool {
        self.engine.is_ready()
    }

    pub fn view(&self) -> OutputView {
        render_view(&self.phase, self.result.as_ref())
    }

    /// Replaces the input. Returns whether it changed, i.e. whether a new
    /// evaluation is due.
    pub fn set_input(&mut self, input: impl Into<String>) -> bool {
        let input = input.into();
        if input == self.input {
            return false;
        }
        self.input = input;
        true
    }

    /// Returns whether the selection changed.
    pub fn select_format(&mut self, format: OutputFormat) -> bool {
        if format == self.format {
            return false;
        }
        debug!("format {} -> {}", self.format, format);
        self.format = format;
        true
    }

    /// Evaluates the current input and format, showing every phase it passes
    /// through on `sink`.
    #[instrument(skip_all, fields(format = %self.format, input.len = self.input.len()))]
    pub async fn evaluate(&mut self, sink: &mut dyn ViewSink) -> Evaluation {
        let Some(engine) = self.engine.get() else {
            debug!("engine not ready");
            self.enter(RunPhase::LoadingEngine, sink).await;
            return Evaluation::AwaitingEngine;
        };

        if self.input.is_empty() {
            self.enter(RunPhase::NoInput, sink).await;
            return Evaluation::NoInput;
        }

        self.enter(RunPhase::Running, sink).await;

        let evaluation = match engine.handle_score(&self.input, self.format).await {
            Ok(body) => {
                info!(bytes = body.len(), "analysis finished");
                self.result = Some(AnalysisResult {
                    format: self.format,
                    body,
                });
                self.phase = RunPhase::Result;
                Evaluation::Completed
            }
            Err(e) => {
                warn!("analysis failed: {}", e);
                self.phase = RunPhase::Failed(e.to_string());
                Evaluation::Failed
            }
        };

        sink.show(&self.view()).await;
        evaluation
    }

    async fn enter(&mut self, phase: RunPhase, sink: &mut dyn ViewSink) {
        self.result = None;
        self.phase = phase;
        sink.show(&self.view()).await;
    }
}
