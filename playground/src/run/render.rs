use super::controller::{AnalysisResult, RunPhase};
use super::format::{OutputFormat, Trust};
use crate::shared::prelude::STDOUT_WRITER;
use async_trait::async_trait;
use colored::Colorize;
use mockall::automock;
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Notice {
    LoadingEngine,
    NoInput,
    Running,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoadingEngine => write!(f, "Loading analysis engine..."),
            Notice::NoInput => write!(
                f,
                "Paste your Kubernetes YAML or JSON in the editor to get started"
            ),
            Notice::Running => write!(f, "Running..."),
        }
    }
}

/// What the output region should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputView {
    Notice(Notice),
    /// Engine output trusted to carry its own styling.
    Markup { format: OutputFormat, body: String },
    /// Engine output shown character for character.
    Literal { format: OutputFormat, body: String },
    Error(String),
}

pub fn render_view(phase: &RunPhase, result: Option<&AnalysisResult>) -> OutputView {
    match (phase, result) {
        (RunPhase::LoadingEngine, _) => OutputView::Notice(Notice::LoadingEngine),
        (RunPhase::NoInput, _) => OutputView::Notice(Notice::NoInput),
        (RunPhase::Failed(message), _) => OutputView::Error(message.clone()),
        (RunPhase::Result, Some(result)) => match result.format.trust() {
            Trust::Markup => OutputView::Markup {
                format: result.format,
                body: result.body.clone(),
            },
            Trust::Literal => OutputView::Literal {
                format: result.format,
                body: result.body.clone(),
            },
        },
        (RunPhase::Running, _) | (RunPhase::Result, None) => OutputView::Notice(Notice::Running),
    }
}

/// Makes control characters visible so literal output cannot restyle or
/// rewrite the terminal. Newlines and tabs pass through; a carriage return only
/// as part of `\r\n`.
pub fn escape_literal(text: &str) -> Cow<'_, str> {
    let mut escaped = String::with_capacity(text.len());
    let mut changed = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' | '\t' => escaped.push(c),
            '\r' if chars.peek() == Some(&'\n') => escaped.push(c),
            c if c.is_control() => {
                changed = true;
                escaped.extend(c.escape_default());
            }
            c => escaped.push(c),
        }
    }

    if changed {
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(text)
    }
}

/// The output display region.
#[automock]
#[async_trait]
pub trait ViewSink: Send {
    async fn show(&mut self, view: &OutputView);
}

/// Draws views onto a terminal-like writer.
pub struct TerminalSink {
    writer: Arc<RwLock<Box<dyn Write + Sync + Send>>>,
    decorated: bool,
}

impl Default for TerminalSink {
    fn default() -> Self {
        Self::new(STDOUT_WRITER.clone())
    }
}

impl TerminalSink {
    pub fn new(writer: Arc<RwLock<Box<dyn Write + Sync + Send>>>) -> Self {
        Self {
            writer,
            decorated: true,
        }
    }

    /// Only the engine's output (or failure) reaches stdout: no notices and no
    /// format header, so the output can be piped.
    pub fn results_only() -> Self {
        Self {
            writer: STDOUT_WRITER.clone(),
            decorated: false,
        }
    }

    fn draw(&self, out: &mut dyn Write, view: &OutputView) -> std::io::Result<()> {
        match view {
            OutputView::Notice(_) if !self.decorated => Ok(()),
            OutputView::Notice(notice) => writeln!(out, "{}", notice.to_string().dimmed()),
            OutputView::Markup { format, body } => {
                if self.decorated {
                    writeln!(out, "{}", header(*format))?;
                }
                out.write_all(body.as_bytes())?;
                if !body.ends_with('\n') {
                    writeln!(out)?;
                }
                Ok(())
            }
            OutputView::Literal { format, body } => {
                if self.decorated {
                    writeln!(out, "{}", header(*format))?;
                }
                let body = escape_literal(body);
                out.write_all(body.as_bytes())?;
                if !body.ends_with('\n') {
                    writeln!(out)?;
                }
                Ok(())
            }
            OutputView::Error(message) => writeln!(
                out,
                "{} {}",
                "Analysis failed:".red().bold(),
                escape_literal(message)
            ),
        }?;
        out.flush()
    }
}

fn header(format: OutputFormat) -> String {
    format!("── {} ──", format.label()).magenta().bold().to_string()
}

#[async_trait]
impl ViewSink for TerminalSink {
    async fn show(&mut self, view: &OutputView) {
        let mut out = self.writer.write().await;
        if let Err(e) = self.draw(&mut **out, view) {
            tracing::warn!("Unable to draw output: {}", e);
        }
    }
}
