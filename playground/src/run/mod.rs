mod controller;
mod example;
mod format;
mod poller;
mod render;
mod selector;

pub mod prelude {
    pub use super::controller::{AnalysisResult, Evaluation, RunController, RunPhase};
    pub use super::example::EXAMPLE_INPUT;
    pub use super::format::{OutputFormat, Trust};
    pub use super::poller::{ReadinessPoller, POLL_INTERVAL};
    pub use super::render::{
        escape_literal, render_view, MockViewSink, Notice, OutputView, TerminalSink, ViewSink,
    };
    pub use super::selector::{format_options, FormatOption};
}
