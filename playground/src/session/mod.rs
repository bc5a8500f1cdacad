use crate::run::prelude::{Evaluation, OutputFormat, ReadinessPoller, RunController, ViewSink};
use crate::shared::prelude::waiting_spinner;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info_span, Instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

mod cli;
mod interactive;

pub mod prelude {
    pub use super::cli::{formats_root, run_root, score_root, FormatsArgs, RunArgs, ScoreArgs};
    pub use super::interactive::{
        InquirePrompts, MenuAction, MenuPrompts, MockMenuPrompts, Prompter,
    };
    pub use super::{Session, UserEvent};
}

/// Something the user did to the input or the format selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    EditInput(String),
    SelectFormat(OutputFormat),
    Quit,
}

/// Drives a [`RunController`] from user events and engine readiness.
///
/// Everything runs on the task that calls [`Session::run`]; the controller is
/// never touched from anywhere else.
pub struct Session<S: ViewSink> {
    controller: RunController,
    poller: ReadinessPoller,
    sink: S,
    settled: watch::Sender<u64>,
}

impl<S: ViewSink> Session<S> {
    pub fn new(controller: RunController, poller: ReadinessPoller, sink: S) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            controller,
            poller,
            sink,
            settled,
        }
    }

    /// Ticks once the session has finished handling each event (and once after mount).
    pub fn subscribe_settled(&self) -> watch::Receiver<u64> {
        self.settled.subscribe()
    }

    /// Processes events until the channel closes or the user quits, then hands
    /// the controller back.
    pub async fn run(mut self, mut events: mpsc::Receiver<UserEvent>) -> RunController {
        let mut awaiting_engine = self.evaluate().await;
        self.settle();

        // One wait for the whole loading period, however many events arrive during it.
        let engine_wait = wait_for_engine(self.poller.clone());
        tokio::pin!(engine_wait);
        let mut engine_seen = false;

        loop {
            tokio::select! {
                _ = &mut engine_wait, if awaiting_engine && !engine_seen => {
                    debug!("engine became ready");
                    engine_seen = true;
                    awaiting_engine = self.evaluate().await;
                }
                event = events.recv() => {
                    let changed = match event {
                        None | Some(UserEvent::Quit) => break,
                        Some(UserEvent::EditInput(input)) => self.controller.set_input(input),
                        Some(UserEvent::SelectFormat(format)) => self.controller.select_format(format),
                    };
                    // While the engine is loading the pending wait evaluates
                    // whatever is current when it fires.
                    if changed {
                        awaiting_engine = self.evaluate().await;
                    }
                    self.settle();
                }
            }
        }

        self.controller
    }

    async fn evaluate(&mut self) -> bool {
        self.controller.evaluate(&mut self.sink).await == Evaluation::AwaitingEngine
    }

    fn settle(&self) {
        self.settled.send_modify(|generation| *generation += 1);
    }
}

async fn wait_for_engine(poller: ReadinessPoller) {
    let span = info_span!("engine", "indicatif.pb_show" = true);
    span.pb_set_style(&waiting_spinner());
    span.pb_set_message("Loading analysis engine");
    poller.when_ready(|_| ()).instrument(span).await
}
