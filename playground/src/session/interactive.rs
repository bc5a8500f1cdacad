use super::UserEvent;
use crate::run::prelude::{format_options, FormatOption, OutputFormat, EXAMPLE_INPUT};
use anyhow::Result;
use inquire::InquireError;
use mockall::automock;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use strum::{EnumIter, IntoEnumIterator};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
pub enum MenuAction {
    EditInput,
    SelectFormat,
    LoadFile,
    ResetExample,
    ClearInput,
    Quit,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MenuAction::EditInput => "Edit object definitions",
            MenuAction::SelectFormat => "Change output format",
            MenuAction::LoadFile => "Load definitions from a file",
            MenuAction::ResetExample => "Reset to the example",
            MenuAction::ClearInput => "Clear input",
            MenuAction::Quit => "Quit",
        };
        write!(f, "{}", text)
    }
}

/// The terminal side of the menu. Every call blocks until the user answers;
/// `Ok(None)` means the prompt was cancelled.
#[automock]
pub trait MenuPrompts {
    fn choose_action(&mut self, format: OutputFormat) -> Result<MenuAction, InquireError>;
    fn edit_input(&mut self, current: &str) -> Result<Option<String>, InquireError>;
    fn choose_format(
        &mut self,
        options: Vec<FormatOption>,
    ) -> Result<Option<OutputFormat>, InquireError>;
    fn file_path(&mut self) -> Result<Option<String>, InquireError>;
}

/// [`MenuPrompts`] backed by `inquire`.
///
/// Holds the screen lock while a prompt is open, so a view rendered in the
/// meantime is drawn after the prompt closes instead of through it.
pub struct InquirePrompts {
    screen: Arc<RwLock<Box<dyn Write + Sync + Send>>>,
}

impl InquirePrompts {
    pub fn new(screen: Arc<RwLock<Box<dyn Write + Sync + Send>>>) -> Self {
        Self { screen }
    }
}

fn cancelled_as_none<T>(answer: Result<T, InquireError>) -> Result<Option<T>, InquireError> {
    match answer {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(e) => Err(e),
    }
}

impl MenuPrompts for InquirePrompts {
    fn choose_action(&mut self, format: OutputFormat) -> Result<MenuAction, InquireError> {
        let _screen = self.screen.blocking_write();
        inquire::Select::new("What next?", MenuAction::iter().collect())
            .with_help_message(&format!("output format: {}", format.label()))
            .prompt()
    }

    fn edit_input(&mut self, current: &str) -> Result<Option<String>, InquireError> {
        let _screen = self.screen.blocking_write();
        cancelled_as_none(
            inquire::Editor::new("Object definitions")
                .with_predefined_text(current)
                .with_file_extension(".yaml")
                .prompt(),
        )
    }

    fn choose_format(
        &mut self,
        options: Vec<FormatOption>,
    ) -> Result<Option<OutputFormat>, InquireError> {
        let _screen = self.screen.blocking_write();
        let cursor = options.iter().position(|o| o.selected).unwrap_or_default();
        cancelled_as_none(
            inquire::Select::new("Output format", options)
                .with_starting_cursor(cursor)
                .prompt()
                .map(|option| option.format),
        )
    }

    fn file_path(&mut self) -> Result<Option<String>, InquireError> {
        let _screen = self.screen.blocking_write();
        cancelled_as_none(inquire::Text::new("Path to a YAML or JSON file").prompt())
    }
}

/// Blocking menu loop. Turns menu choices into [`UserEvent`]s and, after each
/// one it sends, waits for the session to settle before prompting again.
///
/// Keeps its own copy of input and format; it is the only producer of changes
/// to either.
pub struct Prompter {
    input: String,
    format: OutputFormat,
    events: mpsc::Sender<UserEvent>,
    settled: watch::Receiver<u64>,
    sent: u64,
}

impl Prompter {
    pub fn new(
        input: impl Into<String>,
        format: OutputFormat,
        events: mpsc::Sender<UserEvent>,
        settled: watch::Receiver<u64>,
    ) -> Self {
        Self {
            input: input.into(),
            format,
            events,
            settled,
            sent: 0,
        }
    }

    /// Must be called from a blocking thread inside a tokio runtime.
    pub fn run(mut self, prompts: &mut impl MenuPrompts) -> Result<()> {
        let runtime = Handle::current();
        loop {
            if !self.wait_for_settle(&runtime) {
                debug!("session closed, prompter finished");
                return Ok(());
            }

            let action = match prompts.choose_action(self.format) {
                Ok(action) => action,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                    MenuAction::Quit
                }
                Err(e) => {
                    self.events.blocking_send(UserEvent::Quit).ok();
                    return Err(e.into());
                }
            };

            let event = match self.event_for(action, prompts) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(InquireError::OperationInterrupted) => UserEvent::Quit,
                Err(e) => {
                    self.events.blocking_send(UserEvent::Quit).ok();
                    return Err(e.into());
                }
            };
            let quitting = event == UserEvent::Quit;

            if self.events.blocking_send(event).is_err() || quitting {
                debug!("prompter finished");
                return Ok(());
            }
            self.sent += 1;
        }
    }

    /// Blocks until the session has mounted and handled every event sent so
    /// far. Returns false once the session is gone.
    fn wait_for_settle(&mut self, runtime: &Handle) -> bool {
        let target = self.sent + 1;
        runtime
            .block_on(self.settled.wait_for(|generation| *generation >= target))
            .is_ok()
    }

    /// Resolves a menu choice into the event it produces, prompting for any
    /// value it needs. `None` means nothing changed.
    pub fn event_for(
        &mut self,
        action: MenuAction,
        prompts: &mut impl MenuPrompts,
    ) -> Result<Option<UserEvent>, InquireError> {
        let event = match action {
            MenuAction::EditInput => prompts
                .edit_input(&self.input)?
                .and_then(|text| self.edit(text)),
            MenuAction::SelectFormat => prompts
                .choose_format(format_options(self.format))?
                .and_then(|format| self.select(format)),
            MenuAction::LoadFile => match prompts.file_path()? {
                None => None,
                Some(path) => match std::fs::read_to_string(path.trim()) {
                    Ok(text) => self.edit(text),
                    Err(e) => {
                        warn!(target: "user", "Unable to read {}: {}", path.trim(), e);
                        None
                    }
                },
            },
            MenuAction::ResetExample => self.edit(EXAMPLE_INPUT.to_string()),
            MenuAction::ClearInput => self.edit(String::new()),
            MenuAction::Quit => Some(UserEvent::Quit),
        };
        Ok(event)
    }

    fn edit(&mut self, text: String) -> Option<UserEvent> {
        if text == self.input {
            return None;
        }
        self.input = text.clone();
        Some(UserEvent::EditInput(text))
    }

    fn select(&mut self, format: OutputFormat) -> Option<UserEvent> {
        if format == self.format {
            return None;
        }
        self.format = format;
        Some(UserEvent::SelectFormat(format))
    }
}

/// Scripted prompts for driving [`Prompter::run`] without a terminal.
#[cfg(test)]
pub(crate) fn scripted_prompts(
    actions: Vec<MenuAction>,
    chosen_format: OutputFormat,
) -> MockMenuPrompts {
    let mut script = std::collections::VecDeque::from(actions);
    let mut prompts = MockMenuPrompts::new();
    prompts
        .expect_choose_action()
        .returning(move |_| Ok(script.pop_front().unwrap_or(MenuAction::Quit)));
    prompts
        .expect_choose_format()
        .returning(move |_| Ok(Some(chosen_format)));
    prompts.expect_edit_input().returning(|_| Ok(None));
    prompts.expect_file_path().returning(|| Ok(None));
    prompts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn prompter(input: &str) -> Prompter {
        let (events, _) = mpsc::channel(1);
        let (_, settled) = watch::channel(0);
        Prompter::new(input, OutputFormat::Human, events, settled)
    }

    #[test]
    fn test_clear_then_reset() {
        let mut prompter = prompter(EXAMPLE_INPUT);
        let mut prompts = MockMenuPrompts::new();

        assert_eq!(
            Some(UserEvent::EditInput(String::new())),
            prompter
                .event_for(MenuAction::ClearInput, &mut prompts)
                .unwrap()
        );
        assert_eq!(
            None,
            prompter
                .event_for(MenuAction::ClearInput, &mut prompts)
                .unwrap()
        );
        assert_eq!(
            Some(UserEvent::EditInput(EXAMPLE_INPUT.to_string())),
            prompter
                .event_for(MenuAction::ResetExample, &mut prompts)
                .unwrap()
        );
    }

    #[test]
    fn test_reset_on_example_is_not_a_change() {
        let mut prompter = prompter(EXAMPLE_INPUT);
        let mut prompts = MockMenuPrompts::new();
        assert_eq!(
            None,
            prompter
                .event_for(MenuAction::ResetExample, &mut prompts)
                .unwrap()
        );
    }

    #[test]
    fn test_quit_always_produces_quit() {
        let mut prompter = prompter("");
        let mut prompts = MockMenuPrompts::new();
        assert_eq!(
            Some(UserEvent::Quit),
            prompter.event_for(MenuAction::Quit, &mut prompts).unwrap()
        );
    }

    #[test]
    fn test_selecting_same_format_is_not_a_change() {
        let mut prompter = prompter("");
        let mut prompts = MockMenuPrompts::new();
        prompts
            .expect_choose_format()
            .withf(|options| options.iter().filter(|o| o.selected).count() == 1)
            .times(2)
            .returning(|options| {
                Ok(Some(if options[0].selected {
                    OutputFormat::Junit
                } else {
                    OutputFormat::Human
                }))
            });

        assert_eq!(
            Some(UserEvent::SelectFormat(OutputFormat::Junit)),
            prompter
                .event_for(MenuAction::SelectFormat, &mut prompts)
                .unwrap()
        );
        assert_eq!(None, prompter.select(OutputFormat::Junit));
        assert_eq!(
            Some(UserEvent::SelectFormat(OutputFormat::Human)),
            prompter
                .event_for(MenuAction::SelectFormat, &mut prompts)
                .unwrap()
        );
    }

    #[test]
    fn test_cancelled_edit_is_not_a_change() {
        let mut prompter = prompter("kind: Service");
        let mut prompts = MockMenuPrompts::new();
        prompts
            .expect_edit_input()
            .withf(|current| current == "kind: Service")
            .times(1)
            .returning(|_| Ok(None));

        assert_eq!(
            None,
            prompter
                .event_for(MenuAction::EditInput, &mut prompts)
                .unwrap()
        );
    }

    #[test]
    fn test_unreadable_file_is_not_a_change() {
        let mut prompter = prompter("kind: Service");
        let mut prompts = MockMenuPrompts::new();
        prompts
            .expect_file_path()
            .times(1)
            .returning(|| Ok(Some("/does/not/exist.yaml".to_string())));

        assert_eq!(
            None,
            prompter
                .event_for(MenuAction::LoadFile, &mut prompts)
                .unwrap()
        );
        assert_eq!("kind: Service", prompter.input);
    }

    /// Stands in for the session: settles once at mount and once per event.
    async fn settle_each_event(
        mut events: mpsc::Receiver<UserEvent>,
        settled: watch::Sender<u64>,
    ) -> Vec<UserEvent> {
        let mut seen = Vec::new();
        settled.send_modify(|generation| *generation += 1);
        while let Some(event) = events.recv().await {
            let quitting = event == UserEvent::Quit;
            seen.push(event);
            if quitting {
                break;
            }
            settled.send_modify(|generation| *generation += 1);
        }
        seen
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_no_op_actions_keep_the_menu_going() {
        let (events, rx) = mpsc::channel(16);
        let (settled_tx, settled_rx) = watch::channel(0);
        let session = tokio::spawn(settle_each_event(rx, settled_tx));

        let prompter = Prompter::new(EXAMPLE_INPUT, OutputFormat::Human, events, settled_rx);
        let mut prompts = scripted_prompts(
            vec![
                MenuAction::ResetExample,
                MenuAction::SelectFormat,
                MenuAction::SelectFormat,
                MenuAction::EditInput,
                MenuAction::ClearInput,
                MenuAction::ClearInput,
                MenuAction::ResetExample,
                MenuAction::Quit,
            ],
            OutputFormat::Sarif,
        );

        let prompts_done = tokio::task::spawn_blocking(move || prompter.run(&mut prompts));
        tokio::time::timeout(Duration::from_secs(5), prompts_done)
            .await
            .expect("menu loop stalled")
            .unwrap()
            .unwrap();

        assert_eq!(
            vec![
                UserEvent::SelectFormat(OutputFormat::Sarif),
                UserEvent::EditInput(String::new()),
                UserEvent::EditInput(EXAMPLE_INPUT.to_string()),
                UserEvent::Quit,
            ],
            session.await.unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_menu_stops_when_session_is_gone() {
        let (events, rx) = mpsc::channel(16);
        let (settled_tx, settled_rx) = watch::channel(0);
        drop(rx);
        drop(settled_tx);

        let prompter = Prompter::new("", OutputFormat::Human, events, settled_rx);
        let mut prompts = MockMenuPrompts::new();
        prompts.expect_choose_action().never();

        tokio::task::spawn_blocking(move || prompter.run(&mut prompts))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_interrupt_quits_cleanly() {
        let (events, rx) = mpsc::channel(16);
        let (settled_tx, settled_rx) = watch::channel(0);
        let session = tokio::spawn(settle_each_event(rx, settled_tx));

        let prompter = Prompter::new("", OutputFormat::Human, events, settled_rx);
        let mut prompts = MockMenuPrompts::new();
        prompts
            .expect_choose_action()
            .times(1)
            .returning(|_| Err(InquireError::OperationInterrupted));

        tokio::task::spawn_blocking(move || prompter.run(&mut prompts))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vec![UserEvent::Quit], session.await.unwrap());
    }
}
