use super::interactive::{InquirePrompts, Prompter};
use super::Session;
use crate::engine::prelude::{EngineLoader, EngineOptions, EngineSlot};
use crate::run::prelude::{
    format_options, Evaluation, OutputFormat, ReadinessPoller, RunController, TerminalSink,
    EXAMPLE_INPUT,
};
use crate::shared::prelude::{DefaultExecutionProvider, FoundConfig, STDOUT_WRITER};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{error, info_span, warn, Instrument};
use tracing_indicatif::span_ext::IndicatifSpanExt;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Output format selected when the session starts
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Start from the contents of this file instead of the built-in example
    #[arg(long, short)]
    input: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Seconds to wait for the analysis engine to become available
    #[arg(long, default_value = "30", env = "KSP_ENGINE_TIMEOUT")]
    engine_timeout: u64,

    /// File with object definitions, `-` for stdin. Defaults to the built-in example.
    input: Option<String>,
}

#[derive(Debug, Args)]
pub struct FormatsArgs {
    /// Print the formats as JSON
    #[arg(long)]
    json: bool,
}

const EXIT_ENGINE_FAILED: i32 = 1;
const EXIT_ENGINE_UNAVAILABLE: i32 = 2;

fn start_loader(found_config: &FoundConfig, engine_options: &EngineOptions) -> EngineSlot {
    let slot = EngineSlot::empty();
    EngineLoader::new(
        found_config,
        engine_options.clone(),
        Arc::new(DefaultExecutionProvider::default()),
    )
    .spawn(slot.clone());
    slot
}

pub async fn run_root(
    found_config: &FoundConfig,
    engine_options: &EngineOptions,
    args: &RunArgs,
) -> Result<i32> {
    let input = match &args.input {
        Some(path) => tokio::fs::read_to_string(found_config.working_dir.join(path))
            .await
            .with_context(|| format!("Unable to read {}", path.display()))?,
        None => EXAMPLE_INPUT.to_string(),
    };

    let slot = start_loader(found_config, engine_options);
    let mut controller = RunController::with_input(slot.clone(), input.clone());
    controller.select_format(args.format);

    let session = Session::new(
        controller,
        ReadinessPoller::new(slot),
        TerminalSink::default(),
    );
    let (events, rx) = mpsc::channel(16);
    let prompter = Prompter::new(input, args.format, events, session.subscribe_settled());

    let mut prompts = InquirePrompts::new(STDOUT_WRITER.clone());
    let menu = tokio::task::spawn_blocking(move || prompter.run(&mut prompts));
    session.run(rx).await;

    menu.await??;
    Ok(0)
}

pub async fn score_root(
    found_config: &FoundConfig,
    engine_options: &EngineOptions,
    args: &ScoreArgs,
) -> Result<i32> {
    let input = read_input(found_config, args.input.as_deref()).await?;
    let slot = start_loader(found_config, engine_options);

    let span = info_span!("engine", "indicatif.pb_show" = true);
    span.pb_set_message("Loading analysis engine");
    let deadline = Duration::from_secs(args.engine_timeout);
    if tokio::time::timeout(deadline, slot.ready().instrument(span))
        .await
        .is_err()
    {
        error!(
            target: "user",
            "Analysis engine `{}` was not available after {}s",
            engine_options.engine_bin,
            args.engine_timeout
        );
        return Ok(EXIT_ENGINE_UNAVAILABLE);
    }

    let mut controller = RunController::with_input(slot, input);
    controller.select_format(args.format);

    let mut sink = TerminalSink::results_only();
    let exit_code = match controller.evaluate(&mut sink).await {
        Evaluation::Completed => 0,
        Evaluation::NoInput => {
            warn!(target: "user", "Input was empty, nothing to score");
            0
        }
        Evaluation::Failed => EXIT_ENGINE_FAILED,
        Evaluation::AwaitingEngine => EXIT_ENGINE_UNAVAILABLE,
    };
    Ok(exit_code)
}

async fn read_input(found_config: &FoundConfig, location: Option<&str>) -> Result<String> {
    match location {
        None => Ok(EXAMPLE_INPUT.to_string()),
        Some("-") => {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Unable to read stdin")?;
            Ok(input)
        }
        Some(file_name) => tokio::fs::read_to_string(found_config.working_dir.join(file_name))
            .await
            .with_context(|| format!("Unable to read {}", file_name)),
    }
}

pub async fn formats_root(args: &FormatsArgs) -> Result<i32> {
    let options = format_options(OutputFormat::default());
    let mut out = STDOUT_WRITER.write().await;

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&options)?)?;
        return Ok(0);
    }

    writeln!(out, "{:<8}{}", "Key".white().bold(), "Label".white().bold())?;
    for option in options {
        let key = option.format.to_string();
        if option.selected {
            writeln!(out, "{:<8}{} (default)", key, option.label)?;
        } else {
            writeln!(out, "{:<8}{}", key, option.label)?;
        }
    }
    Ok(0)
}
