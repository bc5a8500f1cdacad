use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use human_panic::setup_panic;
use kube_score_playground::prelude::*;
use tracing::{enabled, error, info, Level};

/// kube-score playground
///
/// Paste Kubernetes object definitions and get kube-score's recommendations
/// for reliability and security. Everything runs on this machine; nothing is
/// sent anywhere.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(flatten)]
    logging: LoggingOpts,

    #[clap(flatten)]
    config: ConfigOptions,

    #[clap(flatten)]
    engine: EngineOptions,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
struct VersionArgs {
    #[arg(long, action)]
    pub short: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Edit definitions and switch formats interactively, re-scoring on every change.
    #[clap(alias("r"))]
    Run(RunArgs),
    /// Score a file, stdin, or the built-in example once and print the report.
    #[clap(alias("s"))]
    Score(ScoreArgs),
    /// List the output formats.
    #[clap(alias("f"))]
    Formats(FormatsArgs),
    /// Print version info and exit
    #[clap(alias("v"))]
    Version(VersionArgs),
}

#[tokio::main]
async fn main() {
    setup_panic!();
    dotenvy::dotenv().ok();
    let mut opts = Cli::parse();
    let run_id = opts.config.pin_run_id();

    let prefix = match &opts.command {
        Command::Run(_) => "run",
        Command::Score(_) => "score",
        Command::Formats(_) | Command::Version(_) => "root",
    };

    let logging = opts
        .logging
        .configure_logging(&run_id, prefix)
        .await;
    let (_guard, file_location) = match logging {
        Ok((guard, location)) => (Some(guard), Some(location)),
        Err(e) => {
            eprintln!("Unable to configure logging: {:#}", e);
            (None, None)
        }
    };

    let error_code = run_subcommand(opts).await;

    if let Some(location) = file_location {
        if error_code != 0 || enabled!(Level::DEBUG) {
            info!(target: "user", "More detailed logs at {}", location);
        }
    }

    std::process::exit(error_code);
}

async fn run_subcommand(opts: Cli) -> i32 {
    let found_config = match opts.config.load_config() {
        Err(e) => {
            error!(target: "user", "Failed to load configuration: {}", e);
            return 2;
        }
        Ok(c) => c,
    };

    handle_commands(&found_config, &opts.engine, &opts.command)
        .await
        .unwrap_or_else(|e| {
            error!(target: "user", "Critical Error. {:#}", e);
            1
        })
}

async fn handle_commands(
    found_config: &FoundConfig,
    engine: &EngineOptions,
    command: &Command,
) -> Result<i32> {
    match command {
        Command::Run(args) => run_root(found_config, engine, args).await,
        Command::Score(args) => score_root(found_config, engine, args).await,
        Command::Formats(args) => formats_root(args).await,
        Command::Version(args) => print_version(args),
    }
}

fn print_version(args: &VersionArgs) -> Result<i32> {
    if args.short {
        println!("kube-score-playground {}", env!("CARGO_PKG_VERSION"));
    } else {
        info!(target: "always", "{}: {}", "Version".white().bold(), env!("CARGO_PKG_VERSION"));
        info!(target: "always", "{}: {}", "Engine".white().bold(), "kube-score (external)");
    }

    Ok(0)
}
