use super::{AnalysisEngine, EngineError};
use crate::run::prelude::OutputFormat;
use crate::shared::prelude::{CaptureOpts, ExecutionProvider, OutputDestination, ENGINE_BIN_ENV_VAR};
use async_trait::async_trait;
use clap::{ArgGroup, Args};
use educe::Educe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Options forwarded to `kube-score score`.
#[derive(Args, Debug, Clone, Default)]
#[clap(group = ArgGroup::new("engine"))]
pub struct EngineOptions {
    /// The kube-score executable. Looked up on PATH unless it contains a `/`.
    #[arg(
        long,
        global(true),
        env = ENGINE_BIN_ENV_VAR,
        default_value = "kube-score"
    )]
    pub engine_bin: String,

    /// Kubernetes version the checks should target, e.g. `v1.18`
    #[arg(long, global(true), env = "KUBE_SCORE_KUBERNETES_VERSION")]
    pub kubernetes_version: Option<String>,

    /// Disable a check, can be set multiple times
    #[arg(long, global(true))]
    pub ignore_test: Vec<String>,

    /// Enable an optional check, can be set multiple times
    #[arg(long, global(true))]
    pub enable_optional_test: Vec<String>,

    /// Do not require containers to set a CPU limit
    #[arg(long, global(true))]
    pub ignore_container_cpu_limit: bool,

    /// Do not require containers to set a memory limit
    #[arg(long, global(true))]
    pub ignore_container_memory_limit: bool,

    /// Ignore `kube-score/ignore` annotations on objects
    #[arg(long, global(true))]
    pub disable_ignore_checks_annotations: bool,
}

impl EngineOptions {
    pub fn new(engine_bin: impl Into<String>) -> Self {
        Self {
            engine_bin: engine_bin.into(),
            ..Default::default()
        }
    }

    /// Arguments after the executable for scoring stdin in `format`.
    pub fn score_args(&self, format: OutputFormat) -> Vec<String> {
        let mut args = vec![
            "score".to_string(),
            "--output-format".to_string(),
            format.to_string(),
        ];
        if format == OutputFormat::Json {
            args.extend(["--output-version".to_string(), "v2".to_string()]);
        }
        if let Some(version) = &self.kubernetes_version {
            args.extend(["--kubernetes-version".to_string(), version.clone()]);
        }
        for test in &self.ignore_test {
            args.extend(["--ignore-test".to_string(), test.clone()]);
        }
        for test in &self.enable_optional_test {
            args.extend(["--enable-optional-test".to_string(), test.clone()]);
        }
        if self.ignore_container_cpu_limit {
            args.push("--ignore-container-cpu-limit".to_string());
        }
        if self.ignore_container_memory_limit {
            args.push("--ignore-container-memory-limit".to_string());
        }
        if self.disable_ignore_checks_annotations {
            args.push("--disable-ignore-checks-annotations".to_string());
        }
        args.push("-".to_string());
        args
    }
}

/// Scores input by running the `kube-score` executable with the input on stdin.
#[derive(Educe)]
#[educe(Debug)]
pub struct CommandEngine {
    pub binary: PathBuf,
    pub options: EngineOptions,
    pub working_dir: PathBuf,
    pub path: String,
    #[educe(Debug(ignore))]
    pub exec_runner: Arc<dyn ExecutionProvider>,
}

// kube-score exits 1 when any object grades critical; the report is still complete.
const SCORED_EXIT_CODES: [i32; 2] = [0, 1];

#[async_trait]
impl AnalysisEngine for CommandEngine {
    #[instrument(skip(self, input), fields(input.len = input.len()))]
    async fn handle_score(&self, input: &str, format: OutputFormat) -> Result<String, EngineError> {
        let mut args = vec![self.binary.display().to_string()];
        args.extend(self.options.score_args(format));

        let output = self
            .exec_runner
            .run_command(CaptureOpts {
                working_dir: &self.working_dir,
                env_vars: Default::default(),
                path: &self.path,
                args: &args,
                stdin: Some(input),
                output_dest: OutputDestination::Null,
            })
            .await?;

        debug!(exit_code = ?output.exit_code, "engine finished");

        let scored = output
            .exit_code
            .map(|code| SCORED_EXIT_CODES.contains(&code))
            .unwrap_or(false);

        if scored && !output.get_stdout().is_empty() {
            return Ok(output.get_stdout().to_string());
        }

        let message = match output.get_stderr().trim() {
            "" => output.get_stdout().trim().to_string(),
            stderr => stderr.to_string(),
        };
        Err(EngineError::Failed {
            exit_code: output.exit_code,
            message,
        })
    }
}
