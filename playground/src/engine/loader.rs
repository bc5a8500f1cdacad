use super::command::{CommandEngine, EngineOptions};
use super::{EngineError, EngineSlot};
use crate::shared::prelude::{CaptureOpts, ExecutionProvider, FoundConfig, OutputDestination};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use which::which_in;

pub const LOADER_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Locates and probes the `kube-score` executable, then binds it into an [`EngineSlot`].
pub struct EngineLoader {
    options: EngineOptions,
    working_dir: PathBuf,
    path: String,
    exec_runner: Arc<dyn ExecutionProvider>,
}

impl EngineLoader {
    pub fn new(
        found_config: &FoundConfig,
        options: EngineOptions,
        exec_runner: Arc<dyn ExecutionProvider>,
    ) -> Self {
        Self {
            options,
            working_dir: found_config.working_dir.clone(),
            path: found_config.bin_path.clone(),
            exec_runner,
        }
    }

    fn resolve_binary(&self) -> Result<PathBuf, EngineError> {
        which_in(
            &self.options.engine_bin,
            Some(OsString::from(&self.path)),
            &self.working_dir,
        )
        .map_err(|e| {
            debug!("Unable to resolve {}: {:?}", self.options.engine_bin, e);
            EngineError::NotFound {
                binary: self.options.engine_bin.clone(),
            }
        })
    }

    #[instrument(skip(self), fields(engine = %self.options.engine_bin))]
    pub async fn load(&self) -> Result<CommandEngine, EngineError> {
        let binary = self.resolve_binary()?;
        let args = vec![binary.display().to_string(), "version".to_string()];

        let probe = self
            .exec_runner
            .run_command(CaptureOpts {
                working_dir: &self.working_dir,
                env_vars: Default::default(),
                path: &self.path,
                args: &args,
                stdin: None,
                output_dest: OutputDestination::Logging,
            })
            .await?;

        if probe.exit_code != Some(0) {
            return Err(EngineError::ProbeFailed {
                binary: binary.display().to_string(),
                message: probe.get_stderr().trim().to_string(),
            });
        }

        Ok(CommandEngine {
            binary,
            options: self.options.clone(),
            working_dir: self.working_dir.clone(),
            path: self.path.clone(),
            exec_runner: self.exec_runner.clone(),
        })
    }

    /// Keeps trying to load until it succeeds, then publishes into `slot`.
    pub async fn load_into(self, slot: EngineSlot) {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.load().await {
                Ok(engine) => {
                    info!(
                        "analysis engine {} ready after {} attempt(s)",
                        engine.binary.display(),
                        attempts
                    );
                    slot.publish(Arc::new(engine));
                    return;
                }
                Err(e) => {
                    debug!("analysis engine not available yet: {}", e);
                    tokio::time::sleep(LOADER_RETRY_INTERVAL).await;
                }
            }
        }
    }

    pub fn spawn(self, slot: EngineSlot) -> JoinHandle<()> {
        tokio::spawn(self.load_into(slot))
    }
}
