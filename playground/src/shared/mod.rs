mod capture;
mod config;
mod logging;

pub const RUN_ID_ENV_VAR: &str = "KSP_RUN_ID";
pub const ENGINE_BIN_ENV_VAR: &str = "KUBE_SCORE_BIN";

pub mod prelude {
    pub use super::capture::{
        CaptureError, CaptureOpts, DefaultExecutionProvider, ExecutionProvider,
        MockExecutionProvider, OutputCapture, OutputCaptureBuilder, OutputDestination,
    };
    pub use super::config::{ConfigOptions, FoundConfig};
    pub use super::logging::{waiting_spinner, LoggingOpts, STDOUT_WRITER};
    pub use super::{ENGINE_BIN_ENV_VAR, RUN_ID_ENV_VAR};
}
