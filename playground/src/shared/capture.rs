use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_builder::Builder;
use mockall::automock;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, instrument, Level};
use which::which_in;

#[derive(Clone, Default, Builder, Debug)]
#[builder(setter(into))]
pub struct OutputCapture {
    #[builder(default)]
    pub working_dir: PathBuf,
    #[builder(default)]
    stdout: String,
    #[builder(default)]
    stderr: String,
    #[builder(default)]
    pub exit_code: Option<i32>,
    #[builder(default)]
    pub start_time: DateTime<Utc>,
    #[builder(default)]
    pub end_time: DateTime<Utc>,
    #[builder(default)]
    pub command: String,
}

/// Where captured lines go besides the returned [`OutputCapture`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputDestination {
    /// Each line is also logged: stdout at info, stderr at error.
    Logging,
    Null,
}

struct StreamCapture<R: AsyncRead + Unpin> {
    reader: R,
    level: Level,
    dest: OutputDestination,
}

impl<R: AsyncRead + Unpin> StreamCapture<R> {
    // Streams are read whole; engine output must keep its exact whitespace.
    async fn capture_output(mut self) -> Result<String, CaptureError> {
        let mut raw = Vec::new();
        self.reader.read_to_end(&mut raw).await?;
        let text = String::from_utf8(raw)?;

        if let OutputDestination::Logging = self.dest {
            for line in text.lines() {
                match self.level {
                    Level::ERROR => error!("{}", line),
                    _ => info!("{}", line),
                }
            }
        }

        Ok(text)
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unable to run process. {error:?}")]
    IoError {
        #[from]
        error: std::io::Error,
    },
    #[error("File {name} was not executable or it did not exist.")]
    MissingExecutable { name: String },
    #[error("Unable to parse UTF-8 output. {error:?}")]
    FromUtf8Error {
        #[from]
        error: std::string::FromUtf8Error,
    },
}

#[automock]
#[async_trait]
pub trait ExecutionProvider: Send + Sync {
    async fn run_command<'a>(&self, opts: CaptureOpts<'a>) -> Result<OutputCapture, CaptureError>;
}

#[derive(Default, Debug)]
pub struct DefaultExecutionProvider {}

#[async_trait]
impl ExecutionProvider for DefaultExecutionProvider {
    async fn run_command<'a>(&self, opts: CaptureOpts<'a>) -> Result<OutputCapture, CaptureError> {
        OutputCapture::capture_output(opts).await
    }
}

pub struct CaptureOpts<'a> {
    pub working_dir: &'a Path,
    pub env_vars: BTreeMap<String, String>,
    pub path: &'a str,
    pub args: &'a [String],
    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<&'a str>,
    pub output_dest: OutputDestination,
}

impl CaptureOpts<'_> {
    fn command(&self) -> String {
        self.args.join(" ")
    }
}

impl OutputCapture {
    #[instrument(skip_all, fields(command = %opts.command()))]
    pub async fn capture_output(opts: CaptureOpts<'_>) -> Result<Self, CaptureError> {
        check_pre_exec(&opts)?;

        debug!("Executing PATH={} {:?}", &opts.path, &opts.args);

        let start_time = Utc::now();
        let mut child = tokio::process::Command::new(&opts.args[0])
            .args(&opts.args[1..])
            .env("PATH", opts.path)
            .envs(&opts.env_vars)
            .stdin(match opts.stdin {
                Some(_) => Stdio::piped(),
                None => Stdio::null(),
            })
            .stderr(Stdio::piped())
            .stdout(Stdio::piped())
            .current_dir(opts.working_dir)
            .kill_on_drop(true)
            .spawn()?;

        let stdin_pipe = child.stdin.take();
        let input = opts.stdin.unwrap_or_default().to_string();
        let feed_stdin = async move {
            if let Some(mut pipe) = stdin_pipe {
                pipe.write_all(input.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let stdout = match child.stdout.take() {
            Some(reader) => reader,
            None => return Err(std::io::Error::other("stdout was not captured").into()),
        };
        let stdout = StreamCapture {
            reader: stdout,
            level: Level::INFO,
            dest: opts.output_dest.clone(),
        }
        .capture_output();

        let stderr = match child.stderr.take() {
            Some(reader) => reader,
            None => return Err(std::io::Error::other("stderr was not captured").into()),
        };
        let stderr = StreamCapture {
            reader: stderr,
            level: Level::ERROR,
            dest: opts.output_dest.clone(),
        }
        .capture_output();

        let (fed, command_result, captured_stdout, captured_stderr) =
            tokio::join!(feed_stdin, child.wait(), stdout, stderr);
        let end_time = Utc::now();
        debug!("join result {:?}", command_result);

        // A child that exits without draining stdin breaks the pipe; its output still counts.
        if let Err(e) = fed {
            debug!("Unable to write stdin {:?}", e);
        }

        Ok(Self {
            working_dir: opts.working_dir.to_path_buf(),
            stdout: captured_stdout?,
            stderr: captured_stderr?,
            exit_code: command_result?.code(),
            start_time,
            end_time,
            command: opts.command(),
        })
    }

    pub fn get_stdout(&self) -> &str {
        &self.stdout
    }

    pub fn get_stderr(&self) -> &str {
        &self.stderr
    }
}

fn check_pre_exec(opts: &CaptureOpts) -> Result<(), CaptureError> {
    let command = opts.command();
    let found_binary = match opts.args.first() {
        None => return Err(CaptureError::MissingExecutable { name: command }),
        Some(path) => which_in(path, Some(OsString::from(opts.path)), opts.working_dir),
    };

    match found_binary {
        Ok(path) if path.exists() => Ok(()),
        Ok(path) => Err(CaptureError::MissingExecutable {
            name: path.display().to_string(),
        }),
        Err(e) => {
            debug!("Unable to find binary {:?}", e);
            Err(CaptureError::MissingExecutable { name: command })
        }
    }
}
