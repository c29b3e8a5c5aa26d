//! Safe execution layer: run the fixed media tool with a caller-derived argv.
//! No shell is used; arguments are passed as a list to avoid injection.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Wrapper script that forwards to ffmpeg. Not configurable per request.
pub const TOOL_PATH: &str = "/ffmpegwrapper.sh";

/// Argument used by the health probe.
pub const VERSION_ARG: &str = "-version";

/// Captured outcome of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Newline-terminate non-empty stdout so log lines stay well-formed.
    pub fn ensure_trailing_newline(&mut self) {
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            self.stdout.push('\n');
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} did not finish within {} and was killed", fmt_limit(.limit))]
    TimedOut { program: String, limit: Duration },
}

/// Runs the media tool. The gateway only sees this trait so tests can substitute a double.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<ToolOutput, ExecError>;
}

/// Runs a program as a child process with an optional wall-clock deadline.
/// The child is killed if the returned future is dropped (e.g. the client disconnected).
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Runner for the fixed wrapper at [`TOOL_PATH`].
    pub fn media_tool(timeout: Option<Duration>) -> Self {
        Self::new(TOOL_PATH, timeout)
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, args: &[String]) -> Result<ToolOutput, ExecError> {
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: self.program_name(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(res) => res,
                Err(_) => {
                    return Err(ExecError::TimedOut {
                        program: self.program_name(),
                        limit,
                    })
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ExecError::Wait {
            program: self.program_name(),
            source,
        })?;

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Run the fixed version probe. Ok(version text) on exit 0; Err(error text) otherwise.
/// Takes no caller input, so it bypasses command validation.
pub async fn probe(runner: &dyn ToolRunner) -> Result<String, String> {
    match runner.run(&[VERSION_ARG.to_string()]).await {
        Ok(out) if out.success() => Ok(out.stdout),
        Ok(out) => {
            log::error!(
                "got health request, but the tool returned an error; service unhealthy\n{}",
                out.stderr
            );
            Err(out.stderr)
        }
        Err(e) => {
            log::error!("health probe could not run the tool: {}", e);
            Err(e.to_string())
        }
    }
}

/// Log both streams. Nonzero exit is the only failure signal: stderr on a clean exit is informational.
pub fn log_output(output: &ToolOutput) {
    if output.stdout.is_empty() {
        log::debug!("stdout of the command execution is empty");
    } else {
        log::info!("{}", output.stdout);
    }
    if output.stderr.is_empty() {
        log::debug!("stderr of the command execution is empty");
    } else if output.success() {
        log::info!("{}", output.stderr);
    } else {
        log::error!("{}", output.stderr);
    }
}

fn fmt_limit(limit: &Duration) -> String {
    format_elapsed(*limit)
}

/// `H:MM:SS.mmm`, truncated to milliseconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        elapsed.subsec_millis()
    )
}
