//! External process execution
//!
//! Every configure/build/install/patch/VCS step goes through a
//! [`CommandRunner`]. Invocations carry their own working directory and
//! environment overlay; the orchestrating process never changes its own.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::ProcessError;

/// Environment variables applied on top of the inherited environment
pub type EnvOverlay = BTreeMap<String, String>;

/// A single shell command with its working directory and environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Shell command line
    pub command: String,
    /// Working directory
    pub cwd: PathBuf,
    /// Environment overlay
    pub env: EnvOverlay,
    /// Capture output instead of echoing it (revision queries and the like)
    pub silent: bool,
}

impl Invocation {
    /// Create an invocation with an empty overlay
    pub fn new(command: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            cwd: cwd.into(),
            env: EnvOverlay::new(),
            silent: false,
        }
    }

    /// Apply an environment overlay
    #[must_use]
    pub fn with_env(mut self, env: &EnvOverlay) -> Self {
        self.env.extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Do not echo output
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Combined stdout and stderr; only silent invocations keep it
    pub output: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes shell invocations
pub trait CommandRunner: Send + Sync {
    /// Run to completion; a non-zero exit is reported in the output, not as an error
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError>;
}

/// Run an invocation and fail on non-zero exit
pub fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput, ProcessError> {
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(ProcessError::Failed {
            command: invocation.command.clone(),
            cwd: invocation.cwd.clone(),
            code: output.code,
        })
    }
}

/// Run an invocation whose failure is acceptable; returns whether it succeeded
pub fn run_tolerant(runner: &dyn CommandRunner, invocation: &Invocation) -> bool {
    match runner.run(invocation) {
        Ok(output) if output.success() => true,
        Ok(output) => {
            warn!(
                command = %invocation.command,
                code = ?output.code,
                "Ignoring failed command"
            );
            false
        }
        Err(e) => {
            warn!("Ignoring failed command: {e}");
            false
        }
    }
}

/// Where process output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Echo to the terminal as it arrives
    Stream,
    /// Append to a log file
    Log(PathBuf),
}

/// Runs invocations through `sh -c` with stderr folded into stdout
#[derive(Debug, Clone)]
pub struct ShellRunner {
    mode: OutputMode,
}

impl ShellRunner {
    /// Create a runner with the given output mode
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }

    fn open_sink(&self, silent: bool) -> Option<std::fs::File> {
        match (&self.mode, silent) {
            (OutputMode::Log(path), false) => match open_log(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("Cannot open log file '{}': {e}", path.display());
                    None
                }
            },
            _ => None,
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(OutputMode::Stream)
    }
}

fn open_log(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

impl CommandRunner for ShellRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ProcessError> {
        debug!(
            command = %invocation.command,
            cwd = %invocation.cwd.display(),
            env = ?invocation.env,
            "Running"
        );

        let spawn_error = |e: std::io::Error| ProcessError::Spawn {
            command: invocation.command.clone(),
            cwd: invocation.cwd.clone(),
            error: e.to_string(),
        };

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(format!("exec 2>&1\n{}", invocation.command))
            .current_dir(&invocation.cwd)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let echo = self.mode == OutputMode::Stream && !invocation.silent;
        let mut sink = self.open_sink(invocation.silent);
        let mut captured = String::new();

        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let n = reader.read_until(b'\n', &mut buf).map_err(spawn_error)?;
                if n == 0 {
                    break;
                }
                let line = String::from_utf8_lossy(&buf);
                if echo {
                    print!("{line}");
                }
                if let Some(file) = sink.as_mut() {
                    // Losing log lines must not abort the build
                    let _ = file.write_all(line.as_bytes());
                }
                if invocation.silent {
                    captured.push_str(&line);
                }
            }
        }

        let status = child.wait().map_err(spawn_error)?;
        Ok(CommandOutput {
            code: status.code(),
            output: captured,
        })
    }
}
