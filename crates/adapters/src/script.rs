// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script execution boundary.
//!
//! Every low-level operation is a shell script under the configured scripts
//! directory. Arguments are produced by typed [`ScriptArgs`] structs so a
//! flag rename (`--device` vs `--disk`) is a compile error, not a wiped disk.
//!
//! Exit status contract:
//!
//! | exit | meaning |
//! |------|---------|
//! | 0    | success; last stdout line may be a JSON detail object |
//! | 2    | invalid input |
//! | 124  | the script's own timeout fired |
//! | other| execution failure |

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use rst_core::{ActionError, ActionOutput};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Exit code scripts use to reject their arguments.
pub const EXIT_INVALID_INPUT: i32 = 2;
/// Exit code scripts use when an internal timeout fired.
pub const EXIT_TIMEOUT: i32 = 124;

const STDERR_TAIL_LINES: usize = 5;
const STDOUT_TAIL_LINES: usize = 20;

/// Typed arguments for one script.
pub trait ScriptArgs: Send + Sync {
    /// Script filename relative to the scripts directory (e.g. `install.sh`).
    fn script_name(&self) -> &'static str;

    /// CLI arguments exactly as the script's parser expects them.
    fn to_cli_args(&self) -> Vec<String>;

    /// Environment contract (confirmation flags and the like).
    fn env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether the script may be terminated on a cancellation request.
    ///
    /// Scripts that write to a device must return `false`; they always run
    /// to completion.
    fn interruptible(&self) -> bool {
        false
    }
}

/// Raw result of a script run.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// SIGTERM was sent to the script's process group
    pub terminated: bool,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty stdout line.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout.lines().rev().map(str::trim).find(|l| !l.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to spawn {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for {script}: {source}")]
    Wait {
        script: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<ScriptError> for ActionError {
    fn from(err: ScriptError) -> Self {
        ActionError::execution(err.to_string())
    }
}

/// Runs scripts from a directory, each in its own process group.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    scripts_dir: PathBuf,
    shell: PathBuf,
}

impl ScriptRunner {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self { scripts_dir: scripts_dir.into(), shell: PathBuf::from("sh") }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Run a script and capture its output without interpreting the exit code.
    pub async fn run_raw(
        &self,
        args: &dyn ScriptArgs,
        cancel: &CancellationToken,
    ) -> Result<ScriptOutput, ScriptError> {
        let name = args.script_name();
        let path = self.scripts_dir.join(name);
        if !path.is_file() {
            return Err(ScriptError::NotFound(path));
        }
        let cli_args = args.to_cli_args();
        let env_vars = args.env_vars();
        info!(script = name, args = ?cli_args, "running script");

        let mut cmd = Command::new(&self.shell);
        cmd.arg(&path)
            .args(&cli_args)
            .envs(env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);
        let child =
            cmd.spawn().map_err(|source| ScriptError::Spawn { script: name.to_string(), source })?;
        let pid = child.id();

        let wait = child.wait_with_output();
        tokio::pin!(wait);
        let mut terminated = false;
        let interruptible = args.interruptible();
        let output = loop {
            tokio::select! {
                out = &mut wait => break out,
                _ = cancel.cancelled(), if interruptible && !terminated => {
                    terminated = true;
                    if let Some(pid) = pid {
                        terminate_group(name, pid);
                    }
                }
            }
        }
        .map_err(|source| ScriptError::Wait { script: name.to_string(), source })?;

        let result = ScriptOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            terminated,
        };
        debug!(script = name, exit_code = ?result.exit_code, terminated, "script finished");
        Ok(result)
    }

    /// Run a script and classify the result per the exit status contract.
    pub async fn run(
        &self,
        args: &dyn ScriptArgs,
        cancel: &CancellationToken,
    ) -> Result<ActionOutput, ActionError> {
        let name = args.script_name();
        let output = self.run_raw(args, cancel).await?;
        classify(name, &output)
    }
}

/// Map a finished script to an action result.
pub fn classify(name: &str, output: &ScriptOutput) -> Result<ActionOutput, ActionError> {
    if output.success() {
        return Ok(ActionOutput::new(output.exit_code, detail(output)));
    }
    if output.terminated {
        return Err(ActionError::cancelled(format!("{name} stopped on cancellation request")));
    }
    let stderr = tail(&output.stderr, STDERR_TAIL_LINES);
    match output.exit_code {
        Some(EXIT_INVALID_INPUT) => Err(ActionError::invalid_input(format!("{name}: {stderr}"))),
        Some(EXIT_TIMEOUT) => Err(ActionError::timeout(format!("{name} timed out: {stderr}"))),
        Some(code) => Err(ActionError::execution(format!("{name} exited with {code}: {stderr}"))),
        None => Err(ActionError::execution(format!("{name} was killed by a signal: {stderr}"))),
    }
}

/// Machine-readable detail: the last stdout line if it is JSON, else a tail.
fn detail(output: &ScriptOutput) -> Value {
    output
        .last_line()
        .and_then(|line| serde_json::from_str::<Value>(line).ok())
        .unwrap_or_else(|| json!({ "stdout": tail(&output.stdout, STDOUT_TAIL_LINES) }))
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

fn terminate_group(name: &str, pid: u32) {
    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => info!(script = name, pid, "sent SIGTERM to script process group"),
        Err(e) => warn!(script = name, pid, error = %e, "failed to signal script"),
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
