//! External command execution with captured output.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{EngineError, Result};

/// Captured result of one external command run. A non-zero exit code is not
/// a failure of the call; the caller inspects `status` and decides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Captured stdout followed by captured stderr.
    pub output: String,
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub success: bool,
}

/// Runs `program` with `args`, environment overrides and an optional
/// working directory, blocking the calling task until it exits.
///
/// Fails with `SpawnError` only when the process cannot be started. No
/// timeout is enforced; callers needing bounded execution wrap the future
/// with their own cancellation.
pub async fn run_command_line(
    program: &str,
    args: &[String],
    env_overrides: &HashMap<String, String>,
    work_dir: Option<&Path>,
) -> Result<CommandOutput> {
    if program.trim().is_empty() {
        return Err(EngineError::InvalidPath("empty program name".to_string()));
    }

    let mut command = Command::new(program);
    command
        .args(args)
        .envs(env_overrides)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = work_dir {
        command.current_dir(dir);
    }

    let result = command.output().await.map_err(|e| EngineError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
    output.push_str(&String::from_utf8_lossy(&result.stderr));

    Ok(CommandOutput {
        output,
        status: result.status.code(),
        success: result.status.success(),
    })
}

/// The engine process environment as `KEY=VALUE` pairs.
pub fn environment() -> Vec<String> {
    std::env::vars().map(|(k, v)| format!("{k}={v}")).collect()
}
