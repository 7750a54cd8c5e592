//! External process execution.
//!
//! Everything the orchestrator launches goes through the [`ProcessRunner`]
//! trait so action sequencing can be tested without spawning real binaries.
//! [`TokioProcessRunner`] is the production implementation.

use crate::error::{ActionError, ProcessFailure, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A program, its arguments, and the variables to add to its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Overlaid on the parent environment.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        cmd
    }

    fn failed(&self, failure: ProcessFailure) -> ActionError {
        ActionError::Process {
            command: self.to_string(),
            failure,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ProcessRunner
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion with inherited stdout/stderr. A spawn failure or a
    /// non-zero exit is an [`ActionError::Process`].
    async fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Run a long-lived process until it exits on its own or `cancel` fires,
    /// in which case it is killed and reaped before this returns.
    async fn supervise(&self, invocation: Invocation, cancel: CancellationToken) -> Result<()>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        tracing::info!(command = %invocation, "running");

        let status = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| invocation.failed(ProcessFailure::Spawn(e.to_string())))?;

        if status.success() {
            Ok(())
        } else {
            tracing::warn!(command = %invocation, code = ?status.code(), "command failed");
            Err(invocation.failed(ProcessFailure::Exit(status.code())))
        }
    }

    async fn supervise(&self, invocation: Invocation, cancel: CancellationToken) -> Result<()> {
        let mut child = invocation
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| invocation.failed(ProcessFailure::Spawn(e.to_string())))?;

        tracing::debug!(command = %invocation, pid = ?child.id(), "supervising");

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                tracing::warn!(command = %invocation, code = ?status.code(), "supervised process exited");
                if status.success() {
                    Ok(())
                } else {
                    Err(invocation.failed(ProcessFailure::Exit(status.code())))
                }
            }
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                tracing::debug!(command = %invocation, "supervised process stopped");
                Ok(())
            }
        }
    }
}
