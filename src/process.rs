//! External process invocation boundary.
//!
//! Everything this crate does to the outside world goes through a single
//! seam: spawning `ssh`/`scp` for remote work and the JVM histogram tools
//! for aggregation. Commands are built as structured argument lists
//! (program + argv), never interpolated into a shell string, and the exit
//! code is always surfaced to the caller. Tests substitute a scripted
//! invoker for the real one.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::trace;

use crate::error::{Error, Result};

/// A fully specified external command: program, argv, and an optional
/// working directory for the child. The working directory travels with the
/// invocation instead of mutating the orchestrator's own cwd, so there is
/// nothing to restore on error paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    /// Program to execute (resolved via PATH)
    pub program: String,
    /// Arguments, one element per argv entry
    pub args: Vec<String>,
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
}

impl InvocationSpec {
    /// Creates a new invocation with no working-directory override.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
        }
    }

    /// Sets the child's working directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Renders the invocation for log messages.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Captured result of an external invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationOutput {
    /// Exit code of the child (−1 if terminated by signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl InvocationOutput {
    /// True if the child exited with code 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The seam between orchestration logic and the operating system.
///
/// Implementations must never interpret the invocation through a shell;
/// the argv is passed to the child verbatim.
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    /// Runs the command to completion, capturing output. An `Err` here means
    /// the child could not be spawned or waited on; a nonzero exit code is
    /// reported through [`InvocationOutput::exit_code`], not as an error.
    async fn invoke(&self, spec: &InvocationSpec) -> Result<InvocationOutput>;
}

/// Invoker that spawns real child processes on the control node.
#[derive(Debug, Default, Clone)]
pub struct LocalInvoker;

impl LocalInvoker {
    /// Creates a new local invoker.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandInvoker for LocalInvoker {
    async fn invoke(&self, spec: &InvocationSpec) -> Result<InvocationOutput> {
        trace!(command = %spec.display(), cwd = ?spec.cwd, "Invoking external command");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|e| {
            Error::Internal(format!("Failed to spawn '{}': {}", spec.program, e))
        })?;

        Ok(InvocationOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = InvocationSpec::new("ssh", vec!["-q".into(), "host".into(), "ls".into()]);
        assert_eq!(spec.display(), "ssh -q host ls");
    }

    #[tokio::test]
    async fn local_invoker_captures_exit_code_and_stdout() {
        let invoker = LocalInvoker::new();
        let out = invoker
            .invoke(&InvocationSpec::new("sh", vec!["-c".into(), "echo hi".into()]))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hi");

        let out = invoker
            .invoke(&InvocationSpec::new("sh", vec!["-c".into(), "exit 7".into()]))
            .await
            .unwrap();
        assert_eq!(out.exit_code, 7);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn local_invoker_honors_cwd() {
        let dir = std::env::temp_dir();
        let invoker = LocalInvoker::new();
        let out = invoker
            .invoke(&InvocationSpec::new("pwd", vec![]).with_cwd(&dir))
            .await
            .unwrap();
        assert_eq!(
            std::path::Path::new(out.stdout.trim())
                .canonicalize()
                .unwrap(),
            dir.canonicalize().unwrap()
        );
    }
}
