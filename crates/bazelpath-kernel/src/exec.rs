//! Build Executor collaborator.
//!
//! The overlay never runs build tools itself. The change watcher and the
//! bootstrap code request work through [`BuildExecutor`]; every call is
//! best effort and its failure is logged by the caller, never surfaced to
//! filesystem clients.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("empty command line")]
    EmptyCommand,
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Runs the toolchain and build-system commands.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Install the package at an import path (`go install <path>`).
    async fn install_import_path(&self, import_path: &str) -> ExecResult<()>;

    /// Targets of the given rule kinds under a workspace directory.
    async fn query_build_targets(
        &self,
        workspace: &Path,
        directory: &str,
        rule_kinds: &[String],
    ) -> ExecResult<BTreeSet<String>>;

    /// Build one target label.
    async fn build(&self, workspace: &Path, target: &str) -> ExecResult<()>;

    /// Run an arbitrary command line with environment overrides.
    async fn run_command(&self, command_line: &str, env: &[(String, String)]) -> ExecResult<()>;
}
