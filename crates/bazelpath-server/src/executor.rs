//! Subprocess [`BuildExecutor`] running `go` and `bazel`.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use bazelpath_kernel::{BuildExecutor, ExecError, ExecResult};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs toolchain and build commands with `GOPATH` pointing at the overlay.
#[derive(Debug, Clone)]
pub struct BazelExecutor {
    go_path: PathBuf,
    workspace: PathBuf,
}

impl BazelExecutor {
    pub fn new(go_path: impl Into<PathBuf>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            go_path: go_path.into(),
            workspace: workspace.into(),
        }
    }

    pub fn go_path(&self) -> &Path {
        &self.go_path
    }

    fn command<I, S>(&self, program: &str, args: I, cwd: &Path) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .env("GOPATH", &self.go_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run to completion; stdout on success.
    async fn output(&self, mut cmd: Command, display: String) -> ExecResult<String> {
        let command_display = &display;
        debug!(command = %command_display, "running");
        let output = cmd.output().await.map_err(|source| ExecError::Spawn {
            command: display.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                command: display,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_line(&self, command_line: &str, env: &[(String, String)]) -> ExecResult<String> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next().ok_or(ExecError::EmptyCommand)?;

        let mut cmd = self.command(program, parts, &self.workspace);
        cmd.envs(env.iter().map(|(key, value)| (key, value)));
        self.output(cmd, command_line.to_string()).await
    }
}

/// Keep the labels under `//<directory>/` from `bazel query` output.
pub fn parse_query_output(output: &str, directory: &str, targets: &mut BTreeSet<String>) {
    let package = format!("//{directory}/");
    targets.extend(
        output
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with(&package))
            .map(str::to_string),
    );
}

#[async_trait]
impl BuildExecutor for BazelExecutor {
    async fn install_import_path(&self, import_path: &str) -> ExecResult<()> {
        let cmd = self.command("go", ["install", import_path], &self.workspace);
        self.output(cmd, format!("go install {import_path}")).await?;
        Ok(())
    }

    async fn query_build_targets(
        &self,
        workspace: &Path,
        directory: &str,
        rule_kinds: &[String],
    ) -> ExecResult<BTreeSet<String>> {
        let mut targets = BTreeSet::new();
        for kind in rule_kinds {
            let query = format!("kind({kind}, deps({directory}/...))");
            let cmd = self.command("bazel", ["query", query.as_str()], workspace);
            match self.output(cmd, format!("bazel query {query}")).await {
                Ok(output) => parse_query_output(&output, directory, &mut targets),
                // A directory without targets of this kind fails the query.
                Err(e) => warn!(directory, kind = %kind, error = %e, "bazel query failed"),
            }
        }
        Ok(targets)
    }

    async fn build(&self, workspace: &Path, target: &str) -> ExecResult<()> {
        let cmd = self.command("bazel", ["build", target], workspace);
        self.output(cmd, format!("bazel build {target}")).await?;
        Ok(())
    }

    async fn run_command(&self, command_line: &str, env: &[(String, String)]) -> ExecResult<()> {
        self.run_line(command_line, env).await?;
        Ok(())
    }
}
