//! Build-on-mount and IDE launch.
//!
//! Everything here is best effort: failures are logged and the next step
//! still runs.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use bazelpath_kernel::BuildExecutor;
use regex::Regex;
use tracing::{info, warn};

use crate::settings::Settings;

/// Top-level workspace directories treated as first-party projects:
/// not hidden and not matching any ignore pattern. Sorted.
pub fn projects(workspace: &Path, ignore: &[Regex]) -> io::Result<Vec<String>> {
    let mut projects: Vec<String> = fs::read_dir(workspace)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .filter(|name| !ignore.iter().any(|re| re.is_match(name)))
        .collect();
    projects.sort();
    Ok(projects)
}

/// Query and build the configured rule kinds of every project, then
/// install every first-party package.
pub async fn build_all(settings: &Settings, workspace: &Path, executor: &dyn BuildExecutor) {
    let Some(build) = &settings.build else {
        info!("no [build] settings, skipping build");
        return;
    };
    let ignore = match build.ignore_patterns() {
        Ok(ignore) => ignore,
        Err(e) => {
            warn!(error = %e, "skipping build");
            return;
        }
    };
    let projects = match projects(workspace, &ignore) {
        Ok(projects) => projects,
        Err(e) => {
            warn!(path = %workspace.display(), error = %e, "failed to read workspace");
            return;
        }
    };
    info!(count = projects.len(), "building all packages");

    let mut targets = BTreeSet::new();
    for project in &projects {
        match executor.query_build_targets(workspace, project, &build.rules).await {
            Ok(found) => targets.extend(found),
            Err(e) => warn!(project = %project, error = %e, "target query failed"),
        }
    }

    for target in &targets {
        match executor.build(workspace, target).await {
            Ok(()) => info!(target = %target, "built"),
            Err(e) => warn!(target = %target, error = %e, "build failed"),
        }
    }

    for project in &projects {
        let packages = format!("{}/{}/...", settings.go_pkg_prefix.trim(), project);
        match executor.install_import_path(&packages).await {
            Ok(()) => info!(packages = %packages, "installed"),
            Err(e) => warn!(packages = %packages, error = %e, "install failed"),
        }
    }
}

/// Launch the configured IDE and wait for it to exit.
pub async fn launch_ide(settings: &Settings, executor: &dyn BuildExecutor) {
    let Some(command) = settings.ide_command() else {
        return;
    };
    info!(command, "starting IDE");
    if let Err(e) = executor.run_command(command, &[]).await {
        warn!(command, error = %e, "IDE failed");
    }
}
