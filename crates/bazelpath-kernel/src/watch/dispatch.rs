//! Event classification and side-effect dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use super::{ChangeEvent, Invalidator, INTERFACE_DEFINITION_EXTENSION, SOURCE_EXTENSION};
use crate::config::NamespaceConfig;
use crate::exec::BuildExecutor;

/// What one change event should trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Virtual path whose directory entry is invalidated.
    pub virtual_path: PathBuf,
    /// Vendor-relative path for the additional file-level invalidation.
    pub vendor_file: Option<PathBuf>,
    /// Build target for interface-definition sources: `<dir>:*`.
    pub build_target: Option<String>,
    /// Import path of the containing package, for installable sources.
    pub install_path: Option<String>,
}

/// Classify a changed real path.
///
/// `None` means the event is discarded: outside the workspace, hidden,
/// ignored, version-control metadata, or a vendor root itself.
pub fn plan(config: &NamespaceConfig, real_path: &Path) -> Option<DispatchPlan> {
    let rel = real_path.strip_prefix(config.workspace_root()).ok()?;
    if rel.as_os_str().is_empty()
        || config.is_ignored_path(rel)
        || NamespaceConfig::is_vcs_metadata(rel)
    {
        return None;
    }

    let (virtual_path, vendor_file) = match config.vendor_root_of(rel) {
        Some((_, vendor_rel)) if vendor_rel.as_os_str().is_empty() => return None,
        Some((_, vendor_rel)) => (vendor_rel.to_path_buf(), Some(vendor_rel.to_path_buf())),
        None => (Path::new(config.virtual_prefix()).join(rel), None),
    };

    let extension = rel.extension().and_then(|ext| ext.to_str());
    let is_interface = extension == Some(INTERFACE_DEFINITION_EXTENSION);
    let is_source = extension == Some(SOURCE_EXTENSION);

    let build_target = is_interface.then(|| {
        let dir = rel.parent().unwrap_or(Path::new(""));
        format!("{}:*", dir.display())
    });

    let install_path = if is_interface || is_source {
        virtual_path
            .parent()
            .map(|dir| dir.to_string_lossy().into_owned())
            .filter(|dir| !dir.is_empty())
    } else {
        None
    };

    Some(DispatchPlan {
        virtual_path,
        vendor_file,
        build_target,
        install_path,
    })
}

/// Single consumer of the event channel.
pub(crate) struct Dispatcher {
    config: Arc<NamespaceConfig>,
    invalidator: Arc<dyn Invalidator>,
    executor: Arc<dyn BuildExecutor>,
}

impl Dispatcher {
    pub(crate) fn new(
        config: Arc<NamespaceConfig>,
        invalidator: Arc<dyn Invalidator>,
        executor: Arc<dyn BuildExecutor>,
    ) -> Self {
        Self {
            config,
            invalidator,
            executor,
        }
    }

    pub(crate) async fn run(
        self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                Some(result) = tasks.join_next() => {
                    if let Err(e) = result {
                        warn!(error = %e, "dispatch task failed");
                    }
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event, &mut tasks),
                    None => break,
                },
            }
        }

        events.close();
        let mut discarded = 0usize;
        while events.try_recv().is_ok() {
            discarded += 1;
        }
        tasks.shutdown().await;
        info!(discarded, "change watcher stopped");
    }

    fn dispatch(&self, event: ChangeEvent, tasks: &mut JoinSet<()>) {
        let Some(plan) = plan(&self.config, &event.path) else {
            trace!(path = %event.path.display(), "ignoring change");
            return;
        };
        debug!(
            path = %event.path.display(),
            kind = ?event.kind,
            virtual_path = %plan.virtual_path.display(),
            "dispatching change"
        );

        let DispatchPlan {
            virtual_path,
            vendor_file,
            build_target,
            install_path,
        } = plan;

        let invalidator = Arc::clone(&self.invalidator);
        tasks.spawn_blocking(move || {
            if let Err(e) = invalidator.invalidate_entry(&virtual_path) {
                warn!(path = %virtual_path.display(), error = %e, "entry invalidation failed");
            }
            if let Some(file) = vendor_file {
                if let Err(e) = invalidator.invalidate_file(&file) {
                    warn!(path = %file.display(), error = %e, "file invalidation failed");
                }
            }
        });

        if let Some(target) = build_target {
            let executor = Arc::clone(&self.executor);
            let workspace = self.config.workspace_root().to_path_buf();
            tasks.spawn(async move {
                match executor.build(&workspace, &target).await {
                    Ok(()) => info!(target = %target, "built"),
                    Err(e) => warn!(target = %target, error = %e, "build failed"),
                }
            });
        }

        if let Some(import_path) = install_path {
            let executor = Arc::clone(&self.executor);
            tasks.spawn(async move {
                match executor.install_import_path(&import_path).await {
                    Ok(()) => info!(import_path = %import_path, "installed"),
                    Err(e) => warn!(import_path = %import_path, error = %e, "install failed"),
                }
            });
        }
    }
}
