//! Mount lifecycle: FUSE session plus change watcher.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bazelpath_kernel::{
    BuildExecutor, ChangeWatcher, NamespaceConfig, OverlayFs, WatchError, WatcherHandle,
};
use fuser::{BackgroundSession, MountOption, Session};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::constants::{ATTR_TTL, FS_NAME};
use crate::fuse::{FuseInvalidator, FuseOps, InodeTable, OverlayFuse};

#[derive(Debug, Error)]
pub enum MountError {
    #[error("mounting must happen inside a tokio runtime")]
    NoRuntime,

    #[error("failed to mount {path}: {source}")]
    Mount {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// A mounted overlay and its change watcher.
///
/// Dropping it unmounts without draining the watcher; prefer
/// [`MountedOverlay::unmount`].
pub struct MountedOverlay {
    session: BackgroundSession,
    watcher: WatcherHandle,
    mountpoint: PathBuf,
}

impl MountedOverlay {
    /// Mount the overlay of `config` at `mountpoint` and start watching the
    /// workspace.
    pub fn mount(
        config: Arc<NamespaceConfig>,
        mountpoint: &Path,
        executor: Arc<dyn BuildExecutor>,
    ) -> Result<Self, MountError> {
        let runtime = Handle::try_current().map_err(|_| MountError::NoRuntime)?;
        let mount_error = |source| MountError::Mount {
            path: mountpoint.to_path_buf(),
            source,
        };

        let inodes = Arc::new(InodeTable::new());
        let overlay = OverlayFs::new(Arc::clone(&config));
        let ops = Arc::new(FuseOps::new(Arc::new(overlay), Arc::clone(&inodes)));
        let fs = OverlayFuse::new(ops, runtime, ATTR_TTL);

        let options = [
            MountOption::FSName(FS_NAME.to_string()),
            MountOption::Subtype(FS_NAME.to_string()),
        ];
        let session = Session::new(fs, mountpoint, &options).map_err(mount_error)?;
        let notifier = session.notifier();
        let session = session.spawn().map_err(mount_error)?;
        info!(
            mountpoint = %mountpoint.display(),
            workspace = %config.workspace_root().display(),
            prefix = config.virtual_prefix(),
            "overlay mounted"
        );

        let invalidator = Arc::new(FuseInvalidator::new(notifier, inodes));
        let watcher = ChangeWatcher::new(config, invalidator, executor).start()?;

        Ok(Self {
            session,
            watcher,
            mountpoint: mountpoint.to_path_buf(),
        })
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Stop the watcher, then unmount.
    pub async fn unmount(self) {
        let Self {
            session,
            watcher,
            mountpoint,
        } = self;

        watcher.stop().await;

        // Dropping the session unmounts and joins the session thread.
        if let Err(e) = tokio::task::spawn_blocking(move || drop(session)).await {
            warn!(error = %e, "unmount task failed");
        }
        info!(mountpoint = %mountpoint.display(), "overlay unmounted");
    }
}
