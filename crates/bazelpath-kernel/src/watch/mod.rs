//! Change watcher and dispatcher.
//!
//! ```text
//!   inotify thread                dispatcher task               side effects (JoinSet)
//!   ──────────────                ───────────────               ──────────────────────
//!   close-write / moved-to  ──►   bounded channel  ──►  plan ─┬─► invalidate (blocking pool)
//!   blocking_send (backpressure)                              ├─► build <dir>:*
//!                                                             └─► install <import path>
//! ```
//!
//! Events are classified one at a time in arrival order. Each side effect
//! runs as its own task, so a failing build executor never holds up
//! invalidation or the next event.

mod dispatch;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::NamespaceConfig;
use crate::exec::BuildExecutor;

pub use dispatch::{plan, DispatchPlan};

/// Extension of interface-definition sources, which need a build before
/// the generated package can be installed.
pub const INTERFACE_DEFINITION_EXTENSION: &str = "proto";

/// Extension of the toolchain's own sources.
pub const SOURCE_EXTENSION: &str = "go";

/// Capacity of the event channel between the OS watcher and the
/// dispatcher. A full channel blocks the OS watcher thread.
pub const WATCH_CHANNEL_CAPACITY: usize = 64;

/// A change observed under the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Real absolute path.
    pub path: PathBuf,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A file opened for writing was closed.
    ClosedWrite,
    /// A file or directory was moved into the tree.
    MovedIn,
}

impl ChangeKind {
    /// The two notify event kinds the watcher reacts to.
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(Self::ClosedWrite),
            // Paired renames also produce `RenameMode::Both`; `To` alone
            // avoids dispatching them twice.
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::MovedIn),
            _ => None,
        }
    }
}

/// Kernel cache invalidation for the mounted filesystem.
///
/// Calls may block; the dispatcher runs them on the blocking pool.
pub trait Invalidator: Send + Sync {
    /// Drop the cached directory entry of a virtual path.
    fn invalidate_entry(&self, virtual_path: &Path) -> io::Result<()>;

    /// Drop the cached attributes and content of a virtual path.
    fn invalidate_file(&self, virtual_path: &Path) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("change watcher must be started inside a tokio runtime")]
    NoRuntime,
}

/// Watches the workspace and dispatches changes.
pub struct ChangeWatcher {
    config: Arc<NamespaceConfig>,
    invalidator: Arc<dyn Invalidator>,
    executor: Arc<dyn BuildExecutor>,
}

impl ChangeWatcher {
    pub fn new(
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

    /// Subscribe to recursive change notifications under the workspace root
    /// and start the dispatcher task.
    pub fn start(self) -> Result<WatcherHandle, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        // Err only once the dispatcher has stopped.
                        if tx.blocking_send(ChangeEvent { path, kind }).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            },
            notify::Config::default().with_follow_symlinks(false),
        )?;

        let root = self.config.workspace_root();
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(path = %root.display(), "change watcher started");

        Ok(self.spawn(&runtime, rx, Some(watcher)))
    }

    /// Start the dispatcher on an externally fed event channel, without an
    /// OS subscription.
    pub fn dispatch_from(
        self,
        events: mpsc::Receiver<ChangeEvent>,
    ) -> Result<WatcherHandle, WatchError> {
        let runtime = Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        Ok(self.spawn(&runtime, events, None))
    }

    fn spawn(
        self,
        runtime: &Handle,
        events: mpsc::Receiver<ChangeEvent>,
        watcher: Option<RecommendedWatcher>,
    ) -> WatcherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let dispatcher = dispatch::Dispatcher::new(self.config, self.invalidator, self.executor);
        let task = runtime.spawn(dispatcher.run(events, shutdown_rx));

        WatcherHandle {
            watcher,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a running change watcher.
pub struct WatcherHandle {
    /// The OS subscription (keep alive to continue watching).
    watcher: Option<RecommendedWatcher>,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching and wait for the dispatcher to finish.
    ///
    /// Once this returns no further event is dispatched: the subscription
    /// is dropped, queued events are discarded and in-flight side effects
    /// are cancelled.
    pub async fn stop(self) {
        let Self {
            watcher,
            shutdown_tx,
            task,
        } = self;

        drop(watcher);
        let _ = shutdown_tx.send(());

        if let Err(e) = task.await {
            warn!(error = %e, "change dispatcher task failed");
        }
    }
}
