//! Virtual path classification and candidate resolution.
//!
//! Pure functions of the [`NamespaceConfig`]: nothing here touches the
//! filesystem, so concurrent resolution needs no synchronization.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::NamespaceConfig;

/// The closed set of routing classes for a virtual path.
///
/// Rules are applied in order: root, the prefix itself, under the prefix,
/// pass-through, vendor. The first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass<'a> {
    /// The mount's top directory (empty virtual path).
    Root,
    /// Exactly the virtual prefix: the synthetic first-party directory.
    FirstPartyRoot,
    /// Under the virtual prefix; carries the workspace-relative remainder.
    FirstPartyChild(&'a Path),
    /// Inside a pass-through root, or on the way to one; carries the full
    /// virtual path.
    PassThrough(&'a Path),
    /// Anything else while vendor roots are configured; carries the
    /// vendor-relative path.
    Vendor(&'a Path),
    /// No rule applies. Never resolves.
    Unclassified,
}

impl PathClass<'_> {
    pub fn is_first_party(&self) -> bool {
        matches!(self, PathClass::FirstPartyRoot | PathClass::FirstPartyChild(_))
    }

    /// Root and the virtual prefix have no backing storage of their own.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, PathClass::Root | PathClass::FirstPartyRoot)
    }
}

/// Maps virtual paths to ordered real candidates.
#[derive(Debug, Clone)]
pub struct PathResolver {
    config: Arc<NamespaceConfig>,
}

impl PathResolver {
    pub fn new(config: Arc<NamespaceConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    /// Classify a virtual path. A leading `/` is tolerated; any `.` or `..`
    /// component makes the path unclassified.
    pub fn classify<'a>(&self, path: &'a Path) -> PathClass<'a> {
        let path = path.strip_prefix("/").unwrap_or(path);

        if !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return PathClass::Unclassified;
        }
        if path.as_os_str().is_empty() {
            return PathClass::Root;
        }

        if let Ok(rel) = path.strip_prefix(self.config.virtual_prefix()) {
            return if rel.as_os_str().is_empty() {
                PathClass::FirstPartyRoot
            } else {
                PathClass::FirstPartyChild(rel)
            };
        }

        if self.config.pass_through_root_of(path).is_some()
            || self.config.leads_to_pass_through(path)
        {
            return PathClass::PassThrough(path);
        }

        if self.config.vendor_roots().is_empty() {
            PathClass::Unclassified
        } else {
            PathClass::Vendor(path)
        }
    }

    /// Real candidates for a classified path, highest precedence first.
    pub fn candidates(&self, class: PathClass<'_>) -> Vec<PathBuf> {
        let ws = self.config.workspace_root();
        let mirror = self.config.generated_mirror();

        match class {
            PathClass::Root | PathClass::FirstPartyRoot => vec![ws.to_path_buf()],
            PathClass::FirstPartyChild(rel) => vec![ws.join(rel), mirror.join(rel)],
            PathClass::PassThrough(path) => vec![ws.join(path)],
            PathClass::Vendor(rel) => self
                .config
                .vendor_roots()
                .iter()
                .flat_map(|vendor| [ws.join(vendor).join(rel), mirror.join(vendor).join(rel)])
                .collect(),
            PathClass::Unclassified => Vec::new(),
        }
    }

    /// Candidates consulted by `open`.
    ///
    /// Identical to [`candidates`](Self::candidates) except that vendor
    /// paths never fall back to the generated mirror.
    pub fn open_candidates(&self, class: PathClass<'_>) -> Vec<PathBuf> {
        match class {
            PathClass::Vendor(rel) => self.vendor_candidates(rel).map(|(_, path)| path).collect(),
            other => self.candidates(other),
        }
    }

    /// Hand-written vendor locations of a vendor-relative path, tagged with
    /// the vendor index, in precedence order.
    pub fn vendor_candidates<'a>(
        &'a self,
        rel: &'a Path,
    ) -> impl Iterator<Item = (usize, PathBuf)> + 'a {
        let ws = self.config.workspace_root();
        self.config
            .vendor_roots()
            .iter()
            .enumerate()
            .map(move |(index, vendor)| (index, ws.join(vendor).join(rel)))
    }

    /// Classify and resolve in one step.
    pub fn resolve(&self, path: &Path) -> Vec<PathBuf> {
        self.candidates(self.classify(path))
    }
}
