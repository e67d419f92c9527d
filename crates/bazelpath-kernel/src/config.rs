//! Namespace configuration.
//!
//! A [`NamespaceConfig`] is built once at mount time and then shared
//! read-only (`Arc<NamespaceConfig>`) by the resolver, the protocol adapter
//! and the change watcher. Nothing mutates it afterwards.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use thiserror::Error;

/// Workspace-relative directory holding build-system generated sources.
///
/// Every real root is shadowed by the same relative subtree under this
/// directory, at lower precedence.
pub const GENERATED_MIRROR: &str = "bazel-genfiles";

/// Version-control metadata directory never dispatched by the watcher.
pub const VCS_METADATA_DIR: &str = ".git";

/// Error building a [`NamespaceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("virtual prefix must not be empty")]
    EmptyPrefix,

    #[error("virtual prefix must be a single path segment: {0}")]
    InvalidPrefix(String),

    #[error("workspace root must be absolute: {0}")]
    RelativeWorkspace(PathBuf),

    #[error("root must be a plain relative path: {0}")]
    InvalidRoot(PathBuf),

    #[error("root configured more than once: {0}")]
    DuplicateRoot(PathBuf),

    #[error("invalid ignore pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Immutable description of the virtual namespace.
#[derive(Debug, Clone)]
pub struct NamespaceConfig {
    virtual_prefix: String,
    workspace_root: PathBuf,
    vendor_roots: Vec<PathBuf>,
    pass_through_roots: Vec<PathBuf>,
    ignore_patterns: Vec<Regex>,
}

impl NamespaceConfig {
    /// Start building a configuration for `workspace_root` exposed under
    /// `virtual_prefix`.
    pub fn builder(
        virtual_prefix: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
    ) -> NamespaceConfigBuilder {
        NamespaceConfigBuilder {
            virtual_prefix: virtual_prefix.into(),
            workspace_root: workspace_root.into(),
            vendor_roots: Vec::new(),
            pass_through_roots: Vec::new(),
            ignore_patterns: Vec::new(),
        }
    }

    pub fn virtual_prefix(&self) -> &str {
        &self.virtual_prefix
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Vendor roots, relative to the workspace, in precedence order.
    pub fn vendor_roots(&self) -> &[PathBuf] {
        &self.vendor_roots
    }

    /// Pass-through roots, relative to the workspace.
    pub fn pass_through_roots(&self) -> &[PathBuf] {
        &self.pass_through_roots
    }

    /// Absolute path of the generated mirror for this workspace.
    pub fn generated_mirror(&self) -> PathBuf {
        self.workspace_root.join(GENERATED_MIRROR)
    }

    /// Whether a single entry name is hidden or matches an ignore pattern.
    pub fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignore_patterns.iter().any(|re| re.is_match(name))
    }

    /// Whether a workspace-relative path should never reach the watcher
    /// dispatch: any hidden component, or an ignore pattern matching the
    /// whole relative path.
    pub fn is_ignored_path(&self, rel: &Path) -> bool {
        let hidden = rel.components().any(|c| match c {
            Component::Normal(name) => name.to_string_lossy().starts_with('.'),
            _ => false,
        });
        if hidden {
            return true;
        }
        let text = rel.to_string_lossy();
        self.ignore_patterns.iter().any(|re| re.is_match(&text))
    }

    /// Whether `rel` lies inside version-control metadata.
    pub fn is_vcs_metadata(rel: &Path) -> bool {
        rel.components()
            .any(|c| c.as_os_str() == VCS_METADATA_DIR)
    }

    /// Whether a workspace top-level name is (or leads to) a vendor root.
    ///
    /// `third-party-go` is a vendor directory when `third-party-go/vendor`
    /// is configured, so it is hidden from the first-party listing.
    pub fn is_vendor_dir(&self, name: &str) -> bool {
        let name = Path::new(name);
        self.vendor_roots.iter().any(|v| v.starts_with(name))
    }

    /// Find the vendor root containing a workspace-relative path.
    ///
    /// Returns the vendor index and the vendor-relative remainder. The
    /// remainder is empty when `rel` is the vendor root itself.
    pub fn vendor_root_of<'a>(&self, rel: &'a Path) -> Option<(usize, &'a Path)> {
        self.vendor_roots
            .iter()
            .enumerate()
            .find_map(|(index, vendor)| rel.strip_prefix(vendor).ok().map(|rest| (index, rest)))
    }

    /// Find the pass-through root matching a virtual path, by whole
    /// components.
    pub fn pass_through_root_of(&self, path: &Path) -> Option<&Path> {
        self.pass_through_roots
            .iter()
            .find(|root| path.starts_with(root))
            .map(PathBuf::as_path)
    }

    /// Whether a non-empty virtual path is a proper ancestor of some
    /// pass-through root (`tools` for `tools/gopls`).
    pub fn leads_to_pass_through(&self, path: &Path) -> bool {
        !path.as_os_str().is_empty()
            && self
                .pass_through_roots
                .iter()
                .any(|root| root != path && root.starts_with(path))
    }
}

/// Builder validating the invariants of [`NamespaceConfig`].
#[derive(Debug, Clone)]
pub struct NamespaceConfigBuilder {
    virtual_prefix: String,
    workspace_root: PathBuf,
    vendor_roots: Vec<PathBuf>,
    pass_through_roots: Vec<PathBuf>,
    ignore_patterns: Vec<String>,
}

impl NamespaceConfigBuilder {
    /// Append a vendor root. Order is precedence order.
    pub fn vendor_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.vendor_roots.push(root.into());
        self
    }

    pub fn vendor_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.vendor_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    pub fn pass_through_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.pass_through_roots.push(root.into());
        self
    }

    pub fn pass_through_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.pass_through_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Add an ignore pattern (regular expression, unanchored).
    pub fn ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_patterns.push(pattern.into());
        self
    }

    pub fn ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<NamespaceConfig, ConfigError> {
        let prefix = self.virtual_prefix;
        if prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if prefix.contains('/') || prefix == "." || prefix == ".." {
            return Err(ConfigError::InvalidPrefix(prefix));
        }

        if !self.workspace_root.is_absolute() {
            return Err(ConfigError::RelativeWorkspace(self.workspace_root));
        }

        let mut seen = HashSet::new();
        for root in self.vendor_roots.iter().chain(&self.pass_through_roots) {
            if !is_plain_relative(root) {
                return Err(ConfigError::InvalidRoot(root.clone()));
            }
            if !seen.insert(root.clone()) {
                return Err(ConfigError::DuplicateRoot(root.clone()));
            }
        }

        let ignore_patterns = self
            .ignore_patterns
            .into_iter()
            .map(|pattern| {
                Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern { pattern, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NamespaceConfig {
            virtual_prefix: prefix,
            workspace_root: self.workspace_root,
            vendor_roots: self.vendor_roots,
            pass_through_roots: self.pass_through_roots,
            ignore_patterns,
        })
    }
}

/// Non-empty and made only of normal components (no `/`, `.`, `..`).
fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NamespaceConfig {
        NamespaceConfig::builder("test.com", "/ws")
            .vendor_roots(["third-party-go/vendor", "v2"])
            .pass_through_root(".vscode")
            .ignore_patterns(["bazel-.*", "^node_modules$"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_accepts_valid_config() {
        let cfg = config();
        assert_eq!(cfg.virtual_prefix(), "test.com");
        assert_eq!(cfg.workspace_root(), Path::new("/ws"));
        assert_eq!(cfg.vendor_roots().len(), 2);
        assert_eq!(cfg.generated_mirror(), PathBuf::from("/ws/bazel-genfiles"));
    }

    #[test]
    fn test_prefix_validation() {
        assert!(matches!(
            NamespaceConfig::builder("", "/ws").build(),
            Err(ConfigError::EmptyPrefix)
        ));
        assert!(matches!(
            NamespaceConfig::builder("/test.com", "/ws").build(),
            Err(ConfigError::InvalidPrefix(_))
        ));
        assert!(matches!(
            NamespaceConfig::builder("github.com/org", "/ws").build(),
            Err(ConfigError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_workspace_must_be_absolute() {
        assert!(matches!(
            NamespaceConfig::builder("test.com", "ws").build(),
            Err(ConfigError::RelativeWorkspace(_))
        ));
    }

    #[test]
    fn test_roots_must_be_plain_and_distinct() {
        let escaping = NamespaceConfig::builder("test.com", "/ws")
            .vendor_root("../outside")
            .build();
        assert!(matches!(escaping, Err(ConfigError::InvalidRoot(_))));

        let absolute = NamespaceConfig::builder("test.com", "/ws")
            .pass_through_root("/etc")
            .build();
        assert!(matches!(absolute, Err(ConfigError::InvalidRoot(_))));

        let duplicate = NamespaceConfig::builder("test.com", "/ws")
            .vendor_root("vendor")
            .pass_through_root("vendor")
            .build();
        assert!(matches!(duplicate, Err(ConfigError::DuplicateRoot(_))));
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let result = NamespaceConfig::builder("test.com", "/ws")
            .ignore_pattern("bazel-(")
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_is_ignored() {
        let cfg = config();
        assert!(cfg.is_ignored(".git"));
        assert!(cfg.is_ignored("bazel-out"));
        assert!(cfg.is_ignored("node_modules"));
        assert!(!cfg.is_ignored("my_node_modules"));
        assert!(!cfg.is_ignored("proj"));
    }

    #[test]
    fn test_is_ignored_path() {
        let cfg = config();
        assert!(cfg.is_ignored_path(Path::new("proj/.cache/x.go")));
        assert!(cfg.is_ignored_path(Path::new("bazel-out/k8/bin/x.go")));
        assert!(!cfg.is_ignored_path(Path::new("proj/pkg/x.go")));
    }

    #[test]
    fn test_vcs_metadata() {
        assert!(NamespaceConfig::is_vcs_metadata(Path::new(".git/index")));
        assert!(NamespaceConfig::is_vcs_metadata(Path::new("proj/.git")));
        assert!(!NamespaceConfig::is_vcs_metadata(Path::new("proj/gitx/a.go")));
    }

    #[test]
    fn test_vendor_dir_detection() {
        let cfg = config();
        assert!(cfg.is_vendor_dir("third-party-go"));
        assert!(cfg.is_vendor_dir("v2"));
        assert!(!cfg.is_vendor_dir("third-party"));
        assert!(!cfg.is_vendor_dir("proj"));
    }

    #[test]
    fn test_vendor_root_of() {
        let cfg = config();
        let (index, rest) = cfg
            .vendor_root_of(Path::new("third-party-go/vendor/golang.org/x/net/a.go"))
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(rest, Path::new("golang.org/x/net/a.go"));

        let (index, rest) = cfg.vendor_root_of(Path::new("v2/pkg")).unwrap();
        assert_eq!(index, 1);
        assert_eq!(rest, Path::new("pkg"));

        assert!(cfg.vendor_root_of(Path::new("v22/pkg")).is_none());
    }

    #[test]
    fn test_pass_through_matches_whole_components() {
        let cfg = config();
        assert!(cfg.pass_through_root_of(Path::new(".vscode")).is_some());
        assert!(cfg.pass_through_root_of(Path::new(".vscode/settings.json")).is_some());
        assert!(cfg.pass_through_root_of(Path::new(".vscodex")).is_none());
    }

    #[test]
    fn test_leads_to_pass_through() {
        let cfg = NamespaceConfig::builder("test.com", "/ws")
            .pass_through_root("tools/gopls")
            .build()
            .unwrap();
        assert!(cfg.leads_to_pass_through(Path::new("tools")));
        assert!(!cfg.leads_to_pass_through(Path::new("tools/gopls")));
        assert!(!cfg.leads_to_pass_through(Path::new("tool")));
        assert!(!cfg.leads_to_pass_through(Path::new("")));
    }
}
