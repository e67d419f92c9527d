//! Server configuration constants.

use std::time::Duration;

/// Settings file at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".bazelpath.toml";

/// Files marking the root of a Bazel workspace; any one is enough.
pub const WORKSPACE_MARKERS: &[&str] = &["WORKSPACE", "WORKSPACE.bazel", "MODULE.bazel"];

/// Kernel attribute and entry cache timeout.
pub const ATTR_TTL: Duration = Duration::from_secs(1);

/// Delay between mounting and the build-on-mount / IDE launch.
pub const BOOTSTRAP_DELAY: Duration = Duration::from_secs(1);

/// FUSE file system name shown in the mount table.
pub const FS_NAME: &str = "bazelpath";

/// Commented settings file written on first run.
pub const DEFAULT_CONFIG: &str = r#"# bazelpath settings. Customize, then run bazelpath again.

# GOPATH exposed to the toolchain; the overlay is mounted at <go_path>/src.
go_path = ""

# Import path prefix of first-party packages.
go_pkg_prefix = "test.com"

# IDE launched with the overlay's GOPATH once mounted (empty: none).
go_ide_cmd = ""

# Third-party roots, highest precedence first.
vendor_dirs = [
    "third-party-go/vendor",
]

# Directories exposed 1:1 at the mount root.
fall_through_dirs = []

# Regular expressions hiding top-level directories from the listing.
ignore_dirs = [
    "bazel-.*",
    "third-party.*",
]

# Used by --build.
[build]
rules = []
ignore_dirs = [
    "bazel-.*",
    "third-party.*",
]
"#;
