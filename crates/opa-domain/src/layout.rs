//! Path conventions shared by package archives and install trees.

use std::path::{Component, Path, PathBuf};

/// Descriptor file at the archive root and inside every install tree.
pub const MANIFEST_FILE_NAME: &str = "Manifest.xml";

/// Application icon, relative to the archive root and the install tree.
pub const ICON_PATH: &str = "res/AppIcon.png";

/// Selected executable inside an install tree.
pub const INSTALLED_BINARY_PATH: &str = "bin/main";

/// Registry document kept directly under the apps directory.
pub const REGISTRY_FILE_NAME: &str = "installed_apps.xml";

/// Staging copy of the registry, renamed over [`REGISTRY_FILE_NAME`] on save.
pub const REGISTRY_TMP_FILE_NAME: &str = "installed_apps.xml.tmp";

/// Advisory lock file guarding registry updates.
pub const REGISTRY_LOCK_FILE_NAME: &str = "installed_apps.xml.lock";

/// Scratch root for archive extraction, directly under the apps directory.
pub const SCRATCH_DIR_NAME: &str = "tmp";

const RESERVED_NAMES: [&str; 4] = [
    REGISTRY_FILE_NAME,
    REGISTRY_TMP_FILE_NAME,
    REGISTRY_LOCK_FILE_NAME,
    SCRATCH_DIR_NAME,
];

/// Location of a platform's executable inside an extracted archive:
/// `bin/<platform>/main`.
pub fn staged_binary_path(platform: &str) -> PathBuf {
    Path::new("bin").join(platform).join("main")
}

/// Returns true when `raw` names exactly one ordinary path component, so it
/// can be joined onto a directory without escaping it.
pub fn is_single_component(raw: &str) -> bool {
    if raw.is_empty() || raw.contains('/') || raw.contains('\\') {
        return false;
    }
    let mut components = Path::new(raw).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Returns true when `raw` names one of the installer's own entries in the
/// apps directory. Compared case-insensitively since the apps directory may
/// live on a case-insensitive filesystem.
pub fn is_reserved_name(raw: &str) -> bool {
    RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(raw))
}

/// Returns true when `raw` can name an install tree under the apps directory.
pub fn is_app_dir_name(raw: &str) -> bool {
    is_single_component(raw) && !is_reserved_name(raw)
}
