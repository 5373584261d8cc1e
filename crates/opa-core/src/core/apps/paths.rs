use std::path::{Path, PathBuf};

use opa_domain::{
    is_app_dir_name, REGISTRY_FILE_NAME, REGISTRY_LOCK_FILE_NAME, REGISTRY_TMP_FILE_NAME,
    SCRATCH_DIR_NAME,
};

/// Locations under the apps directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppsLayout {
    root: PathBuf,
}

impl AppsLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE_NAME)
    }

    pub(crate) fn registry_tmp_path(&self) -> PathBuf {
        self.root.join(REGISTRY_TMP_FILE_NAME)
    }

    pub(crate) fn registry_lock_path(&self) -> PathBuf {
        self.root.join(REGISTRY_LOCK_FILE_NAME)
    }

    /// Install directory for `appid`, or `None` when the id is not a plain
    /// directory name or names one of the installer's own entries.
    pub fn app_dir(&self, appid: &str) -> Option<PathBuf> {
        is_app_dir_name(appid).then(|| self.root.join(appid))
    }

    pub(crate) fn scratch_root(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR_NAME)
    }

    /// Scratch directory for one archive, keyed by its file name.
    pub(crate) fn scratch_dir(&self, archive: &Path) -> PathBuf {
        let name = archive
            .file_name()
            .map_or_else(|| "package".into(), |name| name.to_string_lossy());
        self.scratch_root().join(name.as_ref())
    }
}
