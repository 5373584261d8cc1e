//! Archive extraction and install-tree file operations.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{anyhow, Context};
use tracing::debug;
use zip::ZipArchive;

use crate::core::effects::FileSystem;
use crate::core::tooling::failure::OpaError;

pub(crate) struct Stager<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> Stager<'a> {
    pub(crate) fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Unpacks `archive` under `dest`, preserving directory structure and
    /// unix modes. Entries that would escape `dest` are skipped.
    pub(crate) fn extract(&self, archive: &Path, dest: &Path) -> Result<usize, OpaError> {
        self.unpack(archive, dest)
            .map_err(|source| OpaError::Extraction {
                archive: archive.to_path_buf(),
                source,
            })
    }

    fn unpack(&self, archive: &Path, dest: &Path) -> anyhow::Result<usize> {
        let bytes = self.fs.read(archive)?;
        let mut zip = ZipArchive::new(Cursor::new(bytes))
            .with_context(|| format!("{} is not a readable zip archive", archive.display()))?;
        self.fs.create_dir_all(dest)?;
        let mut written = 0;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            let Some(enclosed) = entry.enclosed_name().map(|p| dest.join(p)) else {
                debug!(entry = entry.name(), "skipping entry outside of the archive root");
                continue;
            };
            if entry.name().ends_with('/') || entry.is_dir() {
                self.fs.create_dir_all(&enclosed)?;
                continue;
            }
            if let Some(parent) = enclosed.parent() {
                self.fs.create_dir_all(parent)?;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .with_context(|| format!("reading archive entry {}", entry.name()))?;
            self.fs.write(&enclosed, &contents)?;
            if let Some(mode) = entry.unix_mode() {
                self.fs.set_mode(&enclosed, mode & 0o7777)?;
            }
            written += 1;
        }
        Ok(written)
    }

    /// Copies one file, creating parents and overwriting any existing file.
    pub(crate) fn copy_artifact(&self, src: &Path, dest: &Path) -> Result<(), OpaError> {
        if let Some(parent) = dest.parent() {
            self.fs
                .create_dir_all(parent)
                .map_err(|err| OpaError::filesystem("create", parent, err))?;
        }
        if self.fs.is_file(dest) {
            self.fs
                .remove_file(dest)
                .map_err(|err| OpaError::filesystem("overwrite", dest, err))?;
        }
        self.fs
            .copy(src, dest)
            .map_err(|err| OpaError::filesystem("copy", dest, err))?;
        debug!(from = %src.display(), to = %dest.display(), "copied artifact");
        Ok(())
    }

    /// Deletes `path` and everything below it, deepest entries first.
    /// A missing path is a no-op; the return value says whether anything
    /// was removed.
    pub(crate) fn remove_tree(&self, path: &Path) -> Result<bool, OpaError> {
        if !self.fs.exists(path) {
            return Ok(false);
        }
        self.remove_entry(path)
            .map_err(|err| OpaError::filesystem("remove", path, err))?;
        Ok(true)
    }

    /// Like [`Stager::remove_tree`], but a missing path is an error.
    pub(crate) fn remove_required_tree(&self, path: &Path) -> Result<(), OpaError> {
        if self.remove_tree(path)? {
            Ok(())
        } else {
            Err(OpaError::filesystem(
                "remove",
                path,
                anyhow!("{} does not exist", path.display()),
            ))
        }
    }

    fn remove_entry(&self, path: &Path) -> anyhow::Result<()> {
        if self.fs.is_dir(path) {
            for child in self.fs.read_dir(path)? {
                self.remove_entry(&child)?;
            }
            self.fs.remove_dir(path)
        } else {
            self.fs.remove_file(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::effects::SystemFileSystem;
    use crate::core::test_support::{Fault, FaultyFileSystem, PackageBuilder};
    use std::fs;

    #[test]
    fn extract_preserves_layout_and_modes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = PackageBuilder::new()
            .file("Manifest.xml", b"<Package/>")
            .binary("x86-64")
            .icon()
            .write_to(&temp.path().join("demo.zip"))?;
        let dest = temp.path().join("scratch");
        let written = Stager::new(&SystemFileSystem).extract(&archive, &dest)?;
        assert_eq!(written, 3);
        assert!(dest.join("Manifest.xml").is_file());
        assert!(dest.join("res/AppIcon.png").is_file());
        let binary = dest.join("bin/x86-64/main");
        assert!(binary.is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&binary)?.permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
        Ok(())
    }

    #[test]
    fn extract_skips_escaping_entries() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = PackageBuilder::new()
            .file("../escape.txt", b"nope")
            .file("inside.txt", b"yes")
            .write_to(&temp.path().join("evil.zip"))?;
        let dest = temp.path().join("scratch");
        let written = Stager::new(&SystemFileSystem).extract(&archive, &dest)?;
        assert_eq!(written, 1);
        assert!(!temp.path().join("escape.txt").exists());
        assert!(dest.join("inside.txt").is_file());
        Ok(())
    }

    #[test]
    fn corrupt_archive_is_extraction_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"definitely not a zip")?;
        let err = Stager::new(&SystemFileSystem)
            .extract(&archive, &temp.path().join("scratch"))
            .expect_err("corrupt archive");
        assert!(matches!(err, OpaError::Extraction { .. }));
        Ok(())
    }

    #[test]
    fn write_failure_during_extract_is_extraction_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = PackageBuilder::new()
            .file("Manifest.xml", b"<Package/>")
            .write_to(&temp.path().join("demo.zip"))?;
        let fs = FaultyFileSystem::new(vec![Fault::Write("Manifest.xml")]);
        let err = Stager::new(&fs)
            .extract(&archive, &temp.path().join("scratch"))
            .expect_err("write fails");
        assert!(matches!(err, OpaError::Extraction { .. }));
        Ok(())
    }

    #[test]
    fn copy_artifact_creates_parents_and_overwrites() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let src = temp.path().join("new");
        fs::write(&src, b"new contents")?;
        let dest = temp.path().join("tree/bin/main");
        let stager = Stager::new(&SystemFileSystem);
        stager.copy_artifact(&src, &dest)?;
        assert_eq!(fs::read(&dest)?, b"new contents");

        fs::write(&src, b"second")?;
        stager.copy_artifact(&src, &dest)?;
        assert_eq!(fs::read(&dest)?, b"second");
        Ok(())
    }

    #[test]
    fn remove_tree_deletes_nested_entries() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let root = temp.path().join("app");
        fs::create_dir_all(root.join("bin/deep/er"))?;
        fs::write(root.join("bin/deep/er/file"), b"x")?;
        fs::write(root.join("Manifest.xml"), b"x")?;
        let stager = Stager::new(&SystemFileSystem);
        assert!(stager.remove_tree(&root)?);
        assert!(!root.exists());
        assert!(!stager.remove_tree(&root)?);
        Ok(())
    }

    #[test]
    fn remove_required_tree_fails_on_missing_path() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let err = Stager::new(&SystemFileSystem)
            .remove_required_tree(&temp.path().join("missing"))
            .expect_err("missing path");
        assert!(matches!(err, OpaError::Filesystem { action: "remove", .. }));
        Ok(())
    }
}
