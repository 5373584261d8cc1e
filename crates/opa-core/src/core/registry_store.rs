//! Durable registry of installed applications.

use std::path::{Path, PathBuf};

use opa_domain::{InstalledAppEntry, Registry, RemoveOutcome, UpsertOutcome};
use tracing::{debug, info};

use crate::core::apps::AppsLayout;
use crate::core::effects::{FileLock, FileSystem};
use crate::core::tooling::failure::OpaError;

/// Load-mutate-save access to `installed_apps.xml`. Every mutation holds
/// the registry lock and replaces the document with a rename.
pub(crate) struct RegistryStore<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
    path: PathBuf,
    tmp_path: PathBuf,
    lock_path: PathBuf,
}

impl<'a> RegistryStore<'a> {
    pub(crate) fn new(fs: &'a dyn FileSystem, layout: &AppsLayout) -> Self {
        Self {
            fs,
            root: layout.root().to_path_buf(),
            path: layout.registry_path(),
            tmp_path: layout.registry_tmp_path(),
            lock_path: layout.registry_lock_path(),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the registry; a missing document is an empty registry.
    pub(crate) fn load(&self) -> Result<Registry, OpaError> {
        if !self.fs.exists(&self.path) {
            return Ok(Registry::new());
        }
        let contents = self
            .fs
            .read_to_string(&self.path)
            .map_err(|source| self.io_error(source))?;
        Registry::decode(&contents).map_err(|err| self.io_error(err.into()))
    }

    pub(crate) fn save(&self, registry: &Registry) -> Result<(), OpaError> {
        let contents = registry
            .encode()
            .map_err(|err| self.io_error(err.into()))?;
        self.fs
            .create_dir_all(&self.root)
            .map_err(|source| self.io_error(source))?;
        self.fs
            .write(&self.tmp_path, contents.as_bytes())
            .map_err(|source| self.io_error(source))?;
        if let Err(source) = self.fs.rename(&self.tmp_path, &self.path) {
            let _ = self.fs.remove_file(&self.tmp_path);
            return Err(self.io_error(source));
        }
        debug!(registry = %self.path.display(), entries = registry.len(), "registry saved");
        Ok(())
    }

    pub(crate) fn upsert(
        &self,
        appid: &str,
        appname: &str,
        appversion: &str,
    ) -> Result<UpsertOutcome, OpaError> {
        let _lock = self.lock()?;
        let mut registry = self.load()?;
        let outcome = registry.upsert(appid, appname, appversion);
        self.save(&registry)?;
        match &outcome {
            UpsertOutcome::Inserted => info!(%appid, %appversion, "registry entry added"),
            UpsertOutcome::Updated { previous_version } => {
                info!(%appid, %previous_version, %appversion, "registry entry updated");
            }
        }
        Ok(outcome)
    }

    /// Removes `appid`; when it is not registered nothing is written.
    pub(crate) fn remove(&self, appid: &str) -> Result<RemoveOutcome, OpaError> {
        if !self.fs.exists(&self.path) {
            return Ok(RemoveOutcome::NotFound);
        }
        let _lock = self.lock()?;
        let mut registry = self.load()?;
        let outcome = registry.remove(appid);
        if matches!(outcome, RemoveOutcome::Removed(_)) {
            self.save(&registry)?;
            info!(%appid, "registry entry removed");
        }
        Ok(outcome)
    }

    pub(crate) fn entries(&self) -> Result<Vec<InstalledAppEntry>, OpaError> {
        Ok(self.load()?.entries().to_vec())
    }

    fn lock(&self) -> Result<FileLock, OpaError> {
        self.fs
            .create_dir_all(&self.root)
            .map_err(|source| self.io_error(source))?;
        self.fs
            .lock_exclusive(&self.lock_path)
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: anyhow::Error) -> OpaError {
        OpaError::RegistryIo {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::effects::SystemFileSystem;
    use crate::core::test_support::{Fault, FaultyFileSystem};
    use std::fs;

    fn layout(temp: &tempfile::TempDir) -> AppsLayout {
        AppsLayout::new(temp.path().join("Applications"))
    }

    #[test]
    fn missing_document_loads_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = RegistryStore::new(&SystemFileSystem, &layout(&temp));
        assert!(store.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn upsert_twice_keeps_original_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = RegistryStore::new(&SystemFileSystem, &layout(&temp));
        assert_eq!(store.upsert("demo", "Demo", "1.0")?, UpsertOutcome::Inserted);
        assert_eq!(
            store.upsert("demo", "Renamed", "1.1")?,
            UpsertOutcome::Updated {
                previous_version: "1.0".into()
            }
        );
        let entries = store.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].appname, "Demo");
        assert_eq!(entries[0].appversion, "1.1");
        Ok(())
    }

    #[test]
    fn save_then_load_round_trips() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = RegistryStore::new(&SystemFileSystem, &layout(&temp));
        let names = [
            "",
            "  padded  ",
            "B & Co",
            "A <alpha>",
            "multi\nline",
            "quote \" and '",
            "Ünïcode 名前",
        ];
        let mut registry = Registry::new();
        for (index, name) in names.iter().enumerate() {
            registry.upsert(&format!("app.{index}"), name, &format!(" {index}.0"));
            store.save(&registry)?;
            assert_eq!(store.load()?, registry, "name {name:?}");
        }
        assert_eq!(store.load()?.len(), names.len());
        assert!(!layout(&temp).registry_tmp_path().exists());
        Ok(())
    }

    #[test]
    fn remove_missing_leaves_document_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout(&temp);
        let store = RegistryStore::new(&SystemFileSystem, &layout);
        store.upsert("demo", "Demo", "1.0")?;
        let before = fs::read(layout.registry_path())?;
        assert_eq!(store.remove("other")?, RemoveOutcome::NotFound);
        assert_eq!(fs::read(layout.registry_path())?, before);
        Ok(())
    }

    #[test]
    fn remove_without_document_creates_nothing() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout(&temp);
        let store = RegistryStore::new(&SystemFileSystem, &layout);
        assert_eq!(store.remove("demo")?, RemoveOutcome::NotFound);
        assert!(!layout.root().exists());
        Ok(())
    }

    #[test]
    fn remove_existing_entry() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = RegistryStore::new(&SystemFileSystem, &layout(&temp));
        store.upsert("demo", "Demo", "1.0")?;
        store.upsert("other", "Other", "3.0")?;
        let removed = store.remove("demo")?;
        assert!(matches!(removed, RemoveOutcome::Removed(entry) if entry.appid == "demo"));
        let ids: Vec<String> = store.entries()?.into_iter().map(|e| e.appid).collect();
        assert_eq!(ids, vec!["other".to_string()]);
        Ok(())
    }

    #[test]
    fn failed_rename_keeps_previous_document() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout(&temp);
        RegistryStore::new(&SystemFileSystem, &layout).upsert("demo", "Demo", "1.0")?;
        let before = fs::read(layout.registry_path())?;

        let faulty = FaultyFileSystem::new(vec![Fault::Rename("installed_apps.xml")]);
        let err = RegistryStore::new(&faulty, &layout)
            .upsert("next", "Next", "2.0")
            .expect_err("rename fails");
        assert!(matches!(err, OpaError::RegistryIo { .. }));
        assert_eq!(fs::read(layout.registry_path())?, before);
        assert!(!layout.registry_tmp_path().exists());
        Ok(())
    }

    #[test]
    fn corrupt_document_is_registry_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let layout = layout(&temp);
        fs::create_dir_all(layout.root())?;
        fs::write(layout.registry_path(), "<Applications><Application>")?;
        let err = RegistryStore::new(&SystemFileSystem, &layout)
            .load()
            .expect_err("corrupt");
        assert!(matches!(err, OpaError::RegistryIo { .. }));
        Ok(())
    }
}
