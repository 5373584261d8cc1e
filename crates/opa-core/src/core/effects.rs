use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use fs4::FileExt;

pub trait FileSystem: Send + Sync {
    /// True when something exists at `path`; symlinks are not followed.
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    /// True for real directories only; a symlink to a directory is not one.
    fn is_dir(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn copy(&self, src: &Path, dest: &Path) -> Result<()>;
    fn rename(&self, src: &Path, dest: &Path) -> Result<()>;
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir(&self, path: &Path) -> Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;
    fn set_executable(&self, path: &Path) -> Result<()> {
        self.set_mode(path, 0o755)
    }
    /// Blocks until an exclusive advisory lock on `path` is held.
    fn lock_exclusive(&self, path: &Path) -> Result<FileLock>;
}

pub trait EnvironmentResolver: Send + Sync {
    /// Non-empty value of an environment variable.
    fn var(&self, key: &str) -> Option<String>;
    fn home_dir(&self) -> Option<PathBuf>;
}

pub trait ProcessLauncher: Send + Sync {
    /// Runs `program` with inherited stdio and returns its exit code.
    fn run_passthrough(&self, program: &Path, args: &[String], cwd: &Path) -> Result<i32>;
}

pub trait Effects: Send + Sync {
    fn fs(&self) -> &dyn FileSystem;
    fn env(&self) -> &dyn EnvironmentResolver;
    fn launcher(&self) -> &dyn ProcessLauncher;
}

/// Advisory lock guard; released on drop.
#[derive(Debug)]
pub struct FileLock {
    _file: Option<File>,
}

impl FileLock {
    pub(crate) fn held(file: File) -> Self {
        Self { _file: Some(file) }
    }

    /// A guard that holds nothing, for filesystems without locking.
    #[must_use]
    pub fn unlocked() -> Self {
        Self { _file: None }
    }
}

pub struct SystemEffects {
    fs: Arc<SystemFileSystem>,
    env: Arc<SystemEnvironment>,
    launcher: Arc<SystemLauncher>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fs: Arc::new(SystemFileSystem),
            env: Arc::new(SystemEnvironment::capture()),
            launcher: Arc::new(SystemLauncher),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    fn env(&self) -> &dyn EnvironmentResolver {
        self.env.as_ref()
    }

    fn launcher(&self) -> &dyn ProcessLauncher {
        self.launcher.as_ref()
    }
}

pub(crate) struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading {}", path.display()))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating {}", path.display()))
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<()> {
        fs::copy(src, dest)
            .map(|_| ())
            .with_context(|| format!("copying {} to {}", src.display(), dest.display()))
    }

    fn rename(&self, src: &Path, dest: &Path) -> Result<()> {
        fs::rename(src, dest)
            .with_context(|| format!("renaming {} to {}", src.display(), dest.display()))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {}", path.display()))? {
            let entry = entry.with_context(|| format!("reading dir {}", path.display()))?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {}", path.display()))
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        fs::remove_dir(path).with_context(|| format!("removing dir {}", path.display()))
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("setting permissions on {}", path.display()))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, _path: &Path, _mode: u32) -> Result<()> {
        Ok(())
    }

    fn lock_exclusive(&self, path: &Path) -> Result<FileLock> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        FileExt::lock_exclusive(&file).with_context(|| format!("failed to lock {}", path.display()))?;
        Ok(FileLock::held(file))
    }
}

pub(crate) struct SystemEnvironment {
    vars: HashMap<String, String>,
}

impl SystemEnvironment {
    pub(crate) fn capture() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }
}

impl EnvironmentResolver for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.var("HOME")
            .map(PathBuf::from)
            .or_else(dirs_next::home_dir)
    }
}

struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn run_passthrough(&self, program: &Path, args: &[String], cwd: &Path) -> Result<i32> {
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to start {}", program.display()))?;
        Ok(status.code().unwrap_or(-1))
    }
}

pub type SharedEffects = Arc<dyn Effects>;
