use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::core::config::{APPS_DIR_ENV, OS_VERSION_ENV};
use crate::core::effects::{
    EnvironmentResolver, Effects, FileLock, FileSystem, ProcessLauncher, SharedEffects,
    SystemFileSystem,
};

pub(crate) struct StaticEnvironment {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl StaticEnvironment {
    pub(crate) fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            home: None,
        }
    }

    pub(crate) fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }
}

impl EnvironmentResolver for StaticEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }
}

/// Operations that [`FaultyFileSystem`] fails when the target path ends
/// with the given suffix.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    Copy(&'static str),
    Write(&'static str),
    Rename(&'static str),
    RemoveFile(&'static str),
}

pub(crate) struct FaultyFileSystem {
    inner: SystemFileSystem,
    faults: Vec<Fault>,
}

impl FaultyFileSystem {
    pub(crate) fn new(faults: Vec<Fault>) -> Self {
        Self {
            inner: SystemFileSystem,
            faults,
        }
    }

    fn check(&self, path: &Path, matches: impl Fn(Fault) -> Option<&'static str>) -> Result<()> {
        for fault in &self.faults {
            if let Some(suffix) = matches(*fault) {
                if path.ends_with(suffix) {
                    bail!("injected failure for {}", path.display());
                }
            }
        }
        Ok(())
    }
}

impl FileSystem for FaultyFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.inner.is_file(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.inner.read(path)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.inner.read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check(path, |fault| match fault {
            Fault::Write(suffix) => Some(suffix),
            _ => None,
        })?;
        self.inner.write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.create_dir_all(path)
    }

    fn copy(&self, src: &Path, dest: &Path) -> Result<()> {
        self.check(dest, |fault| match fault {
            Fault::Copy(suffix) => Some(suffix),
            _ => None,
        })?;
        self.inner.copy(src, dest)
    }

    fn rename(&self, src: &Path, dest: &Path) -> Result<()> {
        self.check(dest, |fault| match fault {
            Fault::Rename(suffix) => Some(suffix),
            _ => None,
        })?;
        self.inner.rename(src, dest)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.inner.read_dir(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check(path, |fault| match fault {
            Fault::RemoveFile(suffix) => Some(suffix),
            _ => None,
        })?;
        self.inner.remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        self.inner.remove_dir(path)
    }

    fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        self.inner.set_mode(path, mode)
    }

    fn lock_exclusive(&self, path: &Path) -> Result<FileLock> {
        self.inner.lock_exclusive(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchCall {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
}

#[derive(Default)]
pub(crate) struct RecordingLauncher {
    calls: Mutex<Vec<LaunchCall>>,
    exit_code: i32,
}

impl RecordingLauncher {
    pub(crate) fn calls(&self) -> Vec<LaunchCall> {
        self.calls.lock().expect("launcher lock").clone()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn run_passthrough(&self, program: &Path, args: &[String], cwd: &Path) -> Result<i32> {
        self.calls.lock().expect("launcher lock").push(LaunchCall {
            program: program.to_path_buf(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
        });
        Ok(self.exit_code)
    }
}

pub(crate) struct TestEffects {
    fs: FaultyFileSystem,
    env: StaticEnvironment,
    launcher: RecordingLauncher,
}

impl TestEffects {
    /// Effects rooted at `apps_dir` with the default OS version.
    pub(crate) fn new(apps_dir: &Path) -> Self {
        let apps = apps_dir.display().to_string();
        Self {
            fs: FaultyFileSystem::new(Vec::new()),
            env: StaticEnvironment::new(&[(APPS_DIR_ENV, apps.as_str())]),
            launcher: RecordingLauncher::default(),
        }
    }

    pub(crate) fn with_os_version(mut self, version: &str) -> Self {
        self.env
            .vars
            .insert(OS_VERSION_ENV.to_string(), version.to_string());
        self
    }

    pub(crate) fn with_faults(mut self, faults: Vec<Fault>) -> Self {
        self.fs = FaultyFileSystem::new(faults);
        self
    }

    pub(crate) fn with_exit_code(mut self, code: i32) -> Self {
        self.launcher.exit_code = code;
        self
    }

    pub(crate) fn launcher_calls(&self) -> Vec<LaunchCall> {
        self.launcher.calls()
    }

    pub(crate) fn shared(self) -> (Arc<Self>, SharedEffects) {
        let effects = Arc::new(self);
        let shared: SharedEffects = effects.clone();
        (effects, shared)
    }
}

impl Effects for TestEffects {
    fn fs(&self) -> &dyn FileSystem {
        &self.fs
    }

    fn env(&self) -> &dyn EnvironmentResolver {
        &self.env
    }

    fn launcher(&self) -> &dyn ProcessLauncher {
        &self.launcher
    }
}

pub(crate) const BINARY_SCRIPT: &[u8] = b"#!/bin/sh\necho hello\n";
pub(crate) const ICON_BYTES: &[u8] = b"\x89PNG fake icon";

#[derive(Default)]
pub(crate) struct PackageBuilder {
    entries: Vec<(String, Vec<u8>, u32)>,
}

impl PackageBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn file(mut self, name: &str, contents: &[u8]) -> Self {
        self.entries
            .push((name.to_string(), contents.to_vec(), 0o644));
        self
    }

    pub(crate) fn manifest(self, xml: &str) -> Self {
        self.file("Manifest.xml", xml.as_bytes())
    }

    pub(crate) fn binary(mut self, platform: &str) -> Self {
        let mut contents = BINARY_SCRIPT.to_vec();
        contents.extend_from_slice(format!("# {platform}\n").as_bytes());
        self.entries
            .push((format!("bin/{platform}/main"), contents, 0o755));
        self
    }

    pub(crate) fn icon(self) -> Self {
        self.file("res/AppIcon.png", ICON_BYTES)
    }

    pub(crate) fn write_to(&self, path: &Path) -> Result<PathBuf> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents, mode) in &self.entries {
            writer.start_file(name.as_str(), FileOptions::default().unix_permissions(*mode))?;
            writer.write_all(contents)?;
        }
        let bytes = writer.finish()?.into_inner();
        std::fs::write(path, bytes)?;
        Ok(path.to_path_buf())
    }
}

pub(crate) fn manifest_xml(
    appid: &str,
    appname: &str,
    appversion: &str,
    minversion: &str,
    platforms: &[&str],
) -> String {
    let platforms: String = platforms
        .iter()
        .map(|platform| format!("    <platform>{platform}</platform>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Package>\n  <Application>\n    <appname>{appname}</appname>\n    <appid>{appid}</appid>\n    <appversion>{appversion}</appversion>\n    <appstatus>release</appstatus>\n    <minversion>{minversion}</minversion>\n  </Application>\n  <Build>\n{platforms}  </Build>\n  <Privacy>\n    <pressmission>network</pressmission>\n  </Privacy>\n</Package>\n"
    )
}
