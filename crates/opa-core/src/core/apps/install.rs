use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use opa_domain::{
    check_os_version, parse_manifest, select_architecture, staged_binary_path, ArchitectureId,
    ManifestError, PackageManifest, UpsertOutcome, ICON_PATH, INSTALLED_BINARY_PATH,
    MANIFEST_FILE_NAME,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::apps::AppsLayout;
use crate::core::effects::FileSystem;
use crate::core::registry_store::RegistryStore;
use crate::core::stager::Stager;
use crate::core::tooling::failure::{InstallFailure, InstallStage, OpaError};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct InstallRequest {
    pub archive: PathBuf,
}

/// Installs the package archive named by the request.
///
/// Pipeline failures are reported as outcomes carrying the failing stage;
/// partially copied files are left in place.
///
/// # Errors
/// Returns an error only for failures outside the install pipeline.
pub fn install_app(ctx: &CommandContext, request: &InstallRequest) -> Result<ExecutionOutcome> {
    let layout = ctx.layout();
    let installer = Installer::new(ctx.fs(), &layout, &ctx.config().platform().os_version);
    match installer.run(&request.archive) {
        Ok(report) => Ok(report.into_outcome()),
        Err(failure) => {
            debug!(stage = %failure.stage, error = %failure.error, "install aborted");
            Ok(failure.into_outcome())
        }
    }
}

#[derive(Debug)]
pub(crate) struct InstallReport {
    pub(crate) manifest: PackageManifest,
    pub(crate) architecture: ArchitectureId,
    pub(crate) install_dir: PathBuf,
    pub(crate) registry: UpsertOutcome,
}

impl InstallReport {
    fn into_outcome(self) -> ExecutionOutcome {
        let manifest = &self.manifest;
        let (registry, previous_version, message) = match &self.registry {
            UpsertOutcome::Inserted => (
                "inserted",
                None,
                format!(
                    "installed {} {} ({})",
                    manifest.appname, manifest.appversion, manifest.appid
                ),
            ),
            UpsertOutcome::Updated { previous_version } => (
                "updated",
                Some(previous_version.clone()),
                format!(
                    "updated {} from {} to {}",
                    manifest.appid, previous_version, manifest.appversion
                ),
            ),
        };
        ExecutionOutcome::success(
            message,
            json!({
                "appid": manifest.appid,
                "appname": manifest.appname,
                "appversion": manifest.appversion,
                "architecture": self.architecture.to_string(),
                "install_dir": self.install_dir.display().to_string(),
                "registry": registry,
                "previous_version": previous_version,
                "permissions": manifest.permissions.iter().collect::<Vec<_>>(),
            }),
        )
    }
}

/// Runs the install pipeline:
/// extract, validate manifest and OS version, select architecture, copy
/// artifacts, commit to the registry, clean scratch.
pub(crate) struct Installer<'a> {
    fs: &'a dyn FileSystem,
    stager: Stager<'a>,
    layout: &'a AppsLayout,
    os_version: &'a str,
}

impl<'a> Installer<'a> {
    pub(crate) fn new(fs: &'a dyn FileSystem, layout: &'a AppsLayout, os_version: &'a str) -> Self {
        Self {
            fs,
            stager: Stager::new(fs),
            layout,
            os_version,
        }
    }

    pub(crate) fn run(&self, archive: &Path) -> Result<InstallReport, InstallFailure> {
        let scratch = self.layout.scratch_dir(archive);

        self.extract(archive, &scratch)?;
        let manifest = self
            .validate(&scratch)
            .map_err(|err| self.scratch_failure(InstallStage::ManifestValidated, err, &scratch))?;
        let architecture = self
            .select(&manifest, &scratch)
            .map_err(|err| {
                self.scratch_failure(InstallStage::ArchitectureSelected, err, &scratch)
            })?;

        let install_dir = self.layout.app_dir(&manifest.appid).ok_or_else(|| {
            let err = OpaError::from(ManifestError::Malformed {
                path: scratch.join(MANIFEST_FILE_NAME),
                reason: format!("appid '{}' is not a directory name", manifest.appid),
            });
            self.scratch_failure(InstallStage::ManifestValidated, err, &scratch)
        })?;
        self.copy_artifacts(&scratch, &install_dir, &architecture)?;

        debug!(appid = %manifest.appid, "committing registry entry");
        let registry = RegistryStore::new(self.fs, self.layout)
            .upsert(&manifest.appid, &manifest.appname, &manifest.appversion)
            .map_err(|err| {
                InstallFailure::new(InstallStage::RegistryCommitted, err)
                    .leaving("install_dir", &install_dir)
                    .leaving("scratch_dir", &scratch)
            })?;

        self.stager.remove_required_tree(&scratch).map_err(|err| {
            InstallFailure::new(InstallStage::ScratchCleaned, err).leaving("scratch_dir", &scratch)
        })?;
        debug!(scratch = %scratch.display(), "scratch cleaned");

        info!(
            appid = %manifest.appid,
            version = %manifest.appversion,
            architecture = %architecture,
            "installed"
        );
        Ok(InstallReport {
            manifest,
            architecture,
            install_dir,
            registry,
        })
    }

    fn extract(&self, archive: &Path, scratch: &Path) -> Result<(), InstallFailure> {
        let fail = |err: OpaError| {
            let failure = InstallFailure::new(InstallStage::Extracted, err);
            if self.fs.exists(scratch) {
                failure.leaving("scratch_dir", scratch)
            } else {
                failure
            }
        };
        if self.fs.exists(scratch) {
            warn!(scratch = %scratch.display(), "removing stale scratch directory");
            self.stager.remove_tree(scratch).map_err(fail)?;
        }
        debug!(archive = %archive.display(), scratch = %scratch.display(), "extracting");
        let entries = self.stager.extract(archive, scratch).map_err(fail)?;
        debug!(entries, "extracted");
        Ok(())
    }

    fn validate(&self, scratch: &Path) -> Result<PackageManifest, OpaError> {
        let path = scratch.join(MANIFEST_FILE_NAME);
        if !self.fs.is_file(&path) {
            return Err(ManifestError::NotFound { path }.into());
        }
        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|err| OpaError::filesystem("read", &path, err))?;
        let manifest = parse_manifest(&contents, &path)?;
        if !check_os_version(self.os_version, &manifest.minversion) {
            return Err(OpaError::OsVersionTooLow {
                required: manifest.minversion.clone(),
                current: self.os_version.to_string(),
            });
        }
        debug!(appid = %manifest.appid, minversion = %manifest.minversion, "manifest validated");
        Ok(manifest)
    }

    fn select(&self, manifest: &PackageManifest, scratch: &Path) -> Result<ArchitectureId, OpaError> {
        let selected = select_architecture(manifest.platforms.iter().map(String::as_str), |platform| {
            self.fs.is_file(&scratch.join(staged_binary_path(platform)))
        });
        match selected {
            Some(architecture) => {
                debug!(%architecture, "architecture selected");
                Ok(architecture)
            }
            None => Err(OpaError::NoSuitableArchitecture {
                appid: manifest.appid.clone(),
                declared: manifest.platforms.iter().cloned().collect(),
            }),
        }
    }

    fn copy_artifacts(
        &self,
        scratch: &Path,
        install_dir: &Path,
        architecture: &ArchitectureId,
    ) -> Result<(), InstallFailure> {
        let artifacts = [
            (
                scratch.join(staged_binary_path(architecture.as_str())),
                install_dir.join(INSTALLED_BINARY_PATH),
            ),
            (scratch.join(ICON_PATH), install_dir.join(ICON_PATH)),
            (
                scratch.join(MANIFEST_FILE_NAME),
                install_dir.join(MANIFEST_FILE_NAME),
            ),
        ];
        if let Some((missing, _)) = artifacts.iter().find(|(src, _)| !self.fs.is_file(src)) {
            let err = OpaError::filesystem(
                "read",
                missing,
                anyhow!("{} is missing from the package", missing.display()),
            );
            return Err(self.scratch_failure(InstallStage::ArtifactsCopied, err, scratch));
        }

        let copied = artifacts.iter().try_for_each(|(src, dest)| self.stager.copy_artifact(src, dest));
        let marked = copied.and_then(|()| {
            let binary = install_dir.join(INSTALLED_BINARY_PATH);
            self.fs
                .set_executable(&binary)
                .map_err(|err| OpaError::filesystem("mark executable", binary, err))
        });
        marked.map_err(|err| {
            InstallFailure::new(InstallStage::ArtifactsCopied, err)
                .leaving("install_dir", install_dir)
                .leaving("scratch_dir", scratch)
        })?;
        debug!(install_dir = %install_dir.display(), "artifacts copied");
        Ok(())
    }

    fn scratch_failure(&self, stage: InstallStage, err: OpaError, scratch: &Path) -> InstallFailure {
        let failure = InstallFailure::new(stage, err);
        if self.fs.exists(scratch) {
            failure.leaving("scratch_dir", scratch)
        } else {
            failure
        }
    }
}
