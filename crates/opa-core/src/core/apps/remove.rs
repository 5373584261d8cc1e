use std::path::PathBuf;

use anyhow::Result;
use opa_domain::RemoveOutcome;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::core::apps::AppsLayout;
use crate::core::effects::FileSystem;
use crate::core::registry_store::RegistryStore;
use crate::core::stager::Stager;
use crate::core::tooling::failure::{FailureKind, OpaError, RemoveFailure, RemoveStage};
use crate::{CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct RemoveRequest {
    pub appid: String,
}

/// Removes an installed application's tree and registry entry.
///
/// An app without an install tree is reported as a warning and the
/// registry is left untouched.
///
/// # Errors
/// Returns an error only for failures outside the remove pipeline.
pub fn remove_app(ctx: &CommandContext, request: &RemoveRequest) -> Result<ExecutionOutcome> {
    let layout = ctx.layout();
    match Remover::new(ctx.fs(), &layout).run(&request.appid) {
        Ok(report) => Ok(report.into_outcome()),
        Err(failure) => {
            debug!(stage = %failure.stage, error = %failure.error, "remove aborted");
            Ok(failure.into_outcome())
        }
    }
}

#[derive(Debug)]
pub(crate) enum RemoveReport {
    NotInstalled {
        appid: String,
        install_dir: Option<PathBuf>,
    },
    Removed {
        appid: String,
        install_dir: PathBuf,
        registry: RemoveOutcome,
    },
}

impl RemoveReport {
    fn into_outcome(self) -> ExecutionOutcome {
        match self {
            RemoveReport::NotInstalled { appid, install_dir } => {
                let err = OpaError::AppNotFound {
                    appid: appid.clone(),
                };
                let kind = FailureKind::AppNotFound;
                ExecutionOutcome::warning(
                    format!("{appid} not found"),
                    json!({
                        "appid": appid,
                        "code": kind.code(),
                        "reason": kind.reason(),
                        "hint": err.hint(),
                        "install_dir": install_dir.map(|dir| dir.display().to_string()),
                        "registry": "untouched",
                    }),
                )
            }
            RemoveReport::Removed {
                appid,
                install_dir,
                registry,
            } => {
                let (registry, appversion) = match registry {
                    RemoveOutcome::Removed(entry) => ("removed", Some(entry.appversion)),
                    RemoveOutcome::NotFound => ("not-found", None),
                };
                ExecutionOutcome::success(
                    format!("removed {appid}"),
                    json!({
                        "appid": appid,
                        "appversion": appversion,
                        "install_dir": install_dir.display().to_string(),
                        "registry": registry,
                    }),
                )
            }
        }
    }
}

/// Runs the remove pipeline: find the tree, delete it, drop the registry
/// entry.
pub(crate) struct Remover<'a> {
    fs: &'a dyn FileSystem,
    layout: &'a AppsLayout,
}

impl<'a> Remover<'a> {
    pub(crate) fn new(fs: &'a dyn FileSystem, layout: &'a AppsLayout) -> Self {
        Self { fs, layout }
    }

    pub(crate) fn run(&self, appid: &str) -> Result<RemoveReport, RemoveFailure> {
        let install_dir = match self.layout.app_dir(appid) {
            Some(dir) if self.fs.exists(&dir) => dir,
            other => {
                info!(%appid, "not installed; registry left untouched");
                return Ok(RemoveReport::NotInstalled {
                    appid: appid.to_string(),
                    install_dir: other,
                });
            }
        };
        debug!(%appid, install_dir = %install_dir.display(), "found install tree");

        Stager::new(self.fs)
            .remove_tree(&install_dir)
            .map_err(|err| {
                RemoveFailure::new(RemoveStage::TreeDeleted, err)
                    .leaving("install_dir", &install_dir)
            })?;
        debug!(%appid, "install tree deleted");

        let registry = RegistryStore::new(self.fs, self.layout)
            .remove(appid)
            .map_err(|err| RemoveFailure::new(RemoveStage::RegistryEntryRemoved, err))?;
        if registry == RemoveOutcome::NotFound {
            warn!(%appid, "install tree deleted but no registry entry existed");
        }
        info!(%appid, "removed");
        Ok(RemoveReport::Removed {
            appid: appid.to_string(),
            install_dir,
            registry,
        })
    }
}
