//! Configuration and per-command context assembly.

pub mod context;

use std::path::PathBuf;

use serde::Serialize;

use crate::core::effects::EnvironmentResolver;
use crate::core::tooling::failure::OpaError;

pub const APPS_DIR_ENV: &str = "OPA_APPS_DIR";
pub const OS_VERSION_ENV: &str = "OPA_OS_VERSION";
pub const DEFAULT_OS_VERSION: &str = "1.0";
const APPS_DIR_NAME: &str = "Applications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AppsDirSource {
    #[serde(rename = "OPA_APPS_DIR")]
    Override,
    #[serde(rename = "home")]
    Home,
}

impl AppsDirSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Override => APPS_DIR_ENV,
            Self::Home => "home",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppsConfig {
    pub root: PathBuf,
    pub source: AppsDirSource,
}

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub os_version: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) apps: AppsConfig,
    pub(crate) platform: PlatformConfig,
}

impl Config {
    /// Resolves the apps directory and the reported OS version.
    ///
    /// # Errors
    /// Returns [`OpaError::Configuration`] when neither `OPA_APPS_DIR` nor a
    /// home directory is available.
    pub fn from_env(env: &dyn EnvironmentResolver) -> Result<Self, OpaError> {
        let apps = match env.var(APPS_DIR_ENV) {
            Some(dir) => AppsConfig {
                root: PathBuf::from(dir.trim()),
                source: AppsDirSource::Override,
            },
            None => {
                let home = env.home_dir().ok_or_else(|| OpaError::Configuration {
                    reason: "home directory could not be resolved".to_string(),
                })?;
                AppsConfig {
                    root: home.join(APPS_DIR_NAME),
                    source: AppsDirSource::Home,
                }
            }
        };
        let os_version = env
            .var(OS_VERSION_ENV)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_OS_VERSION.to_string());
        Ok(Self {
            apps,
            platform: PlatformConfig { os_version },
        })
    }

    #[must_use]
    pub fn apps(&self) -> &AppsConfig {
        &self.apps
    }

    #[must_use]
    pub fn platform(&self) -> &PlatformConfig {
        &self.platform
    }
}
