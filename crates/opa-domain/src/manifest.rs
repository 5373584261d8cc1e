//! Package descriptor (`Manifest.xml`) reading and validation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Deserialize;

use crate::layout::{is_reserved_name, is_single_component};

/// Typed view of a package's `Manifest.xml`.
///
/// Only constructed through [`parse_manifest`] / [`read_manifest`], which
/// guarantee every required field is present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub appid: String,
    pub appname: String,
    pub appversion: String,
    pub appstatus: String,
    pub minversion: String,
    /// Declared architectures in manifest order, duplicates collapsed.
    pub platforms: IndexSet<String>,
    pub permissions: IndexSet<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("manifest at {} could not be read", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest at {} is malformed: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl ManifestError {
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::Unreadable { path, .. } | Self::Malformed { path, .. } => {
                path
            }
        }
    }

    /// True for every failure that means the descriptor exists but cannot be used.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(rename = "Application", default)]
    application: Option<RawApplication>,
    #[serde(rename = "Build", default)]
    build: Option<RawBuild>,
    #[serde(rename = "Privacy", default)]
    privacy: Option<RawPrivacy>,
}

#[derive(Debug, Default, Deserialize)]
struct RawApplication {
    #[serde(default)]
    appname: Option<String>,
    #[serde(default)]
    appid: Option<String>,
    #[serde(default)]
    appversion: Option<String>,
    #[serde(default)]
    appstatus: Option<String>,
    #[serde(default)]
    minversion: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBuild {
    #[serde(rename = "platform", default)]
    platforms: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPrivacy {
    // The element name is spelled this way in every published package.
    #[serde(rename = "pressmission", default)]
    permissions: Vec<String>,
}

/// Read and validate the manifest stored at `path`.
pub fn read_manifest(path: &Path) -> Result<PackageManifest, ManifestError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(ManifestError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_manifest(&contents, path)
}

/// Parse manifest XML. `origin` is only used for diagnostics.
pub fn parse_manifest(contents: &str, origin: &Path) -> Result<PackageManifest, ManifestError> {
    let malformed = |reason: String| ManifestError::Malformed {
        path: origin.to_path_buf(),
        reason,
    };

    let raw: RawManifest =
        quick_xml::de::from_str(contents).map_err(|err| malformed(err.to_string()))?;

    let Some(application) = raw.application else {
        return Err(malformed("missing <Application> section".to_string()));
    };

    let mut missing = Vec::new();
    let mut field = |name: &'static str, value: Option<String>| -> String {
        match non_empty(value) {
            Some(value) => value,
            None => {
                missing.push(name);
                String::new()
            }
        }
    };
    let appname = field("appname", application.appname);
    let appid = field("appid", application.appid);
    let appversion = field("appversion", application.appversion);
    let appstatus = field("appstatus", application.appstatus);
    let minversion = field("minversion", application.minversion);
    if !missing.is_empty() {
        return Err(malformed(format!(
            "missing required Application fields: {}",
            missing.join(", ")
        )));
    }

    if !is_single_component(&appid) {
        return Err(malformed(format!(
            "appid '{appid}' cannot be used as an application directory name"
        )));
    }
    if is_reserved_name(&appid) {
        return Err(malformed(format!(
            "appid '{appid}' collides with an installer file in the apps directory"
        )));
    }

    let platforms: IndexSet<String> = raw
        .build
        .map(|build| build.platforms)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|platform| non_empty(Some(platform)))
        .collect();
    if platforms.is_empty() {
        return Err(malformed(
            "no <platform> entries declared under <Build>".to_string(),
        ));
    }

    let permissions = raw
        .privacy
        .map(|privacy| privacy.permissions)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|permission| non_empty(Some(permission)))
        .collect();

    tracing::trace!(%appid, platforms = platforms.len(), "parsed manifest");
    Ok(PackageManifest {
        appid,
        appname,
        appversion,
        appstatus,
        minversion,
        platforms,
        permissions,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
