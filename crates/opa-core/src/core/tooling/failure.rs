use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use opa_domain::{ArchitectureId, ManifestError, MANIFEST_FILE_NAME, REGISTRY_FILE_NAME};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::config::{APPS_DIR_ENV, OS_VERSION_ENV};
use crate::diagnostics::commands as diag;
use crate::outcome::{CommandStatus, ExecutionOutcome};

/// Stable classification of every failure an install, remove or start can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ManifestNotFound,
    ManifestMalformed,
    OsVersionTooLow,
    NoSuitableArchitecture,
    Extraction,
    Filesystem,
    RegistryIo,
    AppNotFound,
    Configuration,
}

impl FailureKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ManifestNotFound => diag::MANIFEST_NOT_FOUND,
            Self::ManifestMalformed => diag::MANIFEST_MALFORMED,
            Self::OsVersionTooLow => diag::OS_VERSION_TOO_LOW,
            Self::NoSuitableArchitecture => diag::NO_SUITABLE_ARCHITECTURE,
            Self::Extraction => diag::EXTRACTION,
            Self::Filesystem => diag::FILESYSTEM,
            Self::RegistryIo => diag::REGISTRY_IO,
            Self::AppNotFound => diag::APP_NOT_FOUND,
            Self::Configuration => diag::CONFIGURATION,
        }
    }

    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ManifestNotFound => 10,
            Self::ManifestMalformed => 11,
            Self::OsVersionTooLow => 12,
            Self::NoSuitableArchitecture => 13,
            Self::Extraction => 14,
            Self::Filesystem => 15,
            Self::RegistryIo => 16,
            Self::AppNotFound => 17,
            Self::Configuration => 18,
        }
    }

    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::ManifestNotFound => "manifest_not_found",
            Self::ManifestMalformed => "manifest_malformed",
            Self::OsVersionTooLow => "os_version_too_low",
            Self::NoSuitableArchitecture => "no_suitable_architecture",
            Self::Extraction => "extraction_failed",
            Self::Filesystem => "filesystem_error",
            Self::RegistryIo => "registry_io_error",
            Self::AppNotFound => "app_not_found",
            Self::Configuration => "configuration_error",
        }
    }

    /// Environment problems are failures; everything the package or the
    /// operator can fix is a user error.
    #[must_use]
    pub const fn status(self) -> CommandStatus {
        match self {
            Self::Filesystem | Self::RegistryIo => CommandStatus::Failure,
            _ => CommandStatus::UserError,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpaError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("requires OS version {required} or newer (current: {current})")]
    OsVersionTooLow { required: String, current: String },
    #[error("no suitable architecture for {appid} (declared: {})", .declared.join(", "))]
    NoSuitableArchitecture { appid: String, declared: Vec<String> },
    #[error("failed to extract {}", .archive.display())]
    Extraction {
        archive: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to {action} {}", .path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("registry at {} could not be read or written", .path.display())]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("{appid} is not installed")]
    AppNotFound { appid: String },
    #[error("{reason}")]
    Configuration { reason: String },
}

impl OpaError {
    pub(crate) fn filesystem(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: anyhow::Error,
    ) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Manifest(err) if err.is_malformed() => FailureKind::ManifestMalformed,
            Self::Manifest(_) => FailureKind::ManifestNotFound,
            Self::OsVersionTooLow { .. } => FailureKind::OsVersionTooLow,
            Self::NoSuitableArchitecture { .. } => FailureKind::NoSuitableArchitecture,
            Self::Extraction { .. } => FailureKind::Extraction,
            Self::Filesystem { .. } => FailureKind::Filesystem,
            Self::RegistryIo { .. } => FailureKind::RegistryIo,
            Self::AppNotFound { .. } => FailureKind::AppNotFound,
            Self::Configuration { .. } => FailureKind::Configuration,
        }
    }

    #[must_use]
    pub fn hint(&self) -> String {
        match self {
            Self::Manifest(err) if err.is_malformed() => format!(
                "fix {MANIFEST_FILE_NAME}: Application needs appname, appid, appversion, appstatus and minversion, and Build needs at least one platform"
            ),
            Self::Manifest(_) => {
                format!("package archives must carry {MANIFEST_FILE_NAME} at their root")
            }
            Self::OsVersionTooLow { .. } => format!(
                "use a package built for this OS version, or set {OS_VERSION_ENV} if the reported version is wrong"
            ),
            Self::NoSuitableArchitecture { .. } => {
                "the archive needs bin/<platform>/main for one of the declared platforms".to_string()
            }
            Self::Extraction { .. } => {
                "check that the archive is a valid zip file and the apps directory is writable"
                    .to_string()
            }
            Self::Filesystem { .. } => {
                "check permissions and free space under the apps directory".to_string()
            }
            Self::RegistryIo { .. } => {
                format!("inspect or restore {REGISTRY_FILE_NAME} in the apps directory")
            }
            Self::AppNotFound { .. } => "run `opa list` to see installed applications".to_string(),
            Self::Configuration { .. } => format!("set HOME or {APPS_DIR_ENV}"),
        }
    }

    /// Structured diagnostic payload: code, reason, hint, the fields of the
    /// variant and the chain of underlying causes.
    #[must_use]
    pub fn details(&self) -> Map<String, Value> {
        let kind = self.kind();
        let mut details = Map::new();
        details.insert("code".into(), json!(kind.code()));
        details.insert("reason".into(), json!(kind.reason()));
        details.insert("hint".into(), json!(self.hint()));
        match self {
            Self::Manifest(err) => {
                details.insert("manifest".into(), json!(err.path().display().to_string()));
            }
            Self::OsVersionTooLow { required, current } => {
                details.insert("required".into(), json!(required));
                details.insert("current".into(), json!(current));
            }
            Self::NoSuitableArchitecture { appid, declared } => {
                details.insert("appid".into(), json!(appid));
                details.insert("declared".into(), json!(declared));
                details.insert(
                    "host_architecture".into(),
                    json!(ArchitectureId::host().to_string()),
                );
            }
            Self::Extraction { archive, .. } => {
                details.insert("archive".into(), json!(archive.display().to_string()));
            }
            Self::Filesystem { action, path, .. } => {
                details.insert("action".into(), json!(action));
                details.insert("path".into(), json!(path.display().to_string()));
            }
            Self::RegistryIo { path, .. } => {
                details.insert("registry".into(), json!(path.display().to_string()));
            }
            Self::AppNotFound { appid } => {
                details.insert("appid".into(), json!(appid));
            }
            Self::Configuration { .. } => {}
        }
        let issues = cause_chain(self);
        if !issues.is_empty() {
            details.insert("issues".into(), json!(issues));
        }
        details
    }
}

fn cause_chain(err: &dyn StdError) -> Vec<String> {
    let mut issues = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !issues.contains(&text) {
            issues.push(text);
        }
        current = cause.source();
    }
    issues
}

/// Outcome for a failure that is not tied to a pipeline stage.
#[must_use]
pub fn failure_outcome(err: &OpaError) -> ExecutionOutcome {
    outcome_for(err, err.to_string(), err.details())
}

fn outcome_for(err: &OpaError, message: String, details: Map<String, Value>) -> ExecutionOutcome {
    let kind = err.kind();
    let details = Value::Object(details);
    let outcome = match kind.status() {
        CommandStatus::Failure => ExecutionOutcome::failure(message, details),
        _ => ExecutionOutcome::user_error(message, details),
    };
    outcome.with_exit_code(kind.exit_code())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStage {
    Extracted,
    ManifestValidated,
    ArchitectureSelected,
    ArtifactsCopied,
    RegistryCommitted,
    ScratchCleaned,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Extracted => "extracted",
            InstallStage::ManifestValidated => "manifest-validated",
            InstallStage::ArchitectureSelected => "architecture-selected",
            InstallStage::ArtifactsCopied => "artifacts-copied",
            InstallStage::RegistryCommitted => "registry-committed",
            InstallStage::ScratchCleaned => "scratch-cleaned",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoveStage {
    Found,
    TreeDeleted,
    RegistryEntryRemoved,
}

impl fmt::Display for RemoveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoveStage::Found => "found",
            RemoveStage::TreeDeleted => "tree-deleted",
            RemoveStage::RegistryEntryRemoved => "registry-entry-removed",
        };
        f.write_str(name)
    }
}

/// A pipeline failure: the stage that did not complete, the cause, and
/// whatever partial state was left on disk.
#[derive(Debug)]
pub struct StageFailure<S> {
    pub stage: S,
    pub error: OpaError,
    pub leftovers: Vec<(&'static str, PathBuf)>,
}

pub type InstallFailure = StageFailure<InstallStage>;
pub type RemoveFailure = StageFailure<RemoveStage>;

impl<S: fmt::Display> StageFailure<S> {
    pub(crate) fn new(stage: S, error: OpaError) -> Self {
        Self {
            stage,
            error,
            leftovers: Vec::new(),
        }
    }

    #[must_use]
    pub(crate) fn leaving(mut self, label: &'static str, path: impl Into<PathBuf>) -> Self {
        self.leftovers.push((label, path.into()));
        self
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    #[must_use]
    pub fn into_outcome(self) -> ExecutionOutcome {
        let mut details = self.error.details();
        details.insert("stage".into(), json!(self.stage.to_string()));
        if !self.leftovers.is_empty() {
            details.insert("partial".into(), json!(true));
            for (label, path) in &self.leftovers {
                details.insert((*label).to_string(), json!(path.display().to_string()));
            }
        }
        let message = self.to_string();
        outcome_for(&self.error, message, details)
    }
}

impl<S: fmt::Display> fmt::Display for StageFailure<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (failed before stage {})", self.error, self.stage)
    }
}

impl<S: fmt::Display + fmt::Debug> StdError for StageFailure<S> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}
