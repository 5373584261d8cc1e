// Public API surface for `opa-core`.
//
// Keeps the crate root small and lists the types and functions the CLI
// binaries depend on.

pub use crate::core::apps::{
    install_app, list_apps, remove_app, start_app, AppsLayout, InstallRequest, RemoveRequest,
    StartRequest,
};
pub use crate::core::config::context::{CommandContext, CommandGroup, CommandInfo};
pub use crate::core::config::{
    AppsConfig, AppsDirSource, Config, PlatformConfig, APPS_DIR_ENV,
    DEFAULT_OS_VERSION, OS_VERSION_ENV,
};
pub use crate::core::effects::{
    Effects, EnvironmentResolver, FileLock, FileSystem, ProcessLauncher, SharedEffects,
    SystemEffects,
};
pub use crate::core::tooling::diagnostics::commands as diag_commands;
pub use crate::core::tooling::failure::{
    failure_outcome, FailureKind, InstallFailure, InstallStage, OpaError, RemoveFailure,
    RemoveStage, StageFailure,
};
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::tooling::response::{format_status_message, status_label, to_json_response};
