#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod layout;
pub mod manifest;
pub mod platform;
pub mod registry;

pub use layout::{
    is_app_dir_name, is_reserved_name, is_single_component, staged_binary_path, ICON_PATH,
    INSTALLED_BINARY_PATH, MANIFEST_FILE_NAME, REGISTRY_FILE_NAME, REGISTRY_LOCK_FILE_NAME,
    REGISTRY_TMP_FILE_NAME, SCRATCH_DIR_NAME,
};
pub use manifest::{parse_manifest, read_manifest, ManifestError, PackageManifest};
pub use platform::{check_os_version, select_architecture, ArchitectureId};
pub use registry::{InstalledAppEntry, Registry, RegistryError, RemoveOutcome, UpsertOutcome};
