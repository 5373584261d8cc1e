pub mod commands {
    pub const MANIFEST_NOT_FOUND: &str = "OPA101";
    pub const MANIFEST_MALFORMED: &str = "OPA102";
    pub const OS_VERSION_TOO_LOW: &str = "OPA103";
    pub const NO_SUITABLE_ARCHITECTURE: &str = "OPA104";
    pub const EXTRACTION: &str = "OPA105";
    pub const FILESYSTEM: &str = "OPA106";
    pub const REGISTRY_IO: &str = "OPA107";
    pub const APP_NOT_FOUND: &str = "OPA108";
    pub const CONFIGURATION: &str = "OPA109";
    pub const GENERIC: &str = "OPA000";
}
