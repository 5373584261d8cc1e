//! OS compatibility checks and architecture selection.

use std::fmt;

use crate::layout::is_single_component;

/// Returns true when `current` satisfies the package's `minimum` OS version.
///
/// The comparison is a plain codepoint-wise string comparison, not a
/// semantic version comparison: `"2.0"` satisfies a minimum of `"10.0"`.
/// Installed packages were published against this ordering, so it is kept
/// as-is.
pub fn check_os_version(current: &str, minimum: &str) -> bool {
    current >= minimum
}

/// Architecture identifier as spelled in package manifests (`x86-64`,
/// `aarch64`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchitectureId(String);

impl ArchitectureId {
    /// Identifier of the machine this binary was built for, in the
    /// manifest naming convention.
    pub fn host() -> Self {
        Self(Self::detect_arch().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn detect_arch() -> &'static str {
        #[cfg(target_arch = "x86_64")]
        return "x86-64";
        #[cfg(target_arch = "aarch64")]
        return "aarch64";
        #[cfg(target_arch = "arm")]
        return "armv7";
        #[cfg(target_arch = "riscv64")]
        return "riscv64";
        #[cfg(not(any(
            target_arch = "x86_64",
            target_arch = "aarch64",
            target_arch = "arm",
            target_arch = "riscv64"
        )))]
        return "unknown";
    }
}

impl fmt::Display for ArchitectureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArchitectureId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ArchitectureId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Pick the first declared platform whose binary is available.
///
/// Platforms are visited in manifest order and `available` is asked about
/// each one; there is no preference ranking beyond that order. Identifiers
/// that are not a single path component are skipped without probing.
/// Returns `None` when nothing matches.
pub fn select_architecture<'a, I, F>(platforms: I, mut available: F) -> Option<ArchitectureId>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&str) -> bool,
{
    platforms
        .into_iter()
        .filter(|platform| is_single_component(platform))
        .find(|platform| available(platform))
        .map(ArchitectureId::from)
}
