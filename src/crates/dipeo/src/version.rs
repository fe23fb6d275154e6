//! Version metadata, including build number, git commit, and build
//! timestamp injected at compile time by `build.rs`.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_NUMBER: &str = env!("BUILD_NUMBER");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");

/// Full version string including build metadata.
pub fn full_version() -> String {
    format!("dipeo v{} (build {}, commit {}, built {})", VERSION, BUILD_NUMBER, GIT_COMMIT, BUILD_TIMESTAMP)
}

/// Version only, e.g. "v0.1.0".
pub fn short_version() -> String {
    format!("v{}", VERSION)
}

#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub version: &'static str,
    pub build_number: &'static str,
    pub git_commit: &'static str,
    pub build_timestamp: &'static str,
}

impl VersionInfo {
    pub fn get() -> Self {
        Self { version: VERSION, build_number: BUILD_NUMBER, git_commit: GIT_COMMIT, build_timestamp: BUILD_TIMESTAMP }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dipeo v{} (build {}, commit {}, built {})",
            self.version, self.build_number, self.git_commit, self.build_timestamp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_constants_are_nonempty() {
        assert!(!VERSION.is_empty());
        assert!(!BUILD_NUMBER.is_empty());
        assert!(!GIT_COMMIT.is_empty());
        assert!(!BUILD_TIMESTAMP.is_empty());
    }

    #[test]
    fn full_version_includes_the_package_version() {
        let version = full_version();
        assert!(version.contains("dipeo"));
        assert!(version.contains(VERSION));
    }

    #[test]
    fn short_version_is_prefixed_with_v() {
        let version = short_version();
        assert!(version.starts_with('v'));
        assert!(version.contains(VERSION));
    }

    #[test]
    fn version_info_round_trips_the_constants() {
        let info = VersionInfo::get();
        assert_eq!(info.version, VERSION);
        assert_eq!(info.build_number, BUILD_NUMBER);
        assert_eq!(info.git_commit, GIT_COMMIT);
        assert_eq!(info.build_timestamp, BUILD_TIMESTAMP);
    }
}
