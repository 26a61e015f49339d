use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable overrides for hook runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// HOME, or USERPROFILE when HOME is unset or empty
    pub home: Option<PathBuf>,
    /// GITHOOK_FILE_SIZE_MAX in bytes; unparseable values are ignored
    pub file_size_max: Option<u64>,
    /// GITHOOK_LOG_LEVEL
    pub log_level: Option<String>,
    /// GITHOOK_LOG_OUTPUT
    pub log_output: Option<String>,
    /// GITHOOK_GIT: git program to run instead of `git`
    pub git_program: Option<OsString>,
}

impl EnvOverrides {
    /// Read all githook environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Build overrides from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let text = |name: &str| get(name).map(|v| v.to_string_lossy().trim().to_string());

        Self {
            home: get("HOME").or_else(|| get("USERPROFILE")).map(PathBuf::from),
            file_size_max: text("GITHOOK_FILE_SIZE_MAX").and_then(|v| v.parse().ok()),
            log_level: text("GITHOOK_LOG_LEVEL").filter(|v| !v.is_empty()),
            log_output: text("GITHOOK_LOG_OUTPUT").filter(|v| !v.is_empty()),
            git_program: get("GITHOOK_GIT"),
        }
    }
}
