//! The per-user YAML configuration file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::env::EnvOverrides;
use crate::{ConfigError, Result};

/// File name of the configuration file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".githook_config";

/// Size limit when neither the project nor the environment sets one (5 MiB).
pub const DEFAULT_SIZE_LIMIT: u64 = 5 * 1024 * 1024;

/// Contents of `~/.githook_config`.
///
/// ```yaml
/// projects_whitelist:
///   - tools/prebuilts
/// project_size_limits:
///   platform/media: 20971520
/// log_config:
///   level: info
///   output: stderr
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    #[serde(deserialize_with = "nullable")]
    pub projects_whitelist: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub project_size_limits: BTreeMap<String, u64>,
    #[serde(deserialize_with = "nullable")]
    pub log_config: LogConfig,
}

/// The `log_config` section. Empty values mean "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: Option<String>,
    pub output: Option<String>,
}

/// A present-but-empty key (`projects_whitelist:`) reads as its default.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where an effective size limit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSource {
    Project,
    Environment,
    Default,
}

/// The size limit that applies to one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimit {
    pub bytes: u64,
    pub source: LimitSource,
}

impl HookConfig {
    /// Parse YAML text. An empty document is an empty configuration.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Load the configuration for the current user.
    ///
    /// Never fails. Without a usable file the configuration is empty and
    /// the problem is handed back, so the caller can report it once its
    /// logger is installed. A hook must not fail closed because of a broken
    /// config file.
    pub fn discover(env: &EnvOverrides) -> (Self, Option<ConfigError>) {
        let loaded = match config_path(env) {
            Some(path) => Self::load(&path),
            None => Err(ConfigError::NoHome),
        };
        match loaded {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    pub fn is_project_whitelisted(&self, project: &str) -> bool {
        self.projects_whitelist.iter().any(|p| p == project)
    }

    /// The limit for `project`: its own entry, else `GITHOOK_FILE_SIZE_MAX`,
    /// else [`DEFAULT_SIZE_LIMIT`].
    pub fn size_limit(&self, project: &str, env: &EnvOverrides) -> SizeLimit {
        if let Some(&bytes) = self.project_size_limits.get(project) {
            return SizeLimit {
                bytes,
                source: LimitSource::Project,
            };
        }
        match env.file_size_max {
            Some(bytes) => SizeLimit {
                bytes,
                source: LimitSource::Environment,
            },
            None => SizeLimit {
                bytes: DEFAULT_SIZE_LIMIT,
                source: LimitSource::Default,
            },
        }
    }
}

/// `<home>/.githook_config`, if a home directory is known.
pub fn config_path(env: &EnvOverrides) -> Option<PathBuf> {
    env.home.as_ref().map(|home| home.join(CONFIG_FILE_NAME))
}
