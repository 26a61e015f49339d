use std::path::PathBuf;

/// Errors that can occur while loading configuration or setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid log level: '{0}'")]
    InvalidLogLevel(String),

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to install logger: {0}")]
    Logger(String),

    #[error("no home directory set")]
    NoHome,
}

impl ConfigError {
    /// True when there is simply no configuration file to read, as opposed
    /// to one that exists but cannot be used.
    pub fn is_missing_file(&self) -> bool {
        matches!(
            self,
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
