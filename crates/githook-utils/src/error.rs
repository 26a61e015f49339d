/// Base error type for githook-utils operations.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    #[error("unable to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("subprocess failed: {command}: {source}")]
    Subprocess {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to feed stdin of {command}: {source}")]
    Stdin {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UtilError {
    /// True when the program itself could not be started, as opposed to a
    /// failure while it was running.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, UtilError::Spawn { .. })
    }
}
