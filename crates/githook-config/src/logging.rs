//! Log subscriber setup from the resolved settings.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::env::EnvOverrides;
use crate::file::LogConfig;
use crate::{ConfigError, Result};

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    Stdout,
    /// Appended to the file and echoed to stdout.
    File(PathBuf),
}

impl LogOutput {
    fn parse(s: &str) -> Self {
        match s {
            "stderr" => LogOutput::Stderr,
            "stdout" => LogOutput::Stdout,
            path => LogOutput::File(PathBuf::from(path)),
        }
    }
}

/// Effective log settings: environment first, then the config file, then
/// `info` on stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub output: LogOutput,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Stderr,
        }
    }
}

impl LogSettings {
    pub fn resolve(config: &LogConfig, env: &EnvOverrides) -> Result<Self> {
        let pick = |env: &Option<String>, file: &Option<String>| {
            env.as_deref()
                .or(file.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let level = match pick(&env.log_level, &config.level) {
            Some(level) => parse_level(&level)?,
            None => Level::INFO,
        };
        let output = pick(&env.log_output, &config.output)
            .map(|s| LogOutput::parse(&s))
            .unwrap_or(LogOutput::Stderr);
        Ok(Self { level, output })
    }
}

/// Accepts the usual level names in any case. `fatal` and `panic` have no
/// tracing equivalent and map to `error`.
fn parse_level(s: &str) -> Result<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "fatal" | "panic" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel(s.to_string())),
    }
}

/// Install the global subscriber. Console output carries only the level and
/// message; file output adds timestamps and never uses color.
pub fn init_logging(settings: &LogSettings) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(settings.level)
        .with_target(false);

    let installed = match &settings.output {
        LogOutput::Stderr => builder.without_time().with_writer(std::io::stderr).try_init(),
        LogOutput::Stdout => builder.without_time().with_writer(std::io::stdout).try_init(),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ConfigError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file).and(std::io::stdout))
                .try_init()
        }
    };
    installed.map_err(|e| ConfigError::Logger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: Option<&str>, output: Option<&str>) -> LogConfig {
        LogConfig {
            level: level.map(str::to_string),
            output: output.map(str::to_string),
        }
    }

    #[test]
    fn defaults() {
        let settings = LogSettings::resolve(&LogConfig::default(), &EnvOverrides::default()).unwrap();
        assert_eq!(settings, LogSettings::default());
    }

    #[test]
    fn file_values_used() {
        let settings =
            LogSettings::resolve(&config(Some("debug"), Some("stdout")), &EnvOverrides::default())
                .unwrap();
        assert_eq!(settings.level, Level::DEBUG);
        assert_eq!(settings.output, LogOutput::Stdout);
    }

    #[test]
    fn environment_wins() {
        let env = EnvOverrides {
            log_level: Some("ERROR".into()),
            log_output: Some("/var/log/githook.log".into()),
            ..Default::default()
        };
        let settings = LogSettings::resolve(&config(Some("debug"), Some("stdout")), &env).unwrap();
        assert_eq!(settings.level, Level::ERROR);
        assert_eq!(settings.output, LogOutput::File(PathBuf::from("/var/log/githook.log")));
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("warning").unwrap(), Level::WARN);
        assert_eq!(parse_level("Trace").unwrap(), Level::TRACE);
        assert_eq!(parse_level("fatal").unwrap(), Level::ERROR);
        assert!(matches!(parse_level("loud"), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn invalid_level_rejected() {
        let err = LogSettings::resolve(&config(Some("verbose"), None), &EnvOverrides::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid log level: 'verbose'");
    }

    #[test]
    fn unopenable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            level: Level::INFO,
            output: LogOutput::File(dir.path().join("missing/dir/hook.log")),
        };
        assert!(matches!(init_logging(&settings), Err(ConfigError::LogFile { .. })));
    }
}
