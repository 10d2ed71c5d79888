use crate::backend::Core;
use crate::encoder::{CallerEncoding, EncoderConfig};
use crate::env::{env_opt, CLOUD_LOGGING_LEVEL_ENV, CLOUD_LOGGING_PRESET_ENV};
use crate::error::ConfigError;
use crate::layer::CloudLoggingLayer;
use crate::level::Level;
use crate::severity::{DefaultSeverityMapper, LevelToSeverity};
use crate::sink::LogSink;
use std::fmt;
use std::sync::Arc;

/// Everything a [`Core`] needs besides its sink.
///
/// **Fields**
/// - `encoder`: payload rendering options.
/// - `level`: minimum level; records below it are dropped.
/// - `level_to_severity`: strategy used to pick the sink severity of each
///   record. Replace it to target a different severity vocabulary.
/// - `stacktrace_level`: records at or above this level get a backtrace
///   attached by the tracing layer. `None` disables capture.
#[derive(Clone)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub level: Level,
    pub level_to_severity: Arc<dyn LevelToSeverity>,
    pub stacktrace_level: Option<Level>,
}

impl Config {
    pub fn new(
        encoder: EncoderConfig,
        level: Level,
        level_to_severity: Arc<dyn LevelToSeverity>,
    ) -> Self {
        Self {
            encoder,
            level,
            level_to_severity,
            stacktrace_level: None,
        }
    }

    /// `INFO` and above, short callers, backtraces from `ERROR`.
    pub fn production() -> Self {
        Self {
            encoder: EncoderConfig::default(),
            level: Level::INFO,
            level_to_severity: Arc::new(DefaultSeverityMapper),
            stacktrace_level: Some(Level::ERROR),
        }
    }

    /// Everything from `DEBUG`, full caller paths, backtraces from `WARN`.
    pub fn development() -> Self {
        Self {
            encoder: EncoderConfig {
                caller: CallerEncoding::Full,
                ..EncoderConfig::default()
            },
            level: Level::DEBUG,
            level_to_severity: Arc::new(DefaultSeverityMapper),
            stacktrace_level: Some(Level::WARN),
        }
    }

    /// Build from `CLOUD_LOGGING_PRESET` and `CLOUD_LOGGING_LEVEL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_opt)
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CLOUD_LOGGING_PRESET_ENV) {
            None => Self::production(),
            Some(preset) => match preset.trim().to_ascii_lowercase().as_str() {
                "production" | "prod" => Self::production(),
                "development" | "dev" => Self::development(),
                _ => return Err(ConfigError::UnknownPreset(preset)),
            },
        };
        if let Some(level) = lookup(CLOUD_LOGGING_LEVEL_ENV) {
            config.level = level.parse()?;
        }
        Ok(config)
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_level_to_severity(mut self, mapper: impl LevelToSeverity + 'static) -> Self {
        self.level_to_severity = Arc::new(mapper);
        self
    }

    pub fn with_stacktrace_level(mut self, level: Option<Level>) -> Self {
        self.stacktrace_level = level;
        self
    }

    pub fn build(&self, sink: Arc<dyn LogSink>) -> Core {
        Core::new(sink, self)
    }

    pub fn layer(&self, sink: Arc<dyn LogSink>) -> CloudLoggingLayer {
        CloudLoggingLayer::new(self.build(sink), self.stacktrace_level)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::production()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("encoder", &self.encoder)
            .field("level", &self.level)
            .field("stacktrace_level", &self.stacktrace_level)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn presets_differ_in_verbosity() {
        let prod = Config::production();
        let dev = Config::development();
        assert_eq!(prod.level, Level::INFO);
        assert_eq!(dev.level, Level::DEBUG);
        assert_eq!(prod.encoder.caller, CallerEncoding::Short);
        assert_eq!(dev.encoder.caller, CallerEncoding::Full);
        assert_eq!(prod.stacktrace_level, Some(Level::ERROR));
        assert_eq!(dev.stacktrace_level, Some(Level::WARN));
        assert_eq!(prod.level_to_severity.to_severity(Level::PANIC), Severity::Critical);
    }

    #[test]
    fn empty_environment_is_production() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.encoder, EncoderConfig::default());
    }

    #[test]
    fn environment_selects_preset_and_level() {
        let config = Config::from_lookup(lookup(&[
            (CLOUD_LOGGING_PRESET_ENV, "Development"),
            (CLOUD_LOGGING_LEVEL_ENV, "error"),
        ]))
        .unwrap();
        assert_eq!(config.encoder.caller, CallerEncoding::Full);
        assert_eq!(config.level, Level::ERROR);
    }

    #[test]
    fn environment_rejects_unknown_values() {
        let err =
            Config::from_lookup(lookup(&[(CLOUD_LOGGING_PRESET_ENV, "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset(ref p) if p == "staging"));

        let err = Config::from_lookup(lookup(&[(CLOUD_LOGGING_LEVEL_ENV, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::Level(_)));
    }

    #[test]
    fn mapping_strategy_is_replaceable() {
        let config = Config::production().with_level_to_severity(|_: Level| Severity::Alert);
        assert_eq!(config.level_to_severity.to_severity(Level::DEBUG), Severity::Alert);
    }
}
