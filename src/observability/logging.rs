//! Structured logging configuration.

use crate::config::LoggingSettings;

/// Environment variable that overrides the configured filter.
pub const LOG_ENV_VAR: &str = "RUST_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than "json" is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub directive: String,
    /// Optional log file; stderr otherwise.
    pub file: Option<std::path::PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            directive: "warn".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config file settings.
    ///
    /// `verbose` raises the default level to `debug` for this crate.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let mut config = Self::default();

        if let Some(settings) = settings {
            if let Some(format) = &settings.format {
                config.format = LogFormat::parse(format);
            }
            if let Some(level) = &settings.level {
                config.directive.clone_from(level);
            }
            config.file.clone_from(&settings.file);
        }

        if verbose {
            config.directive = format!("{},textplate=debug", config.directive);
        }

        config
    }

    /// Builds the filter, letting `RUST_LOG` win over the configured directive.
    #[must_use]
    pub fn filter(&self) -> tracing_subscriber::EnvFilter {
        tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(&self.directive))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            level: Some("info".to_string()),
            file: Some("/tmp/textplate.log".into()),
        };
        let config = LoggingConfig::from_settings(Some(&settings), false);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive, "info");
        assert!(config.file.is_some());
    }

    #[test]
    fn test_verbose_adds_crate_directive() {
        let config = LoggingConfig::from_settings(None, true);
        assert_eq!(config.directive, "warn,textplate=debug");
    }
}
