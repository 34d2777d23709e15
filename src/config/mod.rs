//! Configuration management.
//!
//! Settings come from a TOML file; every key is optional:
//!
//! ```toml
//! template_dir = "templates"
//! extension = "md"
//! cooldown_ms = 100
//! use_trash = true
//!
//! [logging]
//! format = "pretty"
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::DEFAULT_COOLDOWN;
use crate::{Error, Result};

/// Default template directory name.
pub const DEFAULT_TEMPLATE_DIR: &str = "templates";

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = "md";

/// Name of the trash folder inside the template directory.
pub const TRASH_DIR_NAME: &str = ".trash";

/// Main configuration for textplate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextplateConfig {
    /// Directory holding one file per template.
    pub template_dir: PathBuf,
    /// Template file extension, without the dot.
    pub extension: String,
    /// Trigger suppression window after an insertion.
    pub cooldown: Duration,
    /// Move orphaned files to a trash folder instead of deleting them.
    pub use_trash: bool,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Logging section in config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Output format: "pretty" or "json".
    pub format: Option<String>,
    /// Level or filter directive, e.g. "info" or "textplate=debug".
    pub level: Option<String>,
    /// Log file path. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Template directory.
    pub template_dir: Option<String>,
    /// Template file extension.
    pub extension: Option<String>,
    /// Cooldown in milliseconds.
    pub cooldown_ms: Option<u64>,
    /// Trash orphaned files.
    pub use_trash: Option<bool>,
    /// Logging configuration.
    pub logging: Option<LoggingSettings>,
}

impl Default for TextplateConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from(DEFAULT_TEMPLATE_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            cooldown: DEFAULT_COOLDOWN,
            use_trash: true,
            logging: LoggingSettings::default(),
        }
    }
}

impl TextplateConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or
    /// parsed, or holds an unusable extension.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;

        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/textplate/` on macOS)
    /// 2. XDG config dir (`~/.config/textplate/` for Unix compatibility)
    ///
    /// Returns default configuration if no usable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        for path in Self::default_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring config file");
                },
            }
        }

        Self::default()
    }

    /// Candidate config file locations, most specific first.
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };

        let platform_config = base_dirs.config_dir().join("textplate").join("config.toml");
        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("textplate")
            .join("config.toml");

        if platform_config == xdg_config {
            vec![platform_config]
        } else {
            vec![platform_config, xdg_config]
        }
    }

    /// Converts a `ConfigFile` to `TextplateConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(dir) = file.template_dir {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(extension) = file.extension {
            config.extension = normalize_extension(&extension);
        }
        if let Some(ms) = file.cooldown_ms {
            config.cooldown = Duration::from_millis(ms);
        }
        if let Some(use_trash) = file.use_trash {
            config.use_trash = use_trash;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Checks values that would make the template directory unusable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty extension or one
    /// containing a path separator.
    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(Error::Configuration(
                "template extension must not be empty".to_string(),
            ));
        }
        if self.extension.contains(['/', '\\']) {
            return Err(Error::Configuration(format!(
                "template extension '{}' contains a path separator",
                self.extension
            )));
        }
        Ok(())
    }

    /// Sets the template directory.
    #[must_use]
    pub fn with_template_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_dir = path.into();
        self
    }

    /// Sets the template file extension.
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = normalize_extension(extension);
        self
    }

    /// Trash folder for orphaned files, if trashing is enabled.
    #[must_use]
    pub fn trash_dir(&self) -> Option<PathBuf> {
        self.use_trash
            .then(|| self.template_dir.join(TRASH_DIR_NAME))
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = TextplateConfig::default();
        assert_eq!(config.template_dir, PathBuf::from("templates"));
        assert_eq!(config.extension, "md");
        assert_eq!(config.cooldown, Duration::from_millis(100));
        assert_eq!(config.trash_dir(), Some(PathBuf::from("templates/.trash")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
template_dir = "/notes/snippets"
extension = ".txt"
cooldown_ms = 250
use_trash = false

[logging]
format = "json"
level = "debug"
"#
        )
        .unwrap();

        let config = TextplateConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.template_dir, PathBuf::from("/notes/snippets"));
        assert_eq!(config.extension, "txt");
        assert_eq!(config.cooldown, Duration::from_millis(250));
        assert!(config.trash_dir().is_none());
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "cooldown_ms = 0").unwrap();

        let config = TextplateConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.extension, "md");
        assert_eq!(config.cooldown, Duration::ZERO);
        assert!(config.use_trash);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "template_dir = [").unwrap();

        let err = TextplateConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = TextplateConfig::load_from_file(Path::new("/nonexistent/textplate.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_extension_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"extension = ".""#).unwrap();
        assert!(TextplateConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_builders() {
        let config = TextplateConfig::new()
            .with_template_dir("/tmp/t")
            .with_extension(".tpl");
        assert_eq!(config.template_dir, PathBuf::from("/tmp/t"));
        assert_eq!(config.extension, "tpl");
        assert!(config.validate().is_ok());
    }
}
