//! Template record model.
//!
//! A template is a named block of reusable text. The name doubles as the
//! trigger token typed after `!!` and as the source of the on-disk file stem.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named, reusable block of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique template name (case-sensitive).
    pub name: String,
    /// Template body, stored without surrounding whitespace.
    pub content: String,
    /// Whether the host should expose this template as an invokable command.
    #[serde(default = "default_expose")]
    pub expose_as_command: bool,
}

const fn default_expose() -> bool {
    true
}

impl Template {
    /// Creates a new template exposed as a command.
    ///
    /// Surrounding whitespace is trimmed from both name and content, so the
    /// record survives a serialize/deserialize cycle unchanged.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl AsRef<str>) -> Self {
        let name = name.into();
        Self {
            name: name.trim().to_string(),
            content: content.as_ref().trim().to_string(),
            expose_as_command: true,
        }
    }

    /// Sets the command-exposure flag.
    #[must_use]
    pub const fn with_expose_as_command(mut self, expose: bool) -> Self {
        self.expose_as_command = expose;
        self
    }

    /// Checks that the record can be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the name is empty or spans lines.
    pub fn validate(&self) -> Result<()> {
        validate_template_name(&self.name)
    }
}

/// Validates a template name.
///
/// Names may contain any character except line breaks, and must not be
/// blank. They are written verbatim into the `name:` line of the envelope.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] describing the first problem found.
pub fn validate_template_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput(
            "Template name cannot be empty.".to_string(),
        ));
    }

    if name.contains(['\n', '\r']) {
        return Err(Error::InvalidInput(format!(
            "Template name cannot contain line breaks: {name:?}"
        )));
    }

    if name != name.trim() {
        return Err(Error::InvalidInput(format!(
            "Template name cannot start or end with whitespace: {name:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_exposes() {
        let template = Template::new("  greeting ", "\n  Hello world  \n\n");
        assert_eq!(template.name, "greeting");
        assert_eq!(template.content, "Hello world");
        assert!(template.expose_as_command);
    }

    #[test]
    fn test_new_keeps_inner_whitespace() {
        let template = Template::new("list", "- one\n\n- two");
        assert_eq!(template.content, "- one\n\n- two");
    }

    #[test]
    fn test_empty_content_is_legal() {
        let template = Template::new("blank", "");
        assert!(template.content.is_empty());
        assert!(template.validate().is_ok());
    }

    #[test]
    fn test_validate_template_name() {
        assert!(validate_template_name("meeting notes").is_ok());
        assert!(validate_template_name("a/b: c?").is_ok());
        assert!(validate_template_name("日本語").is_ok());

        assert!(validate_template_name("").is_err());
        assert!(validate_template_name("   ").is_err());
        assert!(validate_template_name("two\nlines").is_err());
        assert!(validate_template_name(" padded").is_err());
    }

    #[test]
    fn test_with_expose_as_command() {
        let template = Template::new("hidden", "x").with_expose_as_command(false);
        assert!(!template.expose_as_command);
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let template = Template::new("x", "y");
        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("\"exposeAsCommand\":true"));

        let parsed: Template = serde_json::from_str(r#"{"name":"x","content":"y"}"#).unwrap();
        assert!(parsed.expose_as_command);
    }
}
