//! Template file codec.
//!
//! Maps a [`Template`] to and from its on-disk representation:
//!
//! ```text
//! ---
//! name: meeting-notes
//! exposeAsCommand: true
//! ---
//!
//! ## Attendees
//! ```
//!
//! The envelope is written byte-for-byte in this shape. Metadata lines are
//! plain `key: value` pairs rather than YAML, so names may contain any
//! character except a line break.
//!
//! Files without an envelope are legacy templates: the whole file is the
//! content and the file stem is the name. They are decoded as
//! [`Decoded::Legacy`] so the caller can rewrite them.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::models::Template;

/// Creates a compile-time verified regex wrapped in [`LazyLock`].
macro_rules! lazy_regex {
    ($pattern:expr) => {
        LazyLock::new(|| Regex::new($pattern).unwrap_or_else(|_| unreachable!()))
    };
}

/// Leading `---`, metadata lines, closing `---`, then the rest of the file.
static ENVELOPE_PATTERN: LazyLock<Regex> =
    lazy_regex!(r"(?s)\A---\r?\n(.*?)\r?\n---(?:\r?\n|\z)(.*)\z");

/// Characters that are unsafe in file names on at least one platform.
const UNSAFE_STEM_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Maximum stem length in characters.
pub const MAX_STEM_LEN: usize = 100;

/// Metadata key holding the template name.
const NAME_KEY: &str = "name";

/// Metadata key holding the command-exposure flag.
const EXPOSE_KEY: &str = "exposeAsCommand";

/// Derives a filesystem-safe file stem from a template name.
///
/// Unsafe characters become `_`, every whitespace run becomes a single `_`,
/// and the result is cut to [`MAX_STEM_LEN`] characters.
///
/// Distinct names may share a stem (`"a/b"` and `"a_b"` both give `"a_b"`).
///
/// # Examples
///
/// ```rust
/// use textplate::derive_file_stem;
///
/// assert_eq!(derive_file_stem("Daily: standup"), "Daily__standup");
/// ```
#[must_use]
pub fn derive_file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    let mut in_whitespace = false;

    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                stem.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if UNSAFE_STEM_CHARS.contains(&ch) {
            stem.push('_');
        } else {
            stem.push(ch);
        }
    }

    match stem.char_indices().nth(MAX_STEM_LEN) {
        Some((cut, _)) => stem[..cut].to_string(),
        None => stem,
    }
}

/// Returns the stem of a path, if it is valid UTF-8.
#[must_use]
pub fn file_stem_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(std::ffi::OsStr::to_str)
}

/// Result of decoding a template file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The file carried an envelope.
    Envelope(Template),
    /// The file had no envelope; it should be rewritten.
    Legacy(Template),
}

impl Decoded {
    /// Returns the decoded template.
    #[must_use]
    pub fn into_template(self) -> Template {
        match self {
            Self::Envelope(template) | Self::Legacy(template) => template,
        }
    }

    /// Returns a reference to the decoded template.
    #[must_use]
    pub const fn template(&self) -> &Template {
        match self {
            Self::Envelope(template) | Self::Legacy(template) => template,
        }
    }

    /// Whether the file must be rewritten in the envelope format.
    #[must_use]
    pub const fn needs_migration(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

/// Serializer and parser for template files.
pub struct TemplateCodec;

impl TemplateCodec {
    /// Serializes a template into the envelope format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use textplate::{Template, TemplateCodec};
    ///
    /// let text = TemplateCodec::serialize(&Template::new("sig", "Regards"));
    /// assert_eq!(text, "---\nname: sig\nexposeAsCommand: true\n---\n\nRegards");
    /// ```
    #[must_use]
    pub fn serialize(template: &Template) -> String {
        format!(
            "---\n{NAME_KEY}: {}\n{EXPOSE_KEY}: {}\n---\n\n{}",
            template.name, template.expose_as_command, template.content
        )
    }

    /// Parses the text of a template file.
    ///
    /// `fallback_name` (normally the file stem) names legacy templates and
    /// envelopes that lack a usable `name` entry.
    #[must_use]
    pub fn deserialize(text: &str, fallback_name: &str) -> Decoded {
        let Some(caps) = ENVELOPE_PATTERN.captures(text) else {
            return Decoded::Legacy(Template::new(fallback_name, text));
        };

        let metadata = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        let mut name = None;
        let mut expose = false;
        for (key, value) in metadata_entries(metadata) {
            match key {
                NAME_KEY => name = Some(value),
                EXPOSE_KEY => expose = value == "true",
                _ => {},
            }
        }

        let name = name
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback_name)
            .to_string();

        Decoded::Envelope(Template::new(name, body).with_expose_as_command(expose))
    }

    /// Returns the file name (`stem.extension`) for a template.
    #[must_use]
    pub fn file_name(template: &Template, extension: &str) -> String {
        format!("{}.{extension}", derive_file_stem(&template.name))
    }
}

/// Splits metadata into trimmed `key: value` pairs, skipping other lines.
fn metadata_entries(metadata: &str) -> impl Iterator<Item = (&str, &str)> {
    metadata.lines().filter_map(|line| {
        let (key, value) = line.split_once(':')?;
        Some((key.trim(), value.trim()))
    })
}
