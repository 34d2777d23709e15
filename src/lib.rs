//! # Textplate
//!
//! File-backed text templates with in-editor trigger expansion.
//!
//! Templates are named snippets of text. Each one lives in its own file
//! inside a template directory, wrapped in a small front-matter envelope:
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
//! While editing, typing `!!` followed by part of a template name brings up
//! matching templates; accepting one replaces the typed trigger with the
//! template body.
//!
//! ## Components
//!
//! - [`services::TemplateCodec`] and [`services::derive_file_stem`] map records to files
//! - [`services::scan_trigger`] detects the `!!query` gesture at the cursor
//! - [`services::TemplateIndex`] holds the authoritative in-memory set
//! - [`services::StoreReconciler`] loads and saves the index against a directory
//! - [`services::TemplateManager`] ties them together for a host editor
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use textplate::config::TextplateConfig;
//! use textplate::host::TracingReportSink;
//! use textplate::services::TemplateManager;
//!
//! let config = TextplateConfig::load_default();
//! let mut manager = TemplateManager::from_config(&config, Arc::new(TracingReportSink));
//! manager.load()?;
//! manager.create("sig", "Regards,\nAda", false)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod host;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::TextplateConfig;
pub use models::Template;
pub use services::{
    LoadReport, SaveReport, StoreReconciler, TemplateCodec, TemplateIndex, TemplateManager,
    TriggerCooldown, TriggerMatch, derive_file_stem, scan_trigger,
};
pub use storage::{FilesystemTemplateStorage, InMemoryTemplateStorage, TemplateStorage};

/// Error type for textplate operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Blank or multi-line template names, malformed CLI arguments |
/// | `NotFound` | Looking up, editing or deleting an unknown template |
/// | `Conflict` | Creating a template whose name is already taken |
/// | `Configuration` | Template directory path is a file or cannot be created |
/// | `Busy` | A load or save cycle is already running |
/// | `SyncDisabled` | Persisting after a configuration error switched sync off |
/// | `OperationFailed` | A single storage call fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No template with the given name exists.
    #[error("template not found: {0}")]
    NotFound(String),

    /// A template with the given name already exists.
    ///
    /// Callers are expected to ask for confirmation and retry with
    /// overwrite allowed rather than treat this as a failure.
    #[error("a template named '{name}' already exists")]
    Conflict {
        /// The contested name.
        name: String,
    },

    /// The template directory is misconfigured.
    ///
    /// Raised when:
    /// - The configured path exists but is a regular file
    /// - The directory cannot be created
    /// - The configuration file cannot be read or parsed
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Another load or save cycle is in flight.
    #[error("a template sync cycle is already running")]
    Busy,

    /// File sync was switched off after a configuration error.
    #[error("template sync is disabled until the configuration is corrected")]
    SyncDisabled,

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for textplate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
