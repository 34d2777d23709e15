//! User-facing notices and where they go.

use std::fmt;
use std::sync::Mutex;

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine confirmation.
    Info,
    /// Something needs attention but nothing was lost.
    Warning,
    /// An operation could not run.
    Error,
}

/// A short message for the person using the host editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Templates were loaded from disk.
    Loaded {
        /// Templates loaded.
        count: usize,
        /// Legacy files migrated.
        migrated: usize,
        /// Files skipped.
        skipped: usize,
    },
    /// The index was written to disk.
    Saved {
        /// Files created.
        created: usize,
        /// Files rewritten.
        updated: usize,
        /// Orphans removed.
        deleted: usize,
    },
    /// Some files could not be written or deleted.
    PartialFailure {
        /// Number of failed files.
        failed: usize,
        /// Description of the first failure.
        first: String,
    },
    /// The template directory is unusable; sync is off.
    ConfigurationError {
        /// What is wrong.
        message: String,
    },
    /// A name is already taken.
    Conflict {
        /// The contested name.
        name: String,
    },
    /// A template was inserted into the text.
    Inserted {
        /// The inserted template.
        name: String,
    },
}

impl Notice {
    /// Stable identifier for the notice kind.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Loaded { .. } => "loaded",
            Self::Saved { .. } => "saved",
            Self::PartialFailure { .. } => "partial_failure",
            Self::ConfigurationError { .. } => "configuration_error",
            Self::Conflict { .. } => "conflict",
            Self::Inserted { .. } => "inserted",
        }
    }

    /// How prominently the notice should be shown.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::Loaded { .. } | Self::Saved { .. } | Self::Inserted { .. } => Severity::Info,
            Self::PartialFailure { .. } | Self::Conflict { .. } => Severity::Warning,
            Self::ConfigurationError { .. } => Severity::Error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded {
                count,
                migrated,
                skipped,
            } => {
                write!(f, "Loaded {count} template(s)")?;
                if *migrated > 0 {
                    write!(f, ", migrated {migrated}")?;
                }
                if *skipped > 0 {
                    write!(f, ", skipped {skipped}")?;
                }
                Ok(())
            },
            Self::Saved {
                created,
                updated,
                deleted,
            } => write!(
                f,
                "Saved templates ({created} created, {updated} updated, {deleted} removed)"
            ),
            Self::PartialFailure { failed, first } => {
                write!(f, "{failed} template file(s) could not be saved: {first}")
            },
            Self::ConfigurationError { message } => {
                write!(f, "Template sync disabled: {message}")
            },
            Self::Conflict { name } => write!(f, "A template named '{name}' already exists"),
            Self::Inserted { name } => write!(f, "Inserted '{name}'"),
        }
    }
}

/// Receives notices. Delivery is fire-and-forget.
pub trait ReportSink: Send + Sync {
    /// Shows or records a notice.
    fn notify(&self, notice: &Notice);
}

/// Forwards notices to `tracing` at a level matching their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReportSink;

impl ReportSink for TracingReportSink {
    fn notify(&self, notice: &Notice) {
        let kind = notice.event_type();
        match notice.severity() {
            Severity::Info => tracing::info!(notice = kind, "{notice}"),
            Severity::Warning => tracing::warn!(notice = kind, "{notice}"),
            Severity::Error => tracing::error!(notice = kind, "{notice}"),
        }
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingReportSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the notices received so far.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    /// Removes and returns the notices received so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|mut notices| std::mem::take(&mut *notices))
            .unwrap_or_default()
    }
}

impl ReportSink for CollectingReportSink {
    fn notify(&self, notice: &Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice.clone());
        }
    }
}
