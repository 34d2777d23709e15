//! Trigger detection for insert-by-name.
//!
//! Typing `!!` followed by part of a template name, with no whitespace in
//! between, opens a completion for matching templates:
//!
//! ```text
//! See !!meet|
//!     ^^^^^^ start = 4, query = "meet", end = cursor
//! ```
//!
//! All offsets are character (Unicode scalar value) offsets into the line,
//! so queries in any script work the same way as ASCII ones.

use std::time::{Duration, Instant};

/// The two-character sequence that starts a trigger.
pub const TRIGGER_MARKER: &str = "!!";

/// Default suppression window after an accepted trigger.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(100);

/// A live trigger found before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// Character offset of the first `!` of the marker.
    pub start: usize,
    /// Character offset of the cursor.
    pub end: usize,
    /// Text typed between the marker and the cursor (may be empty).
    pub query: String,
}

impl TriggerMatch {
    /// Number of characters covered by the marker and query.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the match covers no characters. Never true for a real match.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Scans `line` up to `cursor` for a trigger.
///
/// Only the trailing run of non-whitespace characters before the cursor is
/// considered; the last `!!` inside that run is the marker and everything
/// after it is the query. A cursor past the end of the line is clamped.
///
/// # Examples
///
/// ```rust
/// use textplate::scan_trigger;
///
/// let found = scan_trigger("See !!meeting-notes for details", 19).unwrap();
/// assert_eq!(found.start, 4);
/// assert_eq!(found.query, "meeting-notes");
///
/// assert!(scan_trigger("Hello !", 7).is_none());
/// ```
#[must_use]
pub fn scan_trigger(line: &str, cursor: usize) -> Option<TriggerMatch> {
    let before: Vec<char> = line.chars().take(cursor).collect();
    let end = before.len();

    let run_start = before
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |pos| pos + 1);
    let run = &before[run_start..];

    let marker: Vec<char> = TRIGGER_MARKER.chars().collect();
    let offset = run
        .windows(marker.len())
        .rposition(|window| window == marker.as_slice())?;

    let start = run_start + offset;
    let query = before[start + marker.len()..].iter().collect();

    Some(TriggerMatch { start, end, query })
}

/// Suppresses trigger detection for a short window after an insertion.
///
/// Without this, re-scanning the line right after the template body is
/// inserted could pick up a `!!` inside that body as a new trigger.
/// Each call to [`suppress`](Self::suppress) replaces the previous deadline.
#[derive(Debug, Clone)]
pub struct TriggerCooldown {
    window: Duration,
    until: Option<Instant>,
}

impl Default for TriggerCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl TriggerCooldown {
    /// Creates a cooldown with the given window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    /// Returns the suppression window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Starts (or restarts) the suppression window at `now`.
    pub fn suppress(&mut self, now: Instant) {
        self.until = now.checked_add(self.window);
    }

    /// Whether detections observed at `now` must be discarded.
    #[must_use]
    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    /// Ends any active suppression.
    pub const fn clear(&mut self) {
        self.until = None;
    }
}
