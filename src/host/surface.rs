//! Text insertion surfaces.

use crate::{Error, Result};

/// Something text can be spliced into, addressed by character offsets.
pub trait TextSurface {
    /// Replaces characters `start..end` with `text` and moves the cursor to
    /// just after the inserted text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the range is reversed or extends
    /// past the end of the text.
    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<()>;

    /// Current cursor position as a character offset.
    fn cursor(&self) -> usize;
}

/// An in-memory buffer holding a single line of text and a cursor.
///
/// # Example
///
/// ```rust
/// use textplate::host::{LineBuffer, TextSurface};
///
/// let mut buffer = LineBuffer::new("See !!sig now", 9);
/// buffer.replace_range(4, 9, "Regards").unwrap();
/// assert_eq!(buffer.text(), "See Regards now");
/// assert_eq!(buffer.cursor(), 11);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    cursor: usize,
}

impl LineBuffer {
    /// Creates a buffer; the cursor is clamped to the line length.
    #[must_use]
    pub fn new(text: impl Into<String>, cursor: usize) -> Self {
        let text = text.into();
        let cursor = cursor.min(text.chars().count());
        Self { text, cursor }
    }

    /// The buffer contents.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the buffer, returning its contents.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    fn byte_offset(&self, chars: usize) -> Option<usize> {
        if chars == self.text.chars().count() {
            return Some(self.text.len());
        }
        self.text.char_indices().nth(chars).map(|(i, _)| i)
    }
}

impl TextSurface for LineBuffer {
    fn replace_range(&mut self, start: usize, end: usize, text: &str) -> Result<()> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "range start {start} is after end {end}"
            )));
        }
        let (Some(from), Some(to)) = (self.byte_offset(start), self.byte_offset(end)) else {
            return Err(Error::InvalidInput(format!(
                "range {start}..{end} is outside the line"
            )));
        };

        self.text.replace_range(from..to, text);
        self.cursor = start + text.chars().count();
        Ok(())
    }

    fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_middle() {
        let mut buffer = LineBuffer::new("a !!x b", 4);
        buffer.replace_range(2, 5, "XYZ").unwrap();
        assert_eq!(buffer.text(), "a XYZ b");
        assert_eq!(buffer.cursor(), 5);
    }

    #[test]
    fn test_replace_at_end() {
        let mut buffer = LineBuffer::new("go !!sig", 8);
        buffer.replace_range(3, 8, "Regards").unwrap();
        assert_eq!(buffer.text(), "go Regards");
        assert_eq!(buffer.cursor(), 10);
    }

    #[test]
    fn test_replace_uses_char_offsets() {
        let mut buffer = LineBuffer::new("日本!!語 ok", 5);
        buffer.replace_range(2, 5, "→").unwrap();
        assert_eq!(buffer.text(), "日本→ ok");
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn test_multiline_insert_moves_cursor_past_text() {
        let mut buffer = LineBuffer::new("!!", 2);
        buffer.replace_range(0, 2, "a\nb").unwrap();
        assert_eq!(buffer.cursor(), 3);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut buffer = LineBuffer::new("abc", 0);
        assert!(matches!(
            buffer.replace_range(2, 9, "x"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            buffer.replace_range(2, 1, "x"),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(buffer.text(), "abc");
    }

    #[test]
    fn test_cursor_clamped_on_new() {
        assert_eq!(LineBuffer::new("ab", 10).cursor(), 2);
    }
}
