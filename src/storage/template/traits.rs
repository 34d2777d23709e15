//! Template storage trait definition.

use std::path::{Path, PathBuf};

use crate::Result;

/// What currently occupies a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    /// Nothing exists at the path.
    Missing,
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// A direct child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Creates a file entry.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
        }
    }

    /// Creates a directory entry.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Whether the entry is a regular file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// How a file was deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// Moved to a recoverable location.
    Trashed(PathBuf),
    /// Removed permanently.
    Removed,
}

/// Directory-oriented storage the template reconciler runs against.
///
/// Implementations wrap whatever the host offers: the local filesystem,
/// an editor's vault API, or an in-memory tree for tests.
pub trait TemplateStorage: Send + Sync {
    /// Lists the direct children of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>>;

    /// Reads a file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    fn read(&self, path: &Path) -> Result<String>;

    /// Overwrites an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, text: &str) -> Result<()>;

    /// Creates a new file.
    ///
    /// # Errors
    ///
    /// Returns an error if something already exists at `path` or the file
    /// cannot be written.
    fn create(&self, path: &Path, text: &str) -> Result<()>;

    /// Deletes a file, moving it to a trash location when one is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed or moved.
    fn delete(&self, path: &Path) -> Result<Deletion>;

    /// Creates a directory and any missing parents.
    ///
    /// Succeeds if the directory already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Reports what occupies `path`.
    fn exists(&self, path: &Path) -> PathState;
}
