//! Filesystem-based template storage.
//!
//! Reads and writes template files with `std::fs`. Deleted files are moved
//! into a trash directory when one is configured, so a bad save can be
//! undone by hand.

use super::{Deletion, DirEntry, PathState, TemplateStorage};
use crate::current_timestamp;
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Local filesystem storage.
#[derive(Debug, Clone, Default)]
pub struct FilesystemTemplateStorage {
    /// Where deleted files are moved. `None` deletes permanently.
    trash_dir: Option<PathBuf>,
}

impl FilesystemTemplateStorage {
    /// Creates storage that deletes files permanently.
    #[must_use]
    pub const fn new() -> Self {
        Self { trash_dir: None }
    }

    /// Moves deleted files into `trash_dir` instead of removing them.
    #[must_use]
    pub fn with_trash_dir(mut self, trash_dir: impl Into<PathBuf>) -> Self {
        self.trash_dir = Some(trash_dir.into());
        self
    }

    /// Returns the trash directory, if any.
    #[must_use]
    pub fn trash_dir(&self) -> Option<&Path> {
        self.trash_dir.as_deref()
    }

    /// Picks a free path inside the trash for `path`.
    fn trash_target(trash: &Path, path: &Path) -> Result<PathBuf> {
        let file_name = path.file_name().ok_or_else(|| Error::OperationFailed {
            operation: "trash_template_file".to_string(),
            cause: format!("{} has no file name", path.display()),
        })?;

        let target = trash.join(file_name);
        if !target.exists() {
            return Ok(target);
        }

        let stem = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let timestamp = current_timestamp();

        let mut counter = 0_u32;
        loop {
            let candidate = if counter == 0 {
                trash.join(format!("{stem}-{timestamp}{extension}"))
            } else {
                trash.join(format!("{stem}-{timestamp}-{counter}{extension}"))
            };
            if !candidate.exists() {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

fn io_error(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{}: {e}", path.display()),
    }
}

impl TemplateStorage for FilesystemTemplateStorage {
    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let entries = fs::read_dir(dir).map_err(|e| io_error("list_template_dir", dir, &e))?;

        let mut result = Vec::new();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_file() {
                result.push(DirEntry::file(entry.path()));
            } else if file_type.is_dir() {
                result.push(DirEntry::directory(entry.path()));
            }
        }

        Ok(result)
    }

    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| io_error("read_template_file", path, &e))
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).map_err(|e| io_error("write_template_file", path, &e))
    }

    fn create(&self, path: &Path, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| io_error("create_template_file", path, &e))?;

        file.write_all(text.as_bytes())
            .map_err(|e| io_error("create_template_file", path, &e))
    }

    fn delete(&self, path: &Path) -> Result<Deletion> {
        let Some(trash) = &self.trash_dir else {
            fs::remove_file(path).map_err(|e| io_error("delete_template_file", path, &e))?;
            return Ok(Deletion::Removed);
        };

        fs::create_dir_all(trash).map_err(|e| io_error("create_trash_dir", trash, &e))?;
        let target = Self::trash_target(trash, path)?;
        fs::rename(path, &target).map_err(|e| io_error("trash_template_file", path, &e))?;

        Ok(Deletion::Trashed(target))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| io_error("create_template_dir", path, &e))
    }

    fn exists(&self, path: &Path) -> PathState {
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => PathState::Directory,
            Ok(_) => PathState::File,
            Err(_) => PathState::Missing,
        }
    }
}
