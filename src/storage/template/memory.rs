//! In-memory template storage for testing.
//!
//! Keeps a tree of files and directories in a map, counts every mutating
//! call, and can be told to fail specific paths. The counters let tests
//! assert that a save performed no I/O at all.

use super::{Deletion, DirEntry, PathState, TemplateStorage};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    File(String),
    Directory,
}

/// Snapshot of mutating calls made against an [`InMemoryTemplateStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    /// Calls to `write`.
    pub writes: usize,
    /// Calls to `create`.
    pub creates: usize,
    /// Calls to `delete`.
    pub deletes: usize,
}

impl OperationCounts {
    /// Total number of mutating calls.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.writes + self.creates + self.deletes
    }
}

/// Map-backed storage with operation counters and failure injection.
///
/// # Example
///
/// ```rust
/// use std::path::Path;
/// use textplate::storage::{InMemoryTemplateStorage, TemplateStorage};
///
/// let storage = InMemoryTemplateStorage::new();
/// storage.insert_file("/t/a.md", "hello");
/// assert_eq!(storage.read(Path::new("/t/a.md")).unwrap(), "hello");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTemplateStorage {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    trash_dir: Option<PathBuf>,
    failing_reads: RwLock<HashSet<PathBuf>>,
    failing_writes: RwLock<HashSet<PathBuf>>,
    writes: AtomicUsize,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

fn lock_error() -> Error {
    Error::OperationFailed {
        operation: "memory_storage_lock".to_string(),
        cause: "lock poisoned".to_string(),
    }
}

fn injected(operation: &str, path: &Path) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: format!("{}: injected failure", path.display()),
    }
}

impl InMemoryTemplateStorage {
    /// Creates empty storage that deletes permanently.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves deleted files under `trash_dir`.
    #[must_use]
    pub fn with_trash_dir(mut self, trash_dir: impl Into<PathBuf>) -> Self {
        self.trash_dir = Some(trash_dir.into());
        self
    }

    /// Seeds a file (and its parent directories) without counting it.
    pub fn insert_file(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        let path = path.into();
        if let Ok(mut nodes) = self.nodes.write() {
            if let Some(parent) = path.parent() {
                Self::insert_dirs(&mut nodes, parent);
            }
            nodes.insert(path, Node::File(text.into()));
        }
    }

    /// Seeds a directory (and its parents).
    pub fn insert_dir(&self, path: impl AsRef<Path>) {
        if let Ok(mut nodes) = self.nodes.write() {
            Self::insert_dirs(&mut nodes, path.as_ref());
        }
    }

    fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Directory);
        }
    }

    /// Returns a file's content, if it exists.
    #[must_use]
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        let nodes = self.nodes.read().ok()?;
        match nodes.get(path.as_ref()) {
            Some(Node::File(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Returns the paths of all files directly inside `dir`, sorted.
    #[must_use]
    pub fn files_in(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        self.nodes.read().map_or_else(
            |_| Vec::new(),
            |nodes| {
                nodes
                    .iter()
                    .filter(|(path, node)| {
                        matches!(node, Node::File(_)) && path.parent() == Some(dir)
                    })
                    .map(|(path, _)| path.clone())
                    .collect()
            },
        )
    }

    /// Makes every `read` of `path` fail.
    pub fn fail_reads_of(&self, path: impl Into<PathBuf>) {
        if let Ok(mut set) = self.failing_reads.write() {
            set.insert(path.into());
        }
    }

    /// Makes every `write`, `create` and `delete` of `path` fail.
    pub fn fail_writes_to(&self, path: impl Into<PathBuf>) {
        if let Ok(mut set) = self.failing_writes.write() {
            set.insert(path.into());
        }
    }

    /// Returns the mutating calls made so far.
    #[must_use]
    pub fn counts(&self) -> OperationCounts {
        OperationCounts {
            writes: self.writes.load(Ordering::SeqCst),
            creates: self.creates.load(Ordering::SeqCst),
            deletes: self.deletes.load(Ordering::SeqCst),
        }
    }

    /// Resets the operation counters.
    pub fn reset_counts(&self) {
        self.writes.store(0, Ordering::SeqCst);
        self.creates.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }

    fn check_writable(&self, operation: &str, path: &Path) -> Result<()> {
        let failing = self.failing_writes.read().map_err(|_| lock_error())?;
        if failing.contains(path) {
            return Err(injected(operation, path));
        }
        Ok(())
    }

    fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
        path.parent()
            .is_some_and(|parent| matches!(nodes.get(parent), Some(Node::Directory)))
    }
}

impl TemplateStorage for InMemoryTemplateStorage {
    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let nodes = self.nodes.read().map_err(|_| lock_error())?;
        if !matches!(nodes.get(dir), Some(Node::Directory)) {
            return Err(Error::OperationFailed {
                operation: "list_template_dir".to_string(),
                cause: format!("{}: not a directory", dir.display()),
            });
        }

        Ok(nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| match node {
                Node::File(_) => DirEntry::file(path),
                Node::Directory => DirEntry::directory(path),
            })
            .collect())
    }

    fn read(&self, path: &Path) -> Result<String> {
        let failing = self.failing_reads.read().map_err(|_| lock_error())?;
        if failing.contains(path) {
            return Err(injected("read_template_file", path));
        }
        drop(failing);

        self.file(path).ok_or_else(|| Error::OperationFailed {
            operation: "read_template_file".to_string(),
            cause: format!("{}: no such file", path.display()),
        })
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable("write_template_file", path)?;

        let mut nodes = self.nodes.write().map_err(|_| lock_error())?;
        if matches!(nodes.get(path), Some(Node::Directory)) || !Self::parent_is_dir(&nodes, path) {
            return Err(Error::OperationFailed {
                operation: "write_template_file".to_string(),
                cause: format!("{}: not writable", path.display()),
            });
        }
        nodes.insert(path.to_path_buf(), Node::File(text.to_string()));
        Ok(())
    }

    fn create(&self, path: &Path, text: &str) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.check_writable("create_template_file", path)?;

        let mut nodes = self.nodes.write().map_err(|_| lock_error())?;
        if nodes.contains_key(path) || !Self::parent_is_dir(&nodes, path) {
            return Err(Error::OperationFailed {
                operation: "create_template_file".to_string(),
                cause: format!("{}: already exists or no parent", path.display()),
            });
        }
        nodes.insert(path.to_path_buf(), Node::File(text.to_string()));
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<Deletion> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_writable("delete_template_file", path)?;

        let mut nodes = self.nodes.write().map_err(|_| lock_error())?;
        let text = match nodes.get(path) {
            Some(Node::File(text)) => text.clone(),
            _ => {
                return Err(Error::OperationFailed {
                    operation: "delete_template_file".to_string(),
                    cause: format!("{}: no such file", path.display()),
                });
            },
        };
        nodes.remove(path);

        let Some(trash) = &self.trash_dir else {
            return Ok(Deletion::Removed);
        };

        Self::insert_dirs(&mut nodes, trash);
        let file_name = path.file_name().unwrap_or_default();
        let mut target = trash.join(file_name);
        let mut counter = 1_u32;
        while nodes.contains_key(&target) {
            target = trash.join(format!("{}-{counter}", file_name.to_string_lossy()));
            counter += 1;
        }
        nodes.insert(target.clone(), Node::File(text));
        Ok(Deletion::Trashed(target))
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(|_| lock_error())?;
        if let Some(blocking) = path
            .ancestors()
            .find(|a| matches!(nodes.get(*a), Some(Node::File(_))))
        {
            return Err(Error::OperationFailed {
                operation: "create_template_dir".to_string(),
                cause: format!("{}: is a file", blocking.display()),
            });
        }
        Self::insert_dirs(&mut nodes, path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> PathState {
        let Ok(nodes) = self.nodes.read() else {
            return PathState::Missing;
        };
        match nodes.get(path) {
            Some(Node::File(_)) => PathState::File,
            Some(Node::Directory) => PathState::Directory,
            None => PathState::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_file_creates_parents() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_file("/vault/templates/a.md", "x");
        assert_eq!(storage.exists(Path::new("/vault")), PathState::Directory);
        assert_eq!(
            storage.exists(Path::new("/vault/templates")),
            PathState::Directory
        );
        assert_eq!(
            storage.exists(Path::new("/vault/templates/a.md")),
            PathState::File
        );
    }

    #[test]
    fn test_list_entries_only_direct_children() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_file("/t/a.md", "a");
        storage.insert_file("/t/sub/b.md", "b");

        let entries = storage.list_entries(Path::new("/t")).unwrap();
        assert_eq!(
            entries,
            vec![DirEntry::file("/t/a.md"), DirEntry::directory("/t/sub")]
        );
    }

    #[test]
    fn test_counts_mutations() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_dir("/t");
        storage.create(Path::new("/t/a.md"), "1").unwrap();
        storage.write(Path::new("/t/a.md"), "2").unwrap();
        storage.delete(Path::new("/t/a.md")).unwrap();

        let counts = storage.counts();
        assert_eq!(
            counts,
            OperationCounts {
                writes: 1,
                creates: 1,
                deletes: 1
            }
        );
        assert_eq!(counts.total(), 3);

        storage.reset_counts();
        assert_eq!(storage.counts().total(), 0);
    }

    #[test]
    fn test_create_rejects_existing() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_file("/t/a.md", "1");
        assert!(storage.create(Path::new("/t/a.md"), "2").is_err());
        assert_eq!(storage.file("/t/a.md").as_deref(), Some("1"));
    }

    #[test]
    fn test_injected_failures() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_file("/t/a.md", "1");
        storage.fail_reads_of("/t/a.md");
        storage.fail_writes_to("/t/a.md");

        assert!(storage.read(Path::new("/t/a.md")).is_err());
        assert!(storage.write(Path::new("/t/a.md"), "2").is_err());
        assert!(storage.delete(Path::new("/t/a.md")).is_err());
        assert_eq!(storage.file("/t/a.md").as_deref(), Some("1"));
    }

    #[test]
    fn test_delete_into_trash() {
        let storage = InMemoryTemplateStorage::new().with_trash_dir("/t/.trash");
        storage.insert_file("/t/a.md", "first");
        storage.delete(Path::new("/t/a.md")).unwrap();
        storage.insert_file("/t/a.md", "second");
        let second = storage.delete(Path::new("/t/a.md")).unwrap();

        assert_eq!(storage.file("/t/.trash/a.md").as_deref(), Some("first"));
        assert_eq!(second, Deletion::Trashed(PathBuf::from("/t/.trash/a.md-1")));
        assert_eq!(storage.files_in("/t"), Vec::<PathBuf>::new());
    }

    #[test]
    fn test_create_dir_over_file_fails() {
        let storage = InMemoryTemplateStorage::new();
        storage.insert_file("/t", "i am a file");
        assert!(storage.create_dir(Path::new("/t")).is_err());
        assert!(storage.create_dir(Path::new("/t/nested")).is_err());
    }
}
