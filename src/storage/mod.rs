//! Storage layer.

pub mod template;

pub use template::{
    Deletion, DirEntry, EntryKind, FilesystemTemplateStorage, InMemoryTemplateStorage,
    OperationCounts, PathState, TemplateStorage,
};
