//! Template storage backends.
//!
//! The reconciler only talks to [`TemplateStorage`], a narrow
//! directory-oriented contract. Two backends ship with the crate:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`FilesystemTemplateStorage`] | Local directories, optional trash folder |
//! | [`InMemoryTemplateStorage`] | Tests and embedding without a filesystem |

mod filesystem;
mod memory;
mod traits;

pub use filesystem::FilesystemTemplateStorage;
pub use memory::{InMemoryTemplateStorage, OperationCounts};
pub use traits::{Deletion, DirEntry, EntryKind, PathState, TemplateStorage};
