//! Business logic services.
//!
//! Services build on the storage backends and provide the high-level
//! template operations a host needs.

mod manager;
mod reconciler;
mod template_codec;
mod template_index;
mod trigger;

pub use manager::TemplateManager;
pub use reconciler::{FileIssue, LoadReport, SaveReport, StemCollision, StoreReconciler};
pub use template_codec::{Decoded, MAX_STEM_LEN, TemplateCodec, derive_file_stem, file_stem_of};
pub use template_index::{TemplateIndex, Upserted};
pub use trigger::{DEFAULT_COOLDOWN, TRIGGER_MARKER, TriggerCooldown, TriggerMatch, scan_trigger};
