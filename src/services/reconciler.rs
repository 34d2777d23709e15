//! Template directory reconciliation.
//!
//! Loads a [`TemplateIndex`] from a directory holding one file per template
//! and writes the index back, touching only what changed:
//!
//! - files whose serialized form already matches are left alone
//! - missing files are created, stale ones rewritten
//! - files no longer backed by a template are deleted (or trashed)
//! - legacy files without an envelope are rewritten on load
//!
//! Both directions are best effort per file. A file that cannot be read,
//! written or deleted is recorded in the report and the cycle carries on.
//! Only problems with the directory itself fail the whole call.
//!
//! # Lifecycle
//!
//! ```text
//! UNINITIALIZED --(no dir)--> CREATED_EMPTY
//!       |                          |
//!       +------> LOADED <----------+
//!                  |  mutations
//!                  v
//!                SAVED --(next session)--> LOADED
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::instrument;

use super::template_codec::{TemplateCodec, derive_file_stem, file_stem_of};
use super::template_index::TemplateIndex;
use crate::storage::{Deletion, PathState, TemplateStorage};
use crate::{Error, Result};

/// A per-file problem recorded during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIssue {
    /// The file concerned.
    pub path: PathBuf,
    /// What was being attempted.
    pub operation: String,
    /// Why it did not work.
    pub cause: String,
}

impl FileIssue {
    fn new(path: &Path, operation: &str, cause: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for FileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.path.display(),
            self.operation,
            self.cause
        )
    }
}

/// Outcome of [`StoreReconciler::load_all`].
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// The loaded templates, in file-name order.
    pub index: TemplateIndex,
    /// Number of templates loaded.
    pub loaded: usize,
    /// Number of legacy files rewritten with an envelope.
    pub migrated: usize,
    /// Files that were skipped or could not be migrated.
    pub issues: Vec<FileIssue>,
    /// Whether the directory had to be created.
    pub created_directory: bool,
}

/// Two templates whose names map to the same file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemCollision {
    /// The shared stem.
    pub stem: String,
    /// Name of the template that was written.
    pub kept: String,
    /// Name of the template that was shadowed.
    pub shadowed: String,
}

/// Outcome of [`StoreReconciler::save_all`].
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Files created for new templates.
    pub created: usize,
    /// Files rewritten because their content changed.
    pub updated: usize,
    /// Files that already matched.
    pub unchanged: usize,
    /// Orphan files deleted or trashed.
    pub deleted: usize,
    /// Per-file failures.
    pub failures: Vec<FileIssue>,
    /// Stem collisions resolved by keeping the later template.
    pub collisions: Vec<StemCollision>,
    /// Orphan files left in place because deleting them could lose data.
    pub retained: Vec<FileIssue>,
}

impl SaveReport {
    /// Number of files created, rewritten or deleted.
    #[must_use]
    pub const fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Whether every file was handled without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} unchanged, {} deleted, {} failed",
            self.created,
            self.updated,
            self.unchanged,
            self.deleted,
            self.failures.len()
        )
    }
}

/// One file the save cycle wants on disk.
struct PlannedFile {
    stem: String,
    name: String,
    text: String,
}

/// Resets the busy flag when a cycle ends, even on early return.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronizes a [`TemplateIndex`] with a template directory.
pub struct StoreReconciler {
    storage: Arc<dyn TemplateStorage>,
    directory: PathBuf,
    extension: String,
    busy: AtomicBool,
}

impl fmt::Debug for StoreReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreReconciler")
            .field("directory", &self.directory)
            .field("extension", &self.extension)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl StoreReconciler {
    /// Creates a reconciler for `directory`, considering files with `extension`.
    ///
    /// The extension is given without the leading dot; one is stripped if present.
    #[must_use]
    pub fn new(
        storage: Arc<dyn TemplateStorage>,
        directory: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        let extension = extension.into();
        Self {
            storage,
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_string(),
            busy: AtomicBool::new(false),
        }
    }

    /// The template directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The recognized template file extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether a load or save cycle is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Path of the file backing a stem.
    #[must_use]
    pub fn path_for_stem(&self, stem: &str) -> PathBuf {
        self.directory.join(format!("{stem}.{}", self.extension))
    }

    fn begin(&self) -> Result<CycleGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| Error::Busy)?;
        Ok(CycleGuard(&self.busy))
    }

    /// Loads every template file in the directory.
    ///
    /// A missing directory is created and yields an empty index. Files that
    /// cannot be read are skipped; legacy files are migrated in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the path is a file or the
    /// directory cannot be created, [`Error::Busy`] if another cycle is
    /// running, or [`Error::OperationFailed`] if the directory cannot be
    /// listed.
    #[instrument(skip(self), fields(operation = "templates.load", dir = %self.directory.display()))]
    pub fn load_all(&self) -> Result<LoadReport> {
        let _guard = self.begin()?;
        let start = Instant::now();

        let mut report = LoadReport::default();
        if self.ensure_directory()? {
            tracing::info!("Created template directory");
            report.created_directory = true;
            return Ok(report);
        }

        for path in self.template_files()? {
            self.load_file(&path, &mut report);
        }

        tracing::info!(
            loaded = report.loaded,
            migrated = report.migrated,
            issues = report.issues.len(),
            "Loaded templates"
        );
        metrics::histogram!("template_sync_duration_ms", "direction" => "load")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        record_files("loaded", report.loaded);
        record_files("migrated", report.migrated);

        Ok(report)
    }

    fn load_file(&self, path: &Path, report: &mut LoadReport) {
        let Some(stem) = file_stem_of(path) else {
            tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
            report
                .issues
                .push(FileIssue::new(path, "read_template_file", "file name is not UTF-8"));
            return;
        };

        let text = match self.storage.read(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable template");
                report
                    .issues
                    .push(FileIssue::new(path, "read_template_file", e));
                return;
            },
        };

        let decoded = TemplateCodec::deserialize(&text, stem);
        let needs_migration = decoded.needs_migration();
        let template = decoded.into_template();

        if let Err(e) = template.validate() {
            tracing::warn!(path = %path.display(), error = %e, "Skipping template with invalid name");
            report.issues.push(FileIssue::new(path, "load_template", e));
            return;
        }

        if report.index.contains(&template.name) {
            tracing::warn!(
                path = %path.display(),
                name = %template.name,
                "Skipping template with duplicate name"
            );
            report.issues.push(FileIssue::new(
                path,
                "load_template",
                format!("duplicate template name '{}'", template.name),
            ));
            return;
        }

        if needs_migration {
            let migrated = TemplateCodec::serialize(&template);
            match self.storage.write(path, &migrated) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Migrated legacy template");
                    report.migrated += 1;
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to migrate legacy template");
                    report
                        .issues
                        .push(FileIssue::new(path, "migrate_template_file", e));
                },
            }
        }

        tracing::debug!(path = %path.display(), name = %template.name, "Loaded template");
        if report.index.upsert(template, false).is_ok() {
            report.loaded += 1;
        }
    }

    /// Writes the index to the directory.
    ///
    /// Unchanged files are not touched, so calling this twice in a row does
    /// no I/O beyond reads the second time. When two names share a stem the
    /// later template in index order wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the directory cannot be used,
    /// [`Error::Busy`] if another cycle is running, or
    /// [`Error::OperationFailed`] if the directory cannot be listed.
    #[instrument(skip(self, index), fields(operation = "templates.save", dir = %self.directory.display(), templates = index.len()))]
    pub fn save_all(&self, index: &TemplateIndex) -> Result<SaveReport> {
        let _guard = self.begin()?;
        let start = Instant::now();

        self.ensure_directory()?;

        let mut existing: HashMap<String, PathBuf> = self
            .template_files()?
            .into_iter()
            .filter_map(|path| file_stem_of(&path).map(|stem| (stem.to_string(), path.clone())))
            .collect();

        let mut report = SaveReport::default();
        let planned = Self::plan(index, &mut report.collisions);

        // Exact stems are claimed before case-folded ones, so a file that
        // belongs to one template is never rewritten for another.
        let mut targets: Vec<Option<PathBuf>> = planned
            .iter()
            .map(|file| existing.remove(&file.stem))
            .collect();
        for (file, target) in planned.iter().zip(targets.iter_mut()) {
            if target.is_none() {
                *target = claim_folded(&mut existing, &file.stem);
            }
        }

        let mut failed_stems: HashSet<String> = HashSet::new();
        for (file, target) in planned.iter().zip(targets) {
            let failures = report.failures.len();
            match target {
                Some(path) => self.update_file(&path, file, &mut report),
                None => self.create_file(file, &mut report),
            }
            if report.failures.len() > failures {
                failed_stems.insert(file.stem.to_lowercase());
            }
        }

        let mut orphans: Vec<(String, PathBuf)> = existing.into_iter().collect();
        orphans.sort_by(|a, b| a.1.cmp(&b.1));
        for (stem, path) in orphans {
            if failed_stems.contains(&stem.to_lowercase()) {
                tracing::warn!(path = %path.display(), "Keeping orphan that shares a stem with a failed write");
                report.retained.push(FileIssue::new(
                    &path,
                    "delete_template_file",
                    "shares a file stem with a template that failed to save",
                ));
                continue;
            }
            if let Some(issue) = self.check_orphan(&path, &stem) {
                tracing::warn!(%issue, "Keeping orphan that does not hold a valid template");
                report.retained.push(issue);
                continue;
            }
            self.delete_orphan(&path, &mut report);
        }

        if report.is_clean() {
            tracing::info!(%report, "Saved templates");
        } else {
            tracing::warn!(%report, "Saved templates with failures");
        }
        metrics::histogram!("template_sync_duration_ms", "direction" => "save")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        record_files("created", report.created);
        record_files("updated", report.updated);
        record_files("deleted", report.deleted);
        record_files("failed", report.failures.len());

        Ok(report)
    }

    /// Serializes the index, one entry per stem; the last template wins.
    fn plan(index: &TemplateIndex, collisions: &mut Vec<StemCollision>) -> Vec<PlannedFile> {
        let mut planned: Vec<PlannedFile> = Vec::with_capacity(index.len());
        let mut by_stem: HashMap<String, usize> = HashMap::new();

        for template in index {
            let stem = derive_file_stem(&template.name);
            let text = TemplateCodec::serialize(template);

            if let Some(&pos) = by_stem.get(&stem) {
                let entry = &mut planned[pos];
                tracing::warn!(
                    stem = %stem,
                    kept = %template.name,
                    shadowed = %entry.name,
                    "Template names share a file stem"
                );
                collisions.push(StemCollision {
                    stem,
                    kept: template.name.clone(),
                    shadowed: std::mem::replace(&mut entry.name, template.name.clone()),
                });
                entry.text = text;
                continue;
            }

            by_stem.insert(stem.clone(), planned.len());
            planned.push(PlannedFile {
                stem,
                name: template.name.clone(),
                text,
            });
        }

        planned
    }

    fn update_file(&self, path: &Path, planned: &PlannedFile, report: &mut SaveReport) {
        match self.storage.read(path) {
            Ok(current) if current == planned.text => {
                report.unchanged += 1;
                return;
            },
            Ok(_) => {},
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Rewriting unreadable template file");
            },
        }

        match self.storage.write(path, &planned.text) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), name = %planned.name, "Updated template file");
                report.updated += 1;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to update template file");
                report
                    .failures
                    .push(FileIssue::new(path, "write_template_file", e));
            },
        }
    }

    fn create_file(&self, planned: &PlannedFile, report: &mut SaveReport) {
        let path = self.path_for_stem(&planned.stem);
        match self.storage.create(&path, &planned.text) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), name = %planned.name, "Created template file");
                report.created += 1;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to create template file");
                report
                    .failures
                    .push(FileIssue::new(&path, "create_template_file", e));
            },
        }
    }

    /// Returns an issue if the orphan could not be loaded as a template.
    ///
    /// Such files never entered the index, so their absence from it says
    /// nothing about whether the user still wants them.
    fn check_orphan(&self, path: &Path, stem: &str) -> Option<FileIssue> {
        let text = match self.storage.read(path) {
            Ok(text) => text,
            Err(e) => return Some(FileIssue::new(path, "read_template_file", e)),
        };
        TemplateCodec::deserialize(&text, stem)
            .into_template()
            .validate()
            .err()
            .map(|e| FileIssue::new(path, "load_template", e))
    }

    fn delete_orphan(&self, path: &Path, report: &mut SaveReport) {
        match self.storage.delete(path) {
            Ok(Deletion::Trashed(target)) => {
                tracing::debug!(path = %path.display(), trash = %target.display(), "Trashed orphan template file");
                report.deleted += 1;
            },
            Ok(Deletion::Removed) => {
                tracing::debug!(path = %path.display(), "Deleted orphan template file");
                report.deleted += 1;
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to delete orphan template file");
                report
                    .failures
                    .push(FileIssue::new(path, "delete_template_file", e));
            },
        }
    }

    /// Makes sure the directory exists. Returns `true` if it was created.
    fn ensure_directory(&self) -> Result<bool> {
        match self.storage.exists(&self.directory) {
            PathState::Directory => Ok(false),
            PathState::File => Err(Error::Configuration(format!(
                "template path {} is a file, not a directory",
                self.directory.display()
            ))),
            PathState::Missing => match self.storage.create_dir(&self.directory) {
                Ok(()) => Ok(true),
                // Someone else created it between the check and our call.
                Err(_) if self.storage.exists(&self.directory) == PathState::Directory => {
                    Ok(false)
                },
                Err(e) => Err(Error::Configuration(format!(
                    "cannot create template directory {}: {e}",
                    self.directory.display()
                ))),
            },
        }
    }

    /// Template files directly inside the directory, sorted by path.
    fn template_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = self
            .storage
            .list_entries(&self.directory)?
            .into_iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.path)
            .filter(|path| {
                path.extension()
                    .and_then(std::ffi::OsStr::to_str)
                    .is_some_and(|ext| ext == self.extension)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

/// Takes the unclaimed file whose stem matches `stem` ignoring case.
///
/// Case-insensitive filesystems report `sig.md` when asked for `Sig.md`,
/// so a rename that only changes case has to rewrite the existing file.
fn claim_folded(existing: &mut HashMap<String, PathBuf>, stem: &str) -> Option<PathBuf> {
    let folded = stem.to_lowercase();
    let key = existing
        .keys()
        .filter(|candidate| candidate.to_lowercase() == folded)
        .min()?
        .clone();
    existing.remove(&key)
}

fn record_files(action: &'static str, count: usize) {
    if count > 0 {
        metrics::counter!("template_files_total", "action" => action)
            .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }
}
