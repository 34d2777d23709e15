//! Template manager.
//!
//! Owns the authoritative [`TemplateIndex`] for a host session. Every
//! mutation is applied in memory first and then persisted through the
//! [`StoreReconciler`]; the host learns about outcomes through its
//! [`ReportSink`].
//!
//! When the template directory turns out to be unusable the manager keeps
//! working in memory with sync switched off until the next successful
//! [`load`](TemplateManager::load).

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::reconciler::{LoadReport, SaveReport, StoreReconciler};
use super::template_index::{TemplateIndex, Upserted};
use super::trigger::{TriggerCooldown, TriggerMatch, scan_trigger};
use crate::config::TextplateConfig;
use crate::host::{Notice, ReportSink, TextSurface};
use crate::models::Template;
use crate::storage::FilesystemTemplateStorage;
use crate::{Error, Result};

/// Application-level owner of the template index.
pub struct TemplateManager {
    reconciler: StoreReconciler,
    sink: Arc<dyn ReportSink>,
    index: TemplateIndex,
    cooldown: TriggerCooldown,
    sync_enabled: bool,
}

impl std::fmt::Debug for TemplateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateManager")
            .field("reconciler", &self.reconciler)
            .field("templates", &self.index.len())
            .field("cooldown", &self.cooldown)
            .field("sync_enabled", &self.sync_enabled)
            .finish_non_exhaustive()
    }
}

impl TemplateManager {
    /// Creates a manager with an empty index.
    #[must_use]
    pub fn new(reconciler: StoreReconciler, sink: Arc<dyn ReportSink>, cooldown: Duration) -> Self {
        Self {
            reconciler,
            sink,
            index: TemplateIndex::new(),
            cooldown: TriggerCooldown::new(cooldown),
            sync_enabled: true,
        }
    }

    /// Creates a filesystem-backed manager from configuration.
    #[must_use]
    pub fn from_config(config: &TextplateConfig, sink: Arc<dyn ReportSink>) -> Self {
        let storage = match config.trash_dir() {
            Some(trash) => FilesystemTemplateStorage::new().with_trash_dir(trash),
            None => FilesystemTemplateStorage::new(),
        };
        let reconciler = StoreReconciler::new(
            Arc::new(storage),
            config.template_dir.clone(),
            config.extension.clone(),
        );
        Self::new(reconciler, sink, config.cooldown)
    }

    /// The underlying reconciler.
    #[must_use]
    pub const fn reconciler(&self) -> &StoreReconciler {
        &self.reconciler
    }

    /// Whether mutations are currently written to disk.
    #[must_use]
    pub const fn is_sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    /// Replaces the index with the directory contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the directory is unusable; sync
    /// is then disabled and the current index is kept. Returns
    /// [`Error::Busy`] if a cycle is already running.
    pub fn load(&mut self) -> Result<LoadReport> {
        match self.reconciler.load_all() {
            Ok(report) => {
                self.index = report.index.clone();
                self.sync_enabled = true;
                self.sink.notify(&Notice::Loaded {
                    count: report.loaded,
                    migrated: report.migrated,
                    skipped: report.issues.len(),
                });
                Ok(report)
            },
            Err(e) => Err(self.handle_cycle_error(e)),
        }
    }

    /// Writes the index to disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SyncDisabled`] after a configuration error,
    /// [`Error::Configuration`] if the directory became unusable, or
    /// [`Error::Busy`] if a cycle is already running. Per-file failures are
    /// not errors; they are in the report and announced as
    /// [`Notice::PartialFailure`].
    pub fn persist(&mut self) -> Result<SaveReport> {
        if !self.sync_enabled {
            return Err(Error::SyncDisabled);
        }

        let report = self
            .reconciler
            .save_all(&self.index)
            .map_err(|e| self.handle_cycle_error(e))?;

        match report.failures.first() {
            None => self.sink.notify(&Notice::Saved {
                created: report.created,
                updated: report.updated,
                deleted: report.deleted,
            }),
            Some(first) => self.sink.notify(&Notice::PartialFailure {
                failed: report.failures.len(),
                first: first.to_string(),
            }),
        }

        Ok(report)
    }

    fn handle_cycle_error(&mut self, e: Error) -> Error {
        if let Error::Configuration(message) = &e {
            tracing::error!(error = %e, "Disabling template sync");
            self.sync_enabled = false;
            self.sink.notify(&Notice::ConfigurationError {
                message: message.clone(),
            });
        }
        e
    }

    /// Persists after a mutation. `None` means sync is disabled.
    fn sync(&mut self) -> Result<Option<SaveReport>> {
        match self.persist() {
            Ok(report) => Ok(Some(report)),
            Err(Error::SyncDisabled) => {
                tracing::debug!("Template sync disabled, change kept in memory");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    /// Adds a template, or replaces one when `allow_overwrite` is set.
    ///
    /// New templates are always exposed as commands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid name and
    /// [`Error::Conflict`] if the name is taken and overwriting was not
    /// allowed. The index is unchanged in both cases. Persistence errors
    /// are returned after the index has been updated.
    pub fn create(
        &mut self,
        name: &str,
        content: &str,
        allow_overwrite: bool,
    ) -> Result<Option<SaveReport>> {
        let template = Template::new(name, content).with_expose_as_command(true);
        template.validate()?;
        let name = template.name.clone();

        match self.index.upsert(template, allow_overwrite) {
            Ok(Upserted::Inserted) => tracing::info!(name = %name, "Created template"),
            Ok(Upserted::Replaced) => tracing::info!(name = %name, "Replaced template"),
            Err(e) => return Err(self.report_conflict(e)),
        }

        self.sync()
    }

    /// Updates the template called `original`, possibly renaming it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown `original`,
    /// [`Error::InvalidInput`] for an invalid new name, or
    /// [`Error::Conflict`] if the new name belongs to another template.
    pub fn edit(&mut self, original: &str, name: &str, content: &str) -> Result<Option<SaveReport>> {
        let expose = self
            .index
            .find(original)
            .map(|t| t.expose_as_command)
            .ok_or_else(|| Error::NotFound(original.to_string()))?;

        let template = Template::new(name, content).with_expose_as_command(expose);
        template.validate()?;
        let name = template.name.clone();

        self.index
            .rename(original, template)
            .map_err(|e| self.report_conflict(e))?;
        tracing::info!(original = %original, name = %name, "Updated template");

        self.sync()
    }

    /// Removes a template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no template has this name.
    pub fn delete(&mut self, name: &str) -> Result<Option<SaveReport>> {
        self.index.remove(name)?;
        tracing::info!(name = %name, "Deleted template");
        self.sync()
    }

    fn report_conflict(&self, e: Error) -> Error {
        if let Error::Conflict { name } = &e {
            self.sink.notify(&Notice::Conflict { name: name.clone() });
        }
        e
    }

    /// Finds a template by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.index.find(name)
    }

    /// All templates in index order.
    #[must_use]
    pub const fn templates(&self) -> &TemplateIndex {
        &self.index
    }

    /// Templates whose name contains `query`, ignoring case.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Template> {
        self.index.filter(query)
    }

    /// Templates the host should register as commands.
    #[must_use]
    pub fn commands(&self) -> Vec<&Template> {
        self.index.commands()
    }

    /// Looks for a trigger before the cursor.
    ///
    /// Returns `None` while the post-insertion cooldown is active.
    #[must_use]
    pub fn detect_trigger(&self, line: &str, cursor: usize, now: Instant) -> Option<TriggerMatch> {
        if self.cooldown.is_suppressed(now) {
            return None;
        }
        scan_trigger(line, cursor)
    }

    /// Replaces the trigger with the content of template `name`.
    ///
    /// Starts the cooldown so the inserted text is not scanned again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown template, or the surface
    /// error if the trigger range is no longer valid.
    pub fn accept_trigger(
        &mut self,
        found: &TriggerMatch,
        name: &str,
        surface: &mut dyn TextSurface,
        now: Instant,
    ) -> Result<()> {
        self.splice(name, surface, found.start, found.end)?;
        self.cooldown.suppress(now);
        Ok(())
    }

    /// Inserts the content of template `name` at character offset `at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown template, or the surface
    /// error if `at` is outside the text.
    pub fn insert(&mut self, name: &str, surface: &mut dyn TextSurface, at: usize) -> Result<()> {
        self.splice(name, surface, at, at)?;
        self.cooldown.suppress(Instant::now());
        Ok(())
    }

    fn splice(
        &self,
        name: &str,
        surface: &mut dyn TextSurface,
        start: usize,
        end: usize,
    ) -> Result<()> {
        let template = self
            .index
            .find(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        surface.replace_range(start, end, &template.content)?;
        tracing::debug!(name = %name, start, end, "Inserted template");
        self.sink.notify(&Notice::Inserted {
            name: name.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CollectingReportSink, LineBuffer};
    use crate::services::TemplateCodec;
    use crate::storage::{InMemoryTemplateStorage, PathState, TemplateStorage};
    use std::path::Path;

    const DIR: &str = "/vault/templates";

    struct Fixture {
        storage: Arc<InMemoryTemplateStorage>,
        sink: Arc<CollectingReportSink>,
        manager: TemplateManager,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(InMemoryTemplateStorage::new());
        let sink = Arc::new(CollectingReportSink::new());
        let reconciler = StoreReconciler::new(storage.clone(), DIR, "md");
        let manager = TemplateManager::new(reconciler, sink.clone(), Duration::from_millis(100));
        Fixture {
            storage,
            sink,
            manager,
        }
    }

    fn loaded() -> Fixture {
        let mut f = fixture();
        f.manager.load().unwrap();
        f.sink.drain();
        f
    }

    #[test]
    fn test_load_notifies() {
        let mut f = fixture();
        f.storage.insert_file(
            Path::new(DIR).join("a.md"),
            TemplateCodec::serialize(&Template::new("a", "A")),
        );

        let report = f.manager.load().unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(f.manager.templates().len(), 1);
        assert_eq!(
            f.sink.notices(),
            vec![Notice::Loaded {
                count: 1,
                migrated: 0,
                skipped: 0
            }]
        );
    }

    #[test]
    fn test_create_persists() {
        let mut f = loaded();
        let report = f.manager.create("sig", "  Regards  ", false).unwrap().unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(f.manager.get("sig").unwrap().content, "Regards");
        assert!(f.storage.file(Path::new(DIR).join("sig.md")).is_some());
        assert_eq!(f.sink.notices()[0].event_type(), "saved");
    }

    #[test]
    fn test_create_duplicate_is_conflict() {
        let mut f = loaded();
        f.manager.create("sig", "one", false).unwrap();
        f.sink.drain();
        let before = f.manager.templates().clone();

        let err = f.manager.create("sig", "two", false).unwrap_err();
        assert!(matches!(err, Error::Conflict { ref name } if name == "sig"));
        assert_eq!(f.manager.templates(), &before);
        assert_eq!(
            f.sink.notices(),
            vec![Notice::Conflict {
                name: "sig".to_string()
            }]
        );

        f.manager.create("sig", "two", true).unwrap();
        assert_eq!(f.manager.get("sig").unwrap().content, "two");
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let mut f = loaded();
        assert!(matches!(
            f.manager.create("   ", "x", false),
            Err(Error::InvalidInput(_))
        ));
        assert!(f.manager.templates().is_empty());
    }

    #[test]
    fn test_edit_renames_and_keeps_flag() {
        let mut f = loaded();
        f.storage.insert_file(
            Path::new(DIR).join("old.md"),
            TemplateCodec::serialize(&Template::new("old", "x").with_expose_as_command(false)),
        );
        f.manager.load().unwrap();

        f.manager.edit("old", "new", "y").unwrap();
        let template = f.manager.get("new").unwrap();
        assert_eq!(template.content, "y");
        assert!(!template.expose_as_command);
        assert!(f.manager.get("old").is_none());
        assert!(f.storage.file(Path::new(DIR).join("old.md")).is_none());
        assert!(f.storage.file(Path::new(DIR).join("new.md")).is_some());
    }

    #[test]
    fn test_edit_onto_other_name_conflicts() {
        let mut f = loaded();
        f.manager.create("a", "1", false).unwrap();
        f.manager.create("b", "2", false).unwrap();

        assert!(matches!(
            f.manager.edit("a", "b", "3"),
            Err(Error::Conflict { .. })
        ));
        assert_eq!(f.manager.get("a").unwrap().content, "1");
        assert!(matches!(
            f.manager.edit("missing", "c", "3"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_removes_file() {
        let mut f = loaded();
        f.manager.create("a", "1", false).unwrap();

        let report = f.manager.delete("a").unwrap().unwrap();
        assert_eq!(report.deleted, 1);
        assert!(f.storage.files_in(DIR).is_empty());
        assert!(matches!(f.manager.delete("a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_configuration_error_disables_sync() {
        let mut f = fixture();
        f.storage.insert_file(DIR, "not a directory");

        assert!(matches!(f.manager.load(), Err(Error::Configuration(_))));
        assert!(!f.manager.is_sync_enabled());
        assert_eq!(f.sink.notices()[0].event_type(), "configuration_error");

        // Still usable in memory.
        assert!(f.manager.create("a", "1", false).unwrap().is_none());
        assert!(f.manager.get("a").is_some());
        assert!(matches!(f.manager.persist(), Err(Error::SyncDisabled)));
        assert_eq!(f.storage.exists(Path::new(DIR)), PathState::File);
    }

    #[test]
    fn test_partial_failure_notice() {
        let mut f = loaded();
        f.storage.fail_writes_to(Path::new(DIR).join("a.md"));

        let report = f.manager.create("a", "1", false).unwrap().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(f.manager.get("a").is_some());
        assert_eq!(f.sink.notices()[0].event_type(), "partial_failure");
    }

    #[test]
    fn test_search_and_commands() {
        let mut f = loaded();
        f.manager.create("Meeting notes", "1", false).unwrap();
        f.manager.create("signature", "2", false).unwrap();

        let names: Vec<_> = f.manager.search("MEET").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Meeting notes"]);
        assert_eq!(f.manager.commands().len(), 2);
    }

    #[test]
    fn test_accept_trigger_replaces_and_starts_cooldown() {
        let mut f = loaded();
        f.manager.create("sig", "Regards !!x", false).unwrap();
        f.sink.drain();

        let mut buffer = LineBuffer::new("Bye !!si", 8);
        let now = Instant::now();
        let found = f.manager.detect_trigger(buffer.text(), buffer.cursor(), now).unwrap();
        assert_eq!(found.query, "si");

        f.manager.accept_trigger(&found, "sig", &mut buffer, now).unwrap();
        assert_eq!(buffer.text(), "Bye Regards !!x");
        assert_eq!(buffer.cursor(), 15);
        assert_eq!(
            f.sink.notices(),
            vec![Notice::Inserted {
                name: "sig".to_string()
            }]
        );

        // The inserted body contains a marker but the cooldown hides it.
        assert!(f.manager.detect_trigger(buffer.text(), buffer.cursor(), now).is_none());
        let later = now + Duration::from_millis(150);
        assert!(f.manager.detect_trigger(buffer.text(), buffer.cursor(), later).is_some());
    }

    #[test]
    fn test_accept_unknown_template() {
        let mut f = loaded();
        let mut buffer = LineBuffer::new("!!x", 3);
        let found = scan_trigger(buffer.text(), 3).unwrap();
        assert!(matches!(
            f.manager.accept_trigger(&found, "x", &mut buffer, Instant::now()),
            Err(Error::NotFound(_))
        ));
        assert_eq!(buffer.text(), "!!x");
    }

    #[test]
    fn test_insert_at_cursor() {
        let mut f = loaded();
        f.manager.create("sig", "Regards", false).unwrap();

        let mut buffer = LineBuffer::new("Hi  there", 3);
        f.manager.insert("sig", &mut buffer, 3).unwrap();
        assert_eq!(buffer.text(), "Hi Regards there");
    }
}
