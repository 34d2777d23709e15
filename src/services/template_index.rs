//! In-memory template index.
//!
//! Holds the authoritative set of templates in insertion order. Lookups are
//! exact and case-sensitive; [`TemplateIndex::filter`] is a case-insensitive
//! substring search used for completions and pickers.

use crate::models::Template;
use crate::{Error, Result};

/// Outcome of a successful [`TemplateIndex::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// A new template was appended.
    Inserted,
    /// An existing template was replaced in place.
    Replaced,
}

/// Ordered collection of templates with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateIndex {
    templates: Vec<Template>,
}

impl TemplateIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            templates: Vec::new(),
        }
    }

    /// Number of templates.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the index holds no templates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterates templates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    /// Returns the template names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name.as_str()).collect()
    }

    /// Finds a template by exact name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// Whether a template with this exact name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.templates.iter().position(|t| t.name == name)
    }

    /// Returns templates whose lowercased name contains the lowercased query.
    ///
    /// An empty query matches everything. Results keep insertion order.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<&Template> {
        let query = query.to_lowercase();
        self.templates
            .iter()
            .filter(|t| query.is_empty() || t.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Returns templates that should be exposed as host commands.
    #[must_use]
    pub fn commands(&self) -> Vec<&Template> {
        self.templates
            .iter()
            .filter(|t| t.expose_as_command)
            .collect()
    }

    /// Inserts a template or replaces the one with the same name.
    ///
    /// A replaced template keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] without touching the index when the name
    /// is taken and `allow_overwrite` is false.
    pub fn upsert(&mut self, template: Template, allow_overwrite: bool) -> Result<Upserted> {
        match self.position(&template.name) {
            Some(_) if !allow_overwrite => Err(Error::Conflict {
                name: template.name,
            }),
            Some(pos) => {
                self.templates[pos] = template;
                Ok(Upserted::Replaced)
            },
            None => {
                self.templates.push(template);
                Ok(Upserted::Inserted)
            },
        }
    }

    /// Replaces the template called `original`, possibly under a new name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `original` is absent, or
    /// [`Error::Conflict`] if the new name belongs to a different template.
    pub fn rename(&mut self, original: &str, template: Template) -> Result<()> {
        let pos = self
            .position(original)
            .ok_or_else(|| Error::NotFound(original.to_string()))?;

        if template.name != original && self.contains(&template.name) {
            return Err(Error::Conflict {
                name: template.name,
            });
        }

        self.templates[pos] = template;
        Ok(())
    }

    /// Removes a template by name, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no template has this name.
    pub fn remove(&mut self, name: &str) -> Result<Template> {
        let pos = self
            .position(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(self.templates.remove(pos))
    }
}

impl FromIterator<Template> for TemplateIndex {
    /// Builds an index, keeping the first template for each name.
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        let mut index = Self::new();
        for template in iter {
            let _ = index.upsert(template, false);
        }
        index
    }
}

impl<'a> IntoIterator for &'a TemplateIndex {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TemplateIndex {
        [
            Template::new("Meeting notes", "## Attendees"),
            Template::new("signature", "Regards"),
            Template::new("meeting-agenda", "1. Intro"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let index = sample();
        assert!(index.find("signature").is_some());
        assert!(index.find("Signature").is_none());
    }

    #[test]
    fn test_filter_keeps_insertion_order() {
        let index = sample();
        let names: Vec<_> = index.filter("meeting").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Meeting notes", "meeting-agenda"]);
    }

    #[test]
    fn test_filter_ignores_query_case() {
        let index = sample();
        assert_eq!(index.filter("MEETING").len(), 2);
        assert_eq!(index.filter("Sig").len(), 1);
    }

    #[test]
    fn test_filter_empty_query_matches_all() {
        assert_eq!(sample().filter("").len(), 3);
    }

    #[test]
    fn test_upsert_conflict_leaves_index_unchanged() {
        let mut index = sample();
        let before = index.clone();

        let err = index
            .upsert(Template::new("signature", "Other"), false)
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { ref name } if name == "signature"));
        assert_eq!(index, before);
        assert_eq!(index.find("signature").unwrap().content, "Regards");
    }

    #[test]
    fn test_upsert_overwrite_keeps_position() {
        let mut index = sample();
        let outcome = index
            .upsert(Template::new("signature", "Cheers"), true)
            .unwrap();
        assert_eq!(outcome, Upserted::Replaced);
        assert_eq!(index.names()[1], "signature");
        assert_eq!(index.find("signature").unwrap().content, "Cheers");
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_upsert_appends_new() {
        let mut index = sample();
        let outcome = index.upsert(Template::new("zeta", "z"), false).unwrap();
        assert_eq!(outcome, Upserted::Inserted);
        assert_eq!(index.names().last(), Some(&"zeta"));
    }

    #[test]
    fn test_remove() {
        let mut index = sample();
        let removed = index.remove("signature").unwrap();
        assert_eq!(removed.content, "Regards");
        assert_eq!(index.len(), 2);
        assert!(matches!(index.remove("signature"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rename_in_place() {
        let mut index = sample();
        index
            .rename("signature", Template::new("sig", "Regards"))
            .unwrap();
        assert_eq!(index.names(), vec!["Meeting notes", "sig", "meeting-agenda"]);
    }

    #[test]
    fn test_rename_onto_existing_name_conflicts() {
        let mut index = sample();
        let err = index
            .rename("signature", Template::new("meeting-agenda", "x"))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
        assert_eq!(index, sample());
    }

    #[test]
    fn test_rename_unknown() {
        let mut index = sample();
        assert!(matches!(
            index.rename("nope", Template::new("x", "y")),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_commands_only_exposed() {
        let mut index = sample();
        index
            .upsert(Template::new("hidden", "h").with_expose_as_command(false), false)
            .unwrap();
        assert_eq!(index.commands().len(), 3);
    }

    #[test]
    fn test_from_iter_keeps_first_duplicate() {
        let index: TemplateIndex = [Template::new("a", "first"), Template::new("a", "second")]
            .into_iter()
            .collect();
        assert_eq!(index.len(), 1);
        assert_eq!(index.find("a").unwrap().content, "first");
    }
}
