//! Ordered snippet registry.
//!
//! Single-writer: all registration happens before a run starts, after which
//! the registry is only read. It is not synchronized internally.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::capture::Output;
use crate::error::{HarnessError, Result};
use crate::fixture::Fixture;
use crate::snippet::{Snippet, SnippetFilter};

/// Ordered mapping from snippet identifier to snippet.
#[derive(Debug, Default)]
pub struct SnippetRegistry {
    snippets: Vec<Arc<Snippet>>,
    index: HashMap<String, usize>,
}

impl SnippetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snippet at the end of the run order.
    ///
    /// Fails with [`HarnessError::DuplicateSnippet`] if `id` is taken; the
    /// registry is left unchanged in that case.
    pub fn register<F>(
        &mut self,
        id: impl Into<String>,
        body: F,
        expected: Option<Fixture>,
        tags: &[&str],
    ) -> Result<&Arc<Snippet>>
    where
        F: Fn(&mut Output) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(HarnessError::config("snippet id must not be empty"));
        }
        if self.index.contains_key(&id) {
            return Err(HarnessError::DuplicateSnippet { id });
        }

        let ordinal = self.snippets.len();
        let tags: BTreeSet<String> = tags.iter().map(|t| t.to_string()).collect();
        debug!(snippet = %id, ordinal, fixture = expected.is_some(), "Registered snippet");

        self.index.insert(id.clone(), ordinal);
        self.snippets.push(Arc::new(Snippet::new(
            id,
            ordinal,
            Arc::new(body),
            expected,
            tags,
        )));
        Ok(&self.snippets[ordinal])
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Snippet>> {
        self.index.get(id).map(|&i| &self.snippets[i])
    }

    /// Snippets matching `filter` (all when `None`), in registration order.
    ///
    /// The returned iterator is lazy; clone it to iterate again from the start.
    pub fn list<'a>(&'a self, filter: Option<&'a SnippetFilter>) -> Selection<'a> {
        Selection {
            inner: self.snippets.iter(),
            filter,
        }
    }

    /// Distinct tags across all snippets, sorted.
    pub fn tags(&self) -> BTreeSet<&str> {
        self.snippets
            .iter()
            .flat_map(|s| s.tags().iter().map(String::as_str))
            .collect()
    }
}

/// Lazy, restartable view over a registry selection.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    inner: std::slice::Iter<'a, Arc<Snippet>>,
    filter: Option<&'a SnippetFilter>,
}

impl<'a> Iterator for Selection<'a> {
    type Item = &'a Arc<Snippet>;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner
            .by_ref()
            .find(|s| filter.map_or(true, |f| f.matches(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_out: &mut Output) -> anyhow::Result<()> {
        Ok(())
    }

    fn sample() -> SnippetRegistry {
        let mut registry = SnippetRegistry::new();
        registry.register("vars", noop, None, &["day1"]).unwrap();
        registry
            .register("loops", noop, None, &["day4", "loops"])
            .unwrap();
        registry
            .register("labelled", noop, None, &["day4", "loops"])
            .unwrap();
        registry
    }

    #[test]
    fn test_register_preserves_order() {
        let registry = sample();
        let ids: Vec<&str> = registry.list(None).map(|s| s.id()).collect();
        assert_eq!(ids, vec!["vars", "loops", "labelled"]);
        let ordinals: Vec<usize> = registry.list(None).map(|s| s.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_rejected_and_count_unchanged() {
        let mut registry = sample();
        let err = registry.register("loops", noop, None, &[]).unwrap_err();
        assert!(matches!(err, HarnessError::DuplicateSnippet { ref id } if id == "loops"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_empty_id_rejected() {
        let mut registry = SnippetRegistry::new();
        assert!(registry.register("  ", noop, None, &[]).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_filtered_and_restartable() {
        let registry = sample();
        let filter = SnippetFilter::Tag("loops".into());
        let selection = registry.list(Some(&filter));

        let first: Vec<&str> = selection.clone().map(|s| s.id()).collect();
        let second: Vec<&str> = selection.map(|s| s.id()).collect();
        assert_eq!(first, vec!["loops", "labelled"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_and_tags() {
        let registry = sample();
        assert_eq!(registry.get("labelled").unwrap().ordinal(), 2);
        assert!(registry.get("missing").is_none());
        let tags: Vec<&str> = registry.tags().into_iter().collect();
        assert_eq!(tags, vec!["day1", "day4", "loops"]);
    }
}
