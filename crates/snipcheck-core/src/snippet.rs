//! Snippet definitions and selection filters.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::capture::Output;
use crate::error::{HarnessError, Result};
use crate::fixture::Fixture;

/// Executable body of a snippet. Its only input is the output writer.
pub type SnippetBody = Arc<dyn Fn(&mut Output) -> anyhow::Result<()> + Send + Sync>;

/// One named, independently executable unit of demonstration code.
///
/// Created by [`SnippetRegistry::register`](crate::SnippetRegistry::register)
/// and immutable afterwards.
#[derive(Clone)]
pub struct Snippet {
    id: String,
    ordinal: usize,
    body: SnippetBody,
    expected: Option<Fixture>,
    tags: BTreeSet<String>,
}

impl Snippet {
    pub(crate) fn new(
        id: String,
        ordinal: usize,
        body: SnippetBody,
        expected: Option<Fixture>,
        tags: BTreeSet<String>,
    ) -> Self {
        Self {
            id,
            ordinal,
            body,
            expected,
            tags,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registration position; defines run order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn body(&self) -> SnippetBody {
        Arc::clone(&self.body)
    }

    pub fn expected(&self) -> Option<&Fixture> {
        self.expected.as_ref()
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

impl fmt::Debug for Snippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snippet")
            .field("id", &self.id)
            .field("ordinal", &self.ordinal)
            .field("expected", &self.expected.as_ref().map(Fixture::len))
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Predicate selecting snippets for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetFilter {
    /// Exact snippet identifier.
    Name(String),

    /// Snippets carrying this tag.
    Tag(String),

    /// Identifier or tag equal to the value.
    NameOrTag(String),
}

impl SnippetFilter {
    /// Parse `tag:<t>`, `name:<id>` or a bare `<tag-or-name>`.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(HarnessError::config("filter must not be empty"));
        }

        let filter = match raw.split_once(':') {
            Some(("tag", value)) => SnippetFilter::Tag(value.trim().to_string()),
            Some(("name", value)) | Some(("id", value)) => {
                SnippetFilter::Name(value.trim().to_string())
            }
            Some((prefix, _)) => {
                return Err(HarnessError::config(format!(
                    "unknown filter prefix '{prefix}' (expected 'tag:' or 'name:')"
                )))
            }
            None => SnippetFilter::NameOrTag(raw.to_string()),
        };

        if filter.value().is_empty() {
            return Err(HarnessError::config(format!("filter '{raw}' has no value")));
        }
        Ok(filter)
    }

    fn value(&self) -> &str {
        match self {
            SnippetFilter::Name(v) | SnippetFilter::Tag(v) | SnippetFilter::NameOrTag(v) => v,
        }
    }

    pub fn matches(&self, snippet: &Snippet) -> bool {
        match self {
            SnippetFilter::Name(id) => snippet.id() == id,
            SnippetFilter::Tag(tag) => snippet.has_tag(tag),
            SnippetFilter::NameOrTag(value) => snippet.id() == value || snippet.has_tag(value),
        }
    }
}

impl fmt::Display for SnippetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetFilter::Name(v) => write!(f, "name:{v}"),
            SnippetFilter::Tag(v) => write!(f, "tag:{v}"),
            SnippetFilter::NameOrTag(v) => write!(f, "{v}"),
        }
    }
}
