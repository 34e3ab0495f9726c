//! Expected-output fixtures and line-level comparison.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{HarnessError, Result};

/// How captured lines are compared against a fixture.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Byte-for-byte equality per line.
    #[default]
    Exact,

    /// Ignore trailing whitespace on both sides before comparing a line.
    TrimTrailingWhitespace,
}

impl MatchMode {
    fn line_eq(self, expected: &str, actual: &str) -> bool {
        match self {
            MatchMode::Exact => expected == actual,
            MatchMode::TrimTrailingWhitespace => expected.trim_end() == actual.trim_end(),
        }
    }
}

/// First point at which captured output diverges from its fixture.
///
/// A side is `None` when that sequence ended before `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiff {
    pub index: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: expected ", self.index)?;
        match &self.expected {
            Some(line) => write!(f, "{line:?}")?,
            None => write!(f, "<end of output>")?,
        }
        write!(f, ", got ")?;
        match &self.actual {
            Some(line) => write!(f, "{line:?}"),
            None => write!(f, "<end of output>"),
        }
    }
}

/// The expected output of a snippet, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixture {
    lines: Vec<String>,
}

impl Fixture {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse fixture text: one expected line per line, final newline optional.
    pub fn parse(text: &str) -> Self {
        Self::from_lines(text.lines())
    }

    /// Read a UTF-8 fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| HarnessError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// SHA-256 hex of the newline-joined lines.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for line in &self.lines {
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Compare captured lines against this fixture.
    ///
    /// Returns `None` on a match, otherwise the first mismatching line.
    pub fn compare(&self, actual: &[String], mode: MatchMode) -> Option<LineDiff> {
        let longest = self.lines.len().max(actual.len());
        (0..longest).find_map(|index| {
            let expected = self.lines.get(index);
            let got = actual.get(index);
            match (expected, got) {
                (Some(e), Some(a)) if mode.line_eq(e, a) => None,
                _ => Some(LineDiff {
                    index,
                    expected: expected.cloned(),
                    actual: got.cloned(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_with_and_without_trailing_newline() {
        assert_eq!(Fixture::parse("3\n7\n10\n").lines(), &["3", "7", "10"]);
        assert_eq!(Fixture::parse("3\n7\n10").lines(), &["3", "7", "10"]);
        assert!(Fixture::parse("").is_empty());
    }

    #[test]
    fn test_compare_match() {
        let fixture = Fixture::from_lines(["3", "7", "10"]);
        assert_eq!(fixture.compare(&lines(&["3", "7", "10"]), MatchMode::Exact), None);
    }

    #[test]
    fn test_compare_reports_first_mismatch() {
        let fixture = Fixture::from_lines(["3", "7", "10"]);
        let diff = fixture
            .compare(&lines(&["3", "7", "9"]), MatchMode::Exact)
            .expect("should differ");
        assert_eq!(diff.index, 2);
        assert_eq!(diff.expected.as_deref(), Some("10"));
        assert_eq!(diff.actual.as_deref(), Some("9"));
    }

    #[test]
    fn test_compare_missing_and_extra_lines() {
        let fixture = Fixture::from_lines(["a", "b"]);

        let short = fixture.compare(&lines(&["a"]), MatchMode::Exact).unwrap();
        assert_eq!(short.index, 1);
        assert_eq!(short.actual, None);

        let long = fixture
            .compare(&lines(&["a", "b", "c"]), MatchMode::Exact)
            .unwrap();
        assert_eq!(long.index, 2);
        assert_eq!(long.expected, None);
        assert_eq!(long.actual.as_deref(), Some("c"));
    }

    #[test]
    fn test_trailing_whitespace_only_ignored_when_configured() {
        let fixture = Fixture::from_lines(["ok"]);
        let actual = lines(&["ok  "]);
        assert!(fixture.compare(&actual, MatchMode::Exact).is_some());
        assert!(fixture
            .compare(&actual, MatchMode::TrimTrailingWhitespace)
            .is_none());
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = Fixture::from_lines(["3", "7", "10"]);
        let b = Fixture::parse("3\n7\n10\n");
        let c = Fixture::from_lines(["3", "7", "9"]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("add.expected");
        std::fs::write(&path, "3\n7\n10\n").unwrap();
        let fixture = Fixture::load(&path).unwrap();
        assert_eq!(fixture.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Fixture::load("/definitely/not/here.expected").unwrap_err();
        assert!(matches!(err, HarnessError::Fixture { .. }));
    }

    #[test]
    fn test_line_diff_display() {
        let diff = LineDiff {
            index: 2,
            expected: Some("10".into()),
            actual: None,
        };
        assert_eq!(diff.to_string(), "line 2: expected \"10\", got <end of output>");
    }
}
