//! Path exclusion filter used while walking source trees.
//!
//! Patterns are shell-style globs matched against an entry's base name:
//! `*` matches any run of characters inside one segment, `?` matches exactly
//! one character. An entry is excluded as soon as any pattern matches.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{OpaLinkError, Result};

/// Predicate consulted once per visited filesystem entry.
pub trait PathFilter {
    fn excluded(&self, path: &Path, is_dir: bool, depth: usize) -> bool;
}

/// Filter that never excludes anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl PathFilter for NoFilter {
    fn excluded(&self, _path: &Path, _is_dir: bool, _depth: usize) -> bool {
        false
    }
}

/// Compiled ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreSet {
    /// Compile `patterns`. An invalid glob is reported as a load error.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());
        for p in patterns {
            let p = p.as_ref();
            let glob = GlobBuilder::new(p)
                .literal_separator(true)
                .build()
                .map_err(|e| OpaLinkError::Load(format!("invalid ignore pattern {p:?}: {e}")))?;
            builder.add(glob);
            kept.push(p.to_string());
        }
        let set = builder
            .build()
            .map_err(|e| OpaLinkError::Load(format!("invalid ignore patterns: {e}")))?;
        Ok(Self { patterns: kept, set })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PathFilter for IgnoreSet {
    fn excluded(&self, path: &Path, _is_dir: bool, _depth: usize) -> bool {
        if self.set.is_empty() {
            return false;
        }
        // Roots are not exempt; a path without a base name just cannot match.
        match path.file_name() {
            Some(name) => self.set.is_match(Path::new(name)),
            None => false,
        }
    }
}
