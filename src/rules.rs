//! Rule engine: map each top-level pack entry to at most one handler.
//!
//! Exclusions are consulted first, wherever they appear in the list.  The
//! first positive rule that matches wins.  Patterns with a trailing `/`
//! only match directories; patterns containing `/` are matched against the
//! relative path, all others against the basename.
use std::collections::BTreeMap;
use std::path::PathBuf;

use glob::{MatchOptions, Pattern};

use crate::config::Rule;
use crate::error::ConfigError;
use crate::handlers::HandlerKind;
use crate::packs::{Pack, PackEntry};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A pack entry bound to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Pack name.
    pub pack: String,
    /// Absolute pack directory.
    pub pack_path: PathBuf,
    /// Path relative to the pack directory.
    pub relpath: String,
    /// Basename.
    pub filename: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Handler chosen by the first matching rule.
    pub handler: HandlerKind,
    /// Options of that rule.
    pub options: BTreeMap<String, String>,
}

impl Match {
    /// Absolute path of the matched entry.
    #[must_use]
    pub fn source(&self) -> PathBuf {
        self.pack_path.join(&self.relpath)
    }
}

#[derive(Debug)]
struct Compiled {
    rule: Rule,
    pattern: Pattern,
    on_relpath: bool,
}

impl Compiled {
    fn matches(&self, relpath: &str, filename: &str, is_dir: bool) -> bool {
        if self.rule.dirs_only() && !is_dir {
            return false;
        }
        let subject = if self.on_relpath { relpath } else { filename };
        self.pattern.matches_with(subject, MATCH_OPTIONS)
    }
}

/// A compiled, ordered rule list.
#[derive(Debug)]
pub struct RuleEngine {
    exclusions: Vec<Compiled>,
    positives: Vec<Compiled>,
}

impl RuleEngine {
    /// Compile `rules`, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a pattern that is not a
    /// valid glob.
    pub fn new(rules: &[Rule]) -> Result<Self, ConfigError> {
        let mut exclusions = Vec::new();
        let mut positives = Vec::new();
        for rule in rules {
            let body = rule.glob_body();
            let pattern = Pattern::new(body).map_err(|source| ConfigError::InvalidPattern {
                pattern: rule.pattern.clone(),
                source,
            })?;
            let compiled = Compiled {
                on_relpath: body.contains('/'),
                rule: rule.clone(),
                pattern,
            };
            if rule.is_exclusion() {
                exclusions.push(compiled);
            } else {
                positives.push(compiled);
            }
        }
        Ok(Self {
            exclusions,
            positives,
        })
    }

    /// The rule that claims an entry, or `None` if it is excluded or
    /// unmatched.
    #[must_use]
    pub fn classify(&self, relpath: &str, is_dir: bool) -> Option<&Rule> {
        let filename = relpath.rsplit('/').next().unwrap_or(relpath);
        if self
            .exclusions
            .iter()
            .any(|c| c.matches(relpath, filename, is_dir))
        {
            return None;
        }
        self.positives
            .iter()
            .find(|c| c.matches(relpath, filename, is_dir))
            .map(|c| &c.rule)
    }

    /// Match every entry of `pack`, in entry order.
    #[must_use]
    pub fn match_entries(&self, pack: &Pack, entries: &[PackEntry]) -> Vec<Match> {
        entries
            .iter()
            .filter_map(|entry| {
                let rule = self.classify(&entry.name, entry.is_dir)?;
                let handler = rule.handler?;
                Some(Match {
                    pack: pack.name.clone(),
                    pack_path: pack.path.clone(),
                    relpath: entry.name.clone(),
                    filename: entry.name.clone(),
                    is_dir: entry.is_dir,
                    handler,
                    options: rule.options.clone(),
                })
            })
            .collect()
    }
}
