//! Non-fatal configuration checks.
//!
//! Hard errors (bad TOML, unknown handlers, invalid globs) are raised while
//! loading.  The checks here flag configurations that load fine but probably
//! do not do what the user meant.
use super::Config;

/// A validation warning detected after configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The section or key that triggered the warning (e.g. `rules`).
    pub source: String,
    /// The specific item.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    #[must_use]
    fn new(source: impl Into<String>, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}': {}", self.source, self.item, self.message)
    }
}

/// Check a resolved configuration and return any warnings.
#[must_use]
pub fn validate(config: &Config) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut catchall_seen = false;
    for rule in config.rules().iter().filter(|r| !r.is_exclusion()) {
        if catchall_seen {
            warnings.push(ValidationWarning::new(
                "rules",
                &rule.pattern,
                "unreachable: follows the '*' catch-all",
            ));
        }
        if rule.pattern == "*" {
            catchall_seen = true;
        }
    }

    for path in &config.protected_paths {
        if path.starts_with('/') || path.starts_with('~') {
            warnings.push(ValidationWarning::new(
                "protected_paths",
                path,
                "entries are relative to $HOME; leading '/' or '~' never matches",
            ));
        }
    }

    for name in &config.force_home {
        if name.contains('/') {
            warnings.push(ValidationWarning::new(
                "force_home",
                name,
                "entries are top-level names and cannot contain '/'",
            ));
        }
    }

    warnings
}
