//! Rule values, validation, and derivation from `[mappings]`.
use std::collections::BTreeMap;

use super::Mappings;
use super::toml_loader::RawRule;
use crate::error::ConfigError;
use crate::handlers::{HandlerKind, Placement};

/// Hidden files that are never deployed, whatever the rule list says.
pub const STOP_LIST: &[&str] = &[".git", ".DS_Store", ".gitignore"];

/// A validated pattern → handler mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Glob pattern without the leading `!` of an exclusion.
    pub pattern: String,
    /// `None` for exclusions.
    pub handler: Option<HandlerKind>,
    /// Handler options.
    pub options: BTreeMap<String, String>,
}

impl Rule {
    /// A positive rule with no options.
    #[must_use]
    pub fn new(pattern: impl Into<String>, handler: HandlerKind) -> Self {
        Self {
            pattern: pattern.into(),
            handler: Some(handler),
            options: BTreeMap::new(),
        }
    }

    /// An exclusion rule.
    #[must_use]
    pub fn exclude(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            handler: None,
            options: BTreeMap::new(),
        }
    }

    /// Whether this rule drops matching entries.
    #[must_use]
    pub const fn is_exclusion(&self) -> bool {
        self.handler.is_none()
    }

    /// Whether the pattern only matches directories.
    #[must_use]
    pub fn dirs_only(&self) -> bool {
        self.pattern.ends_with('/')
    }

    /// The glob body: the pattern with any trailing `/` removed.
    #[must_use]
    pub fn glob_body(&self) -> &str {
        self.pattern.trim_end_matches('/')
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.handler {
            None => write!(f, "!{}", self.pattern),
            Some(h) if self.options.is_empty() => write!(f, "{} -> {h}", self.pattern),
            Some(h) => {
                let opts: Vec<String> = self
                    .options
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                write!(f, "{} -> {h} [{}]", self.pattern, opts.join(", "))
            }
        }
    }
}

/// Returns `true` if `pattern` contains glob metacharacters.
#[must_use]
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Check that `pattern` compiles as a glob.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPattern`] if it does not.
pub fn check_pattern(pattern: &str) -> Result<(), ConfigError> {
    glob::Pattern::new(pattern.trim_start_matches('!').trim_end_matches('/'))
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Validate a `[[rules]]` entry.
///
/// # Errors
///
/// Returns a [`ConfigError`] for an unknown or missing handler, an invalid
/// glob, or a `placement` option the shell handler does not accept.
pub fn validate(raw: &RawRule) -> Result<Rule, ConfigError> {
    check_pattern(&raw.pattern)?;
    if let Some(body) = raw.pattern.strip_prefix('!') {
        return Ok(Rule::exclude(body));
    }
    let name = raw
        .handler
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConfigError::MissingHandler {
            pattern: raw.pattern.clone(),
        })?;
    let handler: HandlerKind = name.parse().map_err(|()| ConfigError::UnknownHandler {
        pattern: raw.pattern.clone(),
        handler: name.to_string(),
    })?;
    if let Some(value) = raw.options.get("placement")
        && value.parse::<Placement>().is_err()
    {
        return Err(ConfigError::InvalidOption {
            pattern: raw.pattern.clone(),
            option: "placement".to_string(),
            value: value.clone(),
        });
    }
    Ok(Rule {
        pattern: raw.pattern.clone(),
        handler: Some(handler),
        options: raw.options.clone(),
    })
}

/// Validate a list of raw rules.
///
/// # Errors
///
/// Returns the first validation error.
pub fn validate_all(raw: &[RawRule]) -> Result<Vec<Rule>, ConfigError> {
    raw.iter().map(validate).collect()
}

/// Exclusions every rule list starts with: the protocol files and the stop
/// list.
#[must_use]
pub fn builtin_exclusions(pack_config: &str, ignore_file: &str) -> Vec<Rule> {
    [pack_config, ignore_file]
        .into_iter()
        .chain(STOP_LIST.iter().copied())
        .map(Rule::exclude)
        .collect()
}

/// Derive the positive rules from `[mappings]`.
///
/// Ordered as exact names, then globs, then directory patterns, then the
/// `*` catch-all to the symlink handler.
#[must_use]
pub fn derive(mappings: &Mappings) -> Vec<Rule> {
    let mut candidates: Vec<Rule> = Vec::new();
    if !mappings.install.is_empty() {
        candidates.push(Rule::new(&mappings.install, HandlerKind::Install));
    }
    if !mappings.homebrew.is_empty() {
        candidates.push(Rule::new(&mappings.homebrew, HandlerKind::Homebrew));
    }
    for pattern in &mappings.shell {
        candidates.push(Rule::new(pattern, HandlerKind::Shell));
    }
    if !mappings.path.is_empty() {
        let dir = mappings.path.trim_end_matches('/');
        candidates.push(Rule::new(format!("{dir}/"), HandlerKind::Path));
    }

    let (dirs, files): (Vec<Rule>, Vec<Rule>) = candidates.into_iter().partition(Rule::dirs_only);
    let (globs, exact): (Vec<Rule>, Vec<Rule>) =
        files.into_iter().partition(|r| is_glob(&r.pattern));

    let mut rules = exact;
    rules.extend(globs);
    rules.extend(dirs);
    rules.push(Rule::new("*", HandlerKind::Symlink));
    rules
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn raw(pattern: &str, handler: Option<&str>) -> RawRule {
        RawRule {
            pattern: pattern.to_string(),
            handler: handler.map(String::from),
            options: BTreeMap::new(),
        }
    }

    #[test]
    fn validate_exclusion_strips_bang() {
        let rule = validate(&raw("!*.bak", None)).unwrap();
        assert!(rule.is_exclusion());
        assert_eq!(rule.pattern, "*.bak");
    }

    #[test]
    fn validate_unknown_handler() {
        let err = validate(&raw("x", Some("teleport"))).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHandler { .. }));
    }

    #[test]
    fn validate_missing_handler() {
        let err = validate(&raw("x", None)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHandler { .. }));
        let err = validate(&raw("x", Some(""))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingHandler { .. }));
    }

    #[test]
    fn validate_bad_glob() {
        let err = validate(&raw("[oops", Some("symlink"))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn validate_bad_placement() {
        let mut r = raw("env.sh", Some("shell"));
        r.options.insert("placement".into(), "sometimes".into());
        let err = validate(&r).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { .. }));
    }

    #[test]
    fn derive_orders_exact_glob_dir_catchall() {
        let mappings = Mappings {
            path: "bin".into(),
            install: "install.sh".into(),
            homebrew: "Brewfile".into(),
            shell: vec!["*aliases.sh".into(), "profile.sh".into()],
            ignore: vec![],
        };
        let rules: Vec<String> = derive(&mappings).iter().map(ToString::to_string).collect();
        assert_eq!(
            rules,
            vec![
                "install.sh -> install",
                "Brewfile -> homebrew",
                "profile.sh -> shell",
                "*aliases.sh -> shell",
                "bin/ -> path",
                "* -> symlink",
            ]
        );
    }

    #[test]
    fn derive_skips_empty_mappings() {
        let mappings = Mappings {
            path: String::new(),
            install: String::new(),
            homebrew: String::new(),
            shell: vec![],
            ignore: vec![],
        };
        let rules = derive(&mappings);
        assert_eq!(rules, vec![Rule::new("*", HandlerKind::Symlink)]);
    }

    #[test]
    fn builtin_exclusions_cover_protocol_files() {
        let names: Vec<String> = builtin_exclusions(".dodot.toml", ".dodotignore")
            .into_iter()
            .map(|r| r.pattern)
            .collect();
        assert_eq!(
            names,
            vec![".dodot.toml", ".dodotignore", ".git", ".DS_Store", ".gitignore"]
        );
    }
}
