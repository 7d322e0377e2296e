//! Layered configuration: embedded defaults ≺ root config ≺ pack config.
//!
//! List-valued keys (`pack_ignore`, `protected_paths`, `force_home`,
//! `mappings.shell`, ignore globs) append with de-duplication, keeping the
//! first occurrence.  Scalar mappings override.  `[[rules]]` at the root
//! replaces the derived rule list; `[[rules]]` in a pack config is
//! prepended so pack rules win over global ones.
pub mod rule;
pub mod toml_loader;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::filesystem::FileSystemOps;
pub use rule::Rule;
use toml_loader::{RawConfig, load_config, parse_str};

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Root config file names, in order of preference.
pub const ROOT_CONFIG_NAMES: &[&str] = &[".dodot.toml", "dodot.toml"];

/// Names of the per-pack protocol files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialFiles {
    /// Per-pack config file (default `.dodot.toml`).
    pub pack_config: String,
    /// Pack ignore sentinel (default `.dodotignore`).
    pub ignore_file: String,
}

/// Resolved `[mappings]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mappings {
    /// Directory name for the PATH handler.
    pub path: String,
    /// Install script file name.
    pub install: String,
    /// Brewfile name.
    pub homebrew: String,
    /// Shell snippet patterns.
    pub shell: Vec<String>,
    /// Extra file exclusions.
    pub ignore: Vec<String>,
}

/// Fully resolved configuration for the root, or for one pack.
#[derive(Debug, Clone)]
pub struct Config {
    /// Globs on pack directory names to skip.
    pub pack_ignore: Vec<String>,
    /// File-level ignore globs inside packs (`[pack] ignore`).
    pub file_ignore: Vec<String>,
    /// Home-relative paths never written.
    pub protected_paths: Vec<String>,
    /// Names deployed to `$HOME/.<name>`.
    pub force_home: Vec<String>,
    /// Protocol file names.
    pub special_files: SpecialFiles,
    /// Handler mappings.
    pub mappings: Mappings,
    explicit_rules: Option<Vec<Rule>>,
    pack_rules: Vec<Rule>,
    rules: Vec<Rule>,
}

impl Config {
    /// The embedded defaults layer alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded document fails validation.
    pub fn defaults() -> Result<Self, ConfigError> {
        let raw: RawConfig = parse_str(DEFAULTS_TOML, Path::new("<embedded defaults>"))?;
        let mut config = Self {
            pack_ignore: Vec::new(),
            file_ignore: Vec::new(),
            protected_paths: Vec::new(),
            force_home: Vec::new(),
            special_files: SpecialFiles {
                pack_config: String::new(),
                ignore_file: String::new(),
            },
            mappings: Mappings {
                path: String::new(),
                install: String::new(),
                homebrew: String::new(),
                shell: Vec::new(),
                ignore: Vec::new(),
            },
            explicit_rules: None,
            pack_rules: Vec::new(),
            rules: Vec::new(),
        };
        config.apply_layer(&raw, Layer::Root)?;
        Ok(config)
    }

    /// Load defaults plus the root config found in `dotfiles_root`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a config file is unreadable, is not
    /// valid TOML, or contains an invalid rule.
    pub fn load(dotfiles_root: &Path, fs: &dyn FileSystemOps) -> Result<Self, ConfigError> {
        let mut config = Self::defaults()?;
        if let Some(path) = root_config_path(dotfiles_root, fs) {
            let raw: RawConfig = load_config(fs, &path)?;
            config.apply_layer(&raw, Layer::Root)?;
        }
        Ok(config)
    }

    /// Resolve the configuration for one pack by layering its config on top.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the pack config contains an invalid
    /// rule or pattern.
    pub fn for_pack(&self, raw: &RawConfig) -> Result<Self, ConfigError> {
        let mut config = self.clone();
        config.apply_layer(raw, Layer::Pack)?;
        Ok(config)
    }

    /// The ordered rule list the engine evaluates.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Whether `name` (with or without a leading dot) is in `force_home`.
    #[must_use]
    pub fn is_force_home(&self, name: &str) -> bool {
        let key = name.trim_start_matches('.');
        self.force_home
            .iter()
            .any(|f| f.trim_start_matches('.') == key)
    }

    fn apply_layer(&mut self, raw: &RawConfig, layer: Layer) -> Result<(), ConfigError> {
        for pattern in raw
            .patterns
            .pack_ignore
            .iter()
            .chain(&raw.pack.ignore)
            .chain(&raw.mappings.ignore)
        {
            rule::check_pattern(pattern)?;
        }

        append_dedup(&mut self.pack_ignore, &raw.patterns.pack_ignore);
        append_dedup(&mut self.file_ignore, &raw.pack.ignore);
        append_dedup(&mut self.force_home, &raw.symlink.force_home);
        append_dedup(&mut self.force_home, &raw.link_paths.force_home);
        append_dedup(&mut self.protected_paths, &raw.symlink.protected_paths);
        append_dedup(&mut self.protected_paths, &raw.link_paths.protected_paths);
        append_dedup(&mut self.protected_paths, &raw.security.protected_paths);

        override_scalar(&mut self.special_files.pack_config, raw.special_files.pack_config.as_ref());
        override_scalar(&mut self.special_files.ignore_file, raw.special_files.ignore_file.as_ref());
        override_scalar(&mut self.mappings.path, raw.mappings.path.as_ref());
        override_scalar(&mut self.mappings.install, raw.mappings.install.as_ref());
        override_scalar(&mut self.mappings.homebrew, raw.mappings.homebrew.as_ref());
        append_dedup(&mut self.mappings.shell, &raw.mappings.shell);
        append_dedup(&mut self.mappings.ignore, &raw.mappings.ignore);

        if let Some(raw_rules) = &raw.rules {
            let rules = rule::validate_all(raw_rules)?;
            match layer {
                Layer::Root => self.explicit_rules = Some(rules),
                Layer::Pack => {
                    let mut combined = rules;
                    combined.append(&mut self.pack_rules);
                    self.pack_rules = combined;
                }
            }
        }

        self.rebuild_rules();
        Ok(())
    }

    fn rebuild_rules(&mut self) {
        let mut rules = rule::builtin_exclusions(
            &self.special_files.pack_config,
            &self.special_files.ignore_file,
        );
        rules.extend(
            self.file_ignore
                .iter()
                .chain(&self.mappings.ignore)
                .map(Rule::exclude),
        );
        rules.extend(self.pack_rules.iter().cloned());
        match &self.explicit_rules {
            Some(explicit) => rules.extend(explicit.iter().cloned()),
            None => rules.extend(rule::derive(&self.mappings)),
        }
        let mut seen = Vec::with_capacity(rules.len());
        for r in rules {
            if !seen.contains(&r) {
                seen.push(r);
            }
        }
        self.rules = seen;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Root,
    Pack,
}

/// Locate the root config file, preferring the dot-prefixed name.
#[must_use]
pub fn root_config_path(dotfiles_root: &Path, fs: &dyn FileSystemOps) -> Option<PathBuf> {
    ROOT_CONFIG_NAMES
        .iter()
        .map(|name| dotfiles_root.join(name))
        .find(|p| fs.exists(p))
}

/// Append `src` to `dst`, skipping entries already present.
pub(crate) fn append_dedup(dst: &mut Vec<String>, src: &[String]) {
    for item in src {
        if !dst.contains(item) {
            dst.push(item.clone());
        }
    }
}

fn override_scalar(dst: &mut String, src: Option<&String>) {
    if let Some(value) = src {
        dst.clone_from(value);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::filesystem::MockFileSystemOps;
    use crate::handlers::HandlerKind;

    fn pack_layer(text: &str) -> RawConfig {
        parse_str(text, Path::new("pack.toml")).unwrap()
    }

    fn rule_strings(config: &Config) -> Vec<String> {
        config.rules().iter().map(ToString::to_string).collect()
    }

    // -----------------------------------------------------------------------
    // Defaults
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_populate_every_field() {
        let c = Config::defaults().unwrap();
        assert_eq!(c.special_files.pack_config, ".dodot.toml");
        assert_eq!(c.special_files.ignore_file, ".dodotignore");
        assert_eq!(c.mappings.install, "install.sh");
        assert!(c.is_force_home("vimrc"));
        assert!(c.is_force_home(".ssh"));
        assert!(c.protected_paths.contains(&".ssh/authorized_keys".to_string()));
        assert!(c.pack_ignore.contains(&"node_modules".to_string()));
    }

    #[test]
    fn default_rules_end_with_catchall() {
        let c = Config::defaults().unwrap();
        let last = c.rules().last().unwrap();
        assert_eq!(last.pattern, "*");
        assert_eq!(last.handler, Some(HandlerKind::Symlink));
    }

    // -----------------------------------------------------------------------
    // Root layer
    // -----------------------------------------------------------------------

    #[test]
    fn no_root_config_is_defaults() {
        let fs = MockFileSystemOps::new();
        let c = Config::load(Path::new("/dots"), &fs).unwrap();
        assert_eq!(rule_strings(&c), rule_strings(&Config::defaults().unwrap()));
    }

    #[test]
    fn dot_prefixed_root_config_is_preferred() {
        let fs = MockFileSystemOps::new()
            .with_file("/dots/.dodot.toml", "[mappings]\ninstall = \"setup.sh\"\n")
            .with_file("/dots/dodot.toml", "[mappings]\ninstall = \"other.sh\"\n");
        let c = Config::load(Path::new("/dots"), &fs).unwrap();
        assert_eq!(c.mappings.install, "setup.sh");
    }

    #[test]
    fn plain_root_config_is_used_when_alone() {
        let fs = MockFileSystemOps::new()
            .with_file("/dots/dodot.toml", "[mappings]\ninstall = \"other.sh\"\n");
        let c = Config::load(Path::new("/dots"), &fs).unwrap();
        assert_eq!(c.mappings.install, "other.sh");
    }

    #[test]
    fn root_lists_append_with_dedup() {
        let fs = MockFileSystemOps::new().with_file(
            "/dots/.dodot.toml",
            "[symlink]\nforce_home = [\"ssh\", \"weechat\"]\n[security]\nprotected_paths = [\".netrc\", \".secret\"]\n",
        );
        let c = Config::load(Path::new("/dots"), &fs).unwrap();
        assert_eq!(c.force_home.iter().filter(|f| *f == "ssh").count(), 1);
        assert_eq!(c.force_home.last().map(String::as_str), Some("weechat"));
        assert_eq!(c.protected_paths.last().map(String::as_str), Some(".secret"));
    }

    #[test]
    fn root_explicit_rules_replace_derived() {
        let fs = MockFileSystemOps::new().with_file(
            "/dots/.dodot.toml",
            "[[rules]]\npattern = \"*.conf\"\nhandler = \"symlink\"\n",
        );
        let c = Config::load(Path::new("/dots"), &fs).unwrap();
        let positives: Vec<String> = c
            .rules()
            .iter()
            .filter(|r| !r.is_exclusion())
            .map(ToString::to_string)
            .collect();
        assert_eq!(positives, vec!["*.conf -> symlink"]);
        assert!(c.rules().iter().any(|r| r.is_exclusion() && r.pattern == ".dodot.toml"));
    }

    #[test]
    fn root_unknown_handler_is_fatal() {
        let fs = MockFileSystemOps::new().with_file(
            "/dots/.dodot.toml",
            "[[rules]]\npattern = \"x\"\nhandler = \"nope\"\n",
        );
        let err = Config::load(Path::new("/dots"), &fs).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHandler { .. }));
    }

    #[test]
    fn invalid_ignore_glob_is_fatal() {
        let fs = MockFileSystemOps::new()
            .with_file("/dots/.dodot.toml", "[pack]\nignore = [\"[bad\"]\n");
        let err = Config::load(Path::new("/dots"), &fs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    // -----------------------------------------------------------------------
    // Pack layer
    // -----------------------------------------------------------------------

    #[test]
    fn pack_rules_are_prepended() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&pack_layer(
                "[[rules]]\npattern = \"*.vim\"\nhandler = \"shell\"\n",
            ))
            .unwrap();
        let first_positive = pack.rules().iter().find(|r| !r.is_exclusion()).unwrap();
        assert_eq!(first_positive.to_string(), "*.vim -> shell");
        assert_eq!(pack.rules().last().unwrap().pattern, "*");
    }

    #[test]
    fn pack_force_home_is_union() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&pack_layer("[symlink]\nforce_home = [\"weechat\"]\n"))
            .unwrap();
        assert!(pack.is_force_home("weechat"));
        assert!(pack.is_force_home("vimrc"));
        assert!(!root.is_force_home("weechat"));
    }

    #[test]
    fn pack_mappings_override_and_rederive() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&pack_layer("[mappings]\ninstall = \"setup.sh\"\n"))
            .unwrap();
        assert!(rule_strings(&pack).contains(&"setup.sh -> install".to_string()));
        assert!(!rule_strings(&pack).contains(&"install.sh -> install".to_string()));
    }

    #[test]
    fn pack_shell_mappings_append() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&pack_layer("[mappings]\nshell = [\"env.sh\", \"profile.sh\"]\n"))
            .unwrap();
        assert_eq!(
            pack.mappings.shell,
            vec!["profile.sh", "login.sh", "*aliases.sh", "env.sh"]
        );
    }

    #[test]
    fn pack_ignore_becomes_exclusion() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&pack_layer("[pack]\nignore = [\"*.bak\"]\n"))
            .unwrap();
        assert!(pack.rules().iter().any(|r| r.is_exclusion() && r.pattern == "*.bak"));
    }

    #[test]
    fn append_dedup_keeps_first_occurrence_order() {
        let mut dst = vec!["a".to_string(), "b".to_string()];
        append_dedup(&mut dst, &["c".to_string(), "a".to_string(), "c".to_string()]);
        assert_eq!(dst, vec!["a", "b", "c"]);
    }
}
