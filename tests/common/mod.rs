// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed environment (dotfiles root, $HOME,
// XDG directories and data store) and a fluent builder so each integration
// test can run the `dodot` binary in isolation without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// An isolated dotfiles environment backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct TestEnv {
    _dir: tempfile::TempDir,
    /// Dotfiles root (packs live here).
    pub root: PathBuf,
    /// Fake `$HOME`.
    pub home: PathBuf,
    /// `$DODOT_DATA_DIR`.
    pub data: PathBuf,
}

impl TestEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let base = dunce::canonicalize(dir.path()).expect("canonicalize temp dir");
        let root = base.join("dotfiles");
        let home = base.join("home");
        std::fs::create_dir_all(&root).expect("create dotfiles root");
        std::fs::create_dir_all(&home).expect("create home");
        Self {
            _dir: dir,
            root,
            data: base.join("data"),
            home,
        }
    }

    /// Write `content` to `<root>/<rel>`, creating parent directories.
    pub fn with_file(self, rel: &str, content: &str) -> Self {
        write(&self.root.join(rel), content);
        self
    }

    /// Write an executable file to `<root>/<rel>`.
    pub fn with_executable(self, rel: &str, content: &str) -> Self {
        let path = self.root.join(rel);
        write(&path, content);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod executable");
        }
        self
    }

    /// Write `content` to `$HOME/<rel>`.
    pub fn with_home_file(self, rel: &str, content: &str) -> Self {
        write(&self.home.join(rel), content);
        self
    }

    /// A `dodot` invocation with the environment pointed at this sandbox.
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dodot"));
        cmd.args(args)
            .current_dir(&self.root)
            .env("HOME", &self.home)
            .env("DOTFILES_ROOT", &self.root)
            .env("DODOT_DATA_DIR", &self.data)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env("XDG_DATA_HOME", self.home.join(".local/share"))
            .env("XDG_CACHE_HOME", self.home.join(".cache"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run `dodot` and return its output.
    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("run dodot")
    }

    /// Run `dodot`, asserting it exits 0.
    pub fn run_ok(&self, args: &[&str]) -> Output {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "dodot {args:?} failed ({:?})\nstdout:\n{}\nstderr:\n{}",
            out.status.code(),
            stdout(&out),
            stderr(&out)
        );
        out
    }

    /// `$HOME/<rel>`.
    pub fn home_path(&self, rel: &str) -> PathBuf {
        self.home.join(rel)
    }

    /// `$DODOT_DATA_DIR/<rel>`.
    pub fn data_path(&self, rel: &str) -> PathBuf {
        self.data.join(rel)
    }

    /// `<root>/<rel>`.
    pub fn root_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
}

/// Captured stdout as text.
pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

/// Captured stderr as text.
pub fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

/// Whether `path` is a symlink (broken or not).
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink())
}

/// Names of the files in `dir`, sorted; empty if it does not exist.
pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
