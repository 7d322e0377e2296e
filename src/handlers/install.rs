//! One-shot handlers: install scripts and Brewfiles.
//!
//! Both run a command guarded by a sentinel named after the script and
//! the SHA-256 of its content, so an edit re-arms the run.
use anyhow::{Context as _, Result};
use sha2::{Digest, Sha256};

use super::{HandlerContext, HandlerKind, require_file};
use crate::datastore::Sentinel;
use crate::operations::{Operation, OperationKind};
use crate::rules::Match;

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Emit the `RunCommand` for an install script or Brewfile.
///
/// # Errors
///
/// Returns an error if the match is a directory or cannot be read.
pub fn operation(kind: HandlerKind, m: &Match, ctx: &HandlerContext<'_>) -> Result<Operation> {
    require_file(kind, m)?;
    let source = m.source();
    let content = ctx
        .fs
        .read(&source)
        .with_context(|| format!("hashing {}/{}", m.pack, m.relpath))?;
    let sentinel = Sentinel {
        pack: m.pack.clone(),
        handler: kind,
        basename: m.filename.clone(),
        hash: sha256_hex(&content),
    };
    let path = source.display().to_string();
    let (program, args) = match kind {
        HandlerKind::Homebrew => (
            "brew".to_string(),
            vec!["bundle".to_string(), format!("--file={path}")],
        ),
        _ => ("bash".to_string(), vec![path]),
    };
    Ok(Operation {
        pack: m.pack.clone(),
        handler: kind,
        relpath: m.relpath.clone(),
        kind: OperationKind::RunCommand {
            program,
            args,
            sentinel,
        },
    })
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::super::test_helpers::{matched, paths};
    use super::*;
    use crate::config::Config;
    use crate::datastore::DataStore;
    use crate::filesystem::MockFileSystemOps;

    fn run(kind: HandlerKind, name: &str, body: &str) -> Operation {
        let paths = paths();
        let store = DataStore::new(&paths.data_dir);
        let config = Config::defaults().unwrap();
        let fs = MockFileSystemOps::new().with_file(format!("/dots/dev/{name}"), body);
        let ctx = HandlerContext {
            paths: &paths,
            config: &config,
            store: &store,
            fs: &fs,
        };
        operation(kind, &matched("dev", name, false, kind), &ctx).unwrap()
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn install_runs_bash_with_hashed_sentinel() {
        let op = run(HandlerKind::Install, "install.sh", "echo hi\n");
        let OperationKind::RunCommand { program, args, sentinel } = op.kind else {
            panic!("expected RunCommand");
        };
        assert_eq!(program, "bash");
        assert_eq!(args, vec!["/dots/dev/install.sh"]);
        assert_eq!(sentinel.basename, "install.sh");
        assert_eq!(sentinel.hash, sha256_hex(b"echo hi\n"));
        assert!(sentinel.token().starts_with("install.sh-"));
    }

    #[test]
    fn brewfile_runs_brew_bundle() {
        let op = run(HandlerKind::Homebrew, "Brewfile", "brew \"jq\"\n");
        assert_eq!(
            op.command_line().as_deref(),
            Some("brew bundle --file=/dots/dev/Brewfile")
        );
    }

    #[test]
    fn content_change_changes_sentinel() {
        let a = run(HandlerKind::Install, "install.sh", "echo hi\n");
        let b = run(HandlerKind::Install, "install.sh", "echo bye\n");
        assert_ne!(a, b);
    }
}
