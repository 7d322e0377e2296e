//! Symlink handler: two-hop links into `$HOME` or `$XDG_CONFIG_HOME`.
use std::path::PathBuf;

use super::HandlerContext;
use crate::operations::{Operation, OperationKind};
use crate::rules::Match;

/// The user-visible path for a match.
///
/// An explicit `target` option wins.  Otherwise a `force_home` name goes to
/// `$HOME/.<name>`, and everything else to
/// `$XDG_CONFIG_HOME/<pack>/<relpath>`.
#[must_use]
pub fn user_target(m: &Match, ctx: &HandlerContext<'_>) -> PathBuf {
    if let Some(raw) = m.options.get("target") {
        return ctx.paths.expand_target(raw);
    }
    if ctx.config.is_force_home(&m.filename) {
        let name = m.filename.trim_start_matches('.');
        return ctx.paths.home.join(format!(".{name}"));
    }
    ctx.paths.xdg_config_home.join(&m.pack).join(&m.relpath)
}

/// Emit the intermediate link followed by the user link.
#[must_use]
pub fn operations(m: &Match, ctx: &HandlerContext<'_>) -> [Operation; 2] {
    let intermediate = ctx.store.symlink_entry(&m.pack, &m.filename);
    let op = |kind| Operation {
        pack: m.pack.clone(),
        handler: m.handler,
        relpath: m.relpath.clone(),
        kind,
    };
    [
        op(OperationKind::Link {
            source: m.source(),
            target: intermediate.clone(),
        }),
        op(OperationKind::Link {
            source: intermediate,
            target: user_target(m, ctx),
        }),
    ]
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
    use crate::config::toml_loader::parse_str;
    use crate::datastore::DataStore;
    use crate::filesystem::MockFileSystemOps;
    use crate::handlers::HandlerKind;
    use std::path::Path;

    fn targets(m: &Match, config: &Config) -> (PathBuf, PathBuf) {
        let paths = paths();
        let store = DataStore::new(&paths.data_dir);
        let fs = MockFileSystemOps::new();
        let ctx = HandlerContext {
            paths: &paths,
            config,
            store: &store,
            fs: &fs,
        };
        let [first, second] = operations(m, &ctx);
        let OperationKind::Link { source: s1, target: t1 } = first.kind else {
            panic!("expected link");
        };
        let OperationKind::Link { source: s2, target: t2 } = second.kind else {
            panic!("expected link");
        };
        assert_eq!(s1, m.source());
        assert_eq!(s2, t1);
        (t1, t2)
    }

    #[test]
    fn force_home_file_goes_to_dot_home() {
        let config = Config::defaults().unwrap();
        let m = matched("vim", "vimrc", false, HandlerKind::Symlink);
        let (intermediate, user) = targets(&m, &config);
        assert_eq!(intermediate, PathBuf::from("/data/deployed/symlink/vim/vimrc"));
        assert_eq!(user, PathBuf::from("/home/u/.vimrc"));
    }

    #[test]
    fn hidden_force_home_name_is_not_double_dotted() {
        let config = Config::defaults().unwrap();
        let m = matched("shell", ".bashrc", false, HandlerKind::Symlink);
        let (_, user) = targets(&m, &config);
        assert_eq!(user, PathBuf::from("/home/u/.bashrc"));
    }

    #[test]
    fn other_files_go_under_xdg_config() {
        let config = Config::defaults().unwrap();
        let m = matched("nvim", "init.lua", false, HandlerKind::Symlink);
        let (_, user) = targets(&m, &config);
        assert_eq!(user, PathBuf::from("/home/u/.config/nvim/init.lua"));
    }

    #[test]
    fn pack_force_home_extends_defaults() {
        let root = Config::defaults().unwrap();
        let pack = root
            .for_pack(&parse_str("[symlink]\nforce_home = [\"weechat\"]\n", Path::new("p")).unwrap())
            .unwrap();
        let m = matched("chat", "weechat", true, HandlerKind::Symlink);
        let (_, user) = targets(&m, &pack);
        assert_eq!(user, PathBuf::from("/home/u/.weechat"));
    }

    #[test]
    fn explicit_target_option_wins() {
        let config = Config::defaults().unwrap();
        let mut m = matched("vim", "vimrc", false, HandlerKind::Symlink);
        m.options.insert("target".into(), "~/.vim/vimrc".into());
        let (_, user) = targets(&m, &config);
        assert_eq!(user, PathBuf::from("/home/u/.vim/vimrc"));
    }
}
