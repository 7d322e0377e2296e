//! Embedded shell loaders, installed into the data store's `shell/`
//! directory by every mutating command.
use std::path::{Path, PathBuf};

use crate::datastore::DataStore;
use crate::resources::file::FileResource;

/// Loader for bash and zsh.
pub const POSIX_LOADER: &str = include_str!("dodot-init.sh");

/// Loader for fish.
pub const FISH_LOADER: &str = include_str!("dodot-init.fish");

/// File name of the bash/zsh loader.
pub const POSIX_LOADER_NAME: &str = "dodot-init.sh";

/// File name of the fish loader.
pub const FISH_LOADER_NAME: &str = "dodot-init.fish";

/// One resource per loader script, targeting `store`.
#[must_use]
pub fn loader_resources(store: &DataStore) -> [FileResource; 2] {
    let dir = store.shell_dir();
    [
        FileResource::new(POSIX_LOADER, dir.join(POSIX_LOADER_NAME)),
        FileResource::new(FISH_LOADER, dir.join(FISH_LOADER_NAME)),
    ]
}

/// Path of the bash/zsh loader in `store`.
#[must_use]
pub fn posix_loader_path(store: &DataStore) -> PathBuf {
    store.shell_dir().join(POSIX_LOADER_NAME)
}

/// The line a user adds to their shell profile.
#[must_use]
pub fn source_line(loader: &Path) -> String {
    let quoted = loader.display().to_string().replace('"', "\\\"");
    format!("[ -f \"{quoted}\" ] && . \"{quoted}\"")
}
