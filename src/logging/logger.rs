//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{FileEntry, FileStatus, Log};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record` method is **not** included because its signature differs
/// from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// All messages are always written to a persistent log file at
/// `$XDG_CACHE_HOME/dodot/<command>.log` (default `~/.cache/dodot/<command>.log`)
/// with timestamps and ANSI codes stripped, regardless of the verbose flag.
#[derive(Debug)]
pub struct Logger {
    entries: Mutex<Vec<FileEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary.  The log file
    /// itself is created by [`init_subscriber`](super::subscriber::init_subscriber);
    /// this constructor does not write to it.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<FileEntry> {
        self.entries.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "dodot::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file via the [`FileLayer`](super::subscriber::FileLayer)).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "dodot::dry_run", "{msg}");
    }

    /// Record a file result for the summary.
    pub fn record(&self, entry: FileEntry) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(entry);
        }
    }

    /// Count the number of failed entries.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|e| e.status == FileStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded entries.
    pub fn print_summary(&self) {
        let entries = self.entries();
        if entries.is_empty() {
            return;
        }

        self.stage("Summary");

        let mut changed = 0u32;
        let mut ok = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for entry in &entries {
            let (icon, color) = match entry.status {
                FileStatus::Changed => {
                    changed += 1;
                    ("✓", "\x1b[32m")
                }
                FileStatus::AlreadyOk => {
                    ok += 1;
                    ("·", "\x1b[2m")
                }
                FileStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                FileStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                FileStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!(
                "{color}{icon} {}/{} [{}]{suffix}\x1b[0m",
                entry.pack, entry.relpath, entry.handler
            ));
        }

        let total = changed + ok + skipped + dry_run + failed;
        self.info(&format!(
            "{total} files: \x1b[32m{changed} changed\x1b[0m, \x1b[2m{ok} ok\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record(&self, entry: FileEntry) {
        self.record(entry);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::handlers::HandlerKind;
    use crate::logging::{isolated_logger, record_run};
    use std::fs;
    use std::path::Path;

    fn entry(relpath: &str, status: FileStatus) -> FileEntry {
        FileEntry {
            pack: "vim".into(),
            relpath: relpath.into(),
            handler: HandlerKind::Symlink,
            status,
            message: None,
        }
    }

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.entries().is_empty(), "expected empty entry list");
    }

    #[test]
    fn record_entries_in_order() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record(entry("vimrc", FileStatus::Changed));
        log.record(entry("gvimrc", FileStatus::AlreadyOk));
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].relpath, "vimrc");
        assert_eq!(entries[1].status, FileStatus::AlreadyOk);
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = isolated_logger();
        assert_eq!(log.failure_count(), 0);
        log.record(entry("a", FileStatus::Changed));
        log.record(entry("b", FileStatus::Failed));
        log.record(entry("c", FileStatus::Failed));
        log.record(entry("d", FileStatus::Skipped));
        assert_eq!(log.failure_count(), 2);
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record(entry("via-trait", FileStatus::Changed));
        assert_eq!(log.entries().len(), 1);
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should be created by the file layer");
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(
            contents.contains(&marker),
            "debug messages should always appear in the log file"
        );
    }

    #[test]
    fn warn_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("warn-marker-{}", std::process::id());
        log.warn(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[warn]"), "warn tag should appear in log file");
        assert!(contents.contains(&marker));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("stage-marker-{}", std::process::id());
        log.stage(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("==>"), "stage arrow should appear in log file");
        assert!(contents.contains(&marker));
    }

    #[test]
    fn dry_run_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("dryrun-marker-{}", std::process::id());
        log.dry_run(&marker);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("[dry run]"), "dry run tag should appear in log file");
        assert!(contents.contains(&marker));
    }

    #[test]
    fn summary_lists_each_entry_without_ansi_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record(FileEntry {
            message: Some("conflict".into()),
            ..entry("vimrc", FileStatus::Failed)
        });
        log.print_summary();
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        assert!(contents.contains("✗ vim/vimrc [symlink] (conflict)"), "{contents}");
        assert!(contents.contains("1 files:"), "{contents}");
        assert!(!contents.contains('\x1b'));
    }

    #[test]
    fn run_context_follows_the_header() {
        let (log, _tmp, _guard) = isolated_logger();
        record_run(Path::new("/dots"), Path::new("/data"), &["git".into(), "vim".into()]);
        let contents = fs::read_to_string(log.log_path().expect("log path")).unwrap();
        let version = crate::commands::version::version();
        assert!(contents.lines().nth(1).unwrap().starts_with(&format!("dodot {version} test ")));
        assert!(contents.contains("root  /dots\n"), "{contents}");
        assert!(contents.contains("data  /data\n"), "{contents}");
        assert!(contents.contains("packs git vim\n"), "{contents}");
    }
}
