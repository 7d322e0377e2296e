//! Tracing subscriber setup: console formatter, file layer, and the per-run
//! context record.
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use super::utils::{log_file_path, strip_ansi, utc_now};
use crate::commands::version::version;

/// Target of the event emitted by [`record_run`].
const RUN_TARGET: &str = "dodot::run";

/// Collects the `message` field and any other fields of a [`tracing::Event`].
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl FieldCollector {
    fn push(&mut self, field: &tracing::field::Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name(), value));
        }
    }
}

impl tracing::field::Visit for FieldCollector {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.push(field, value.to_string());
    }
}

/// Emit the run context (dotfiles root, data store, packs in scope).
///
/// The file layer renders it as a block under the run header; the console
/// shows it only with `--verbose`.
pub fn record_run(root: &Path, data_dir: &Path, packs: &[String]) {
    let packs = if packs.is_empty() {
        "(none)".to_string()
    } else {
        packs.join(" ")
    };
    tracing::debug!(
        target: RUN_TARGET,
        root = %root.display(),
        data = %data_dir.display(),
        packs = %packs,
    );
}

/// A [`tracing_subscriber::Layer`] that appends all events to the command's
/// log file with timestamps and ANSI codes stripped.
///
/// Always captures events at `DEBUG` level and above regardless of the
/// console verbosity setting.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log file for `command`, write the run header, and return
    /// a layer appending to it.
    ///
    /// Returns `None` if the cache directory cannot be created or the file
    /// cannot be opened.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        fs::write(&path, header(command)).ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

fn header(command: &str) -> String {
    let rule = "=".repeat(42);
    format!(
        "{rule}\ndodot {} {command} {}\n{rule}\n",
        version(),
        utc_now("%Y-%m-%d %H:%M:%S"),
    )
}

/// File-log rendering of one event, one or more lines.
fn file_line(level: tracing::Level, target: &str, fields: &FieldCollector) -> String {
    let ts = utc_now("%H:%M:%S");
    let msg = strip_ansi(&fields.message);
    match (level, target) {
        (_, RUN_TARGET) => fields.fields.iter().fold(String::new(), |mut out, (k, v)| {
            let _ = writeln!(out, "[{ts}]     {k:<6}{v}");
            out
        }),
        (tracing::Level::INFO, "dodot::stage") => format!("[{ts}] ==> {msg}\n"),
        (tracing::Level::INFO, "dodot::dry_run") => format!("[{ts}]     [dry run] {msg}\n"),
        (tracing::Level::ERROR, _) => format!("[{ts}]     [error] {msg}\n"),
        (tracing::Level::WARN, _) => format!("[{ts}]     [warn] {msg}\n"),
        (tracing::Level::DEBUG, _) => format!("[{ts}]     [debug] {msg}\n"),
        _ => format!("[{ts}]     {msg}\n"),
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let metadata = event.metadata();
        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        let text = file_line(*metadata.level(), metadata.target(), &fields);
        if let Ok(mut f) = self.file.lock() {
            f.write_all(text.as_bytes()).ok();
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits dodot-style
/// console output.
struct DodotFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for DodotFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut fields = FieldCollector::default();
        event.record(&mut fields);
        let msg = &fields.message;

        match level {
            _ if target == RUN_TARGET => {
                for (k, v) in &fields.fields {
                    writeln!(writer, "  \x1b[2m{k}: {v}\x1b[0m")?;
                }
                Ok(())
            }
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == "dodot::stage" => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO if target == "dodot::dry_run" => {
                writeln!(writer, "  \x1b[33m[DRY RUN]\x1b[0m {msg}")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Sets up a console subscriber that formats events in dodot's output
/// style and a file subscriber that writes all events (including `debug`)
/// to `$XDG_CACHE_HOME/dodot/<command>.log`.
/// Must be called once at program startup, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .and(std::io::stdout.with_min_level(tracing::Level::INFO));

    let console_layer = fmt::layer()
        .event_format(DodotFormatter)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
