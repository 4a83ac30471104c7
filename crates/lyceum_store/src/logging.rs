//! Logging bootstrap and the injectable diagnostics sink.
//!
//! # Responsibility
//! - Turn the `log_level`/`log_dir` options into validated [`LogSettings`].
//! - Start one rolling-file logger per process and capture panics into it.
//! - Hand adapter components a `Diagnostics` sink instead of ambient globals.
//!
//! # Invariants
//! - Events are metadata-only `key=value` lines; document bodies are never logged.
//! - A second `init_logging` succeeds only with identical settings.
//! - No adapter behavior depends on whether a log line was written.

use crate::config::ConnectOptions;
use crate::error::{StoreError, StoreResult};
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{Level, LevelFilter, Log, Record};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::fmt::{Arguments, Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

const LOG_FILE_BASENAME: &str = "lyceum";
const LOG_TARGET: &str = "lyceum_store";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<(LogSettings, LoggerHandle)> = OnceCell::new();

/// Validated file-logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub dir: PathBuf,
}

impl LogSettings {
    /// Builds settings from `level` (case-insensitive, `warning` allowed) and
    /// an absolute directory.
    pub fn new(level: &str, dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        if !dir.is_absolute() {
            return Err(StoreError::Config(format!(
                "log_dir must be an absolute path, got `{}`",
                dir.display()
            )));
        }
        Ok(Self {
            level: parse_level(level)?,
            dir,
        })
    }

    /// `None` when `log_dir` is unset; the level falls back to the build default.
    pub fn from_options(options: &ConnectOptions) -> StoreResult<Option<Self>> {
        let Some(dir) = &options.log_dir else {
            return Ok(None);
        };
        let level = options
            .log_level
            .as_deref()
            .unwrap_or(if cfg!(debug_assertions) { "debug" } else { "info" });
        Self::new(level, dir.clone()).map(Some)
    }
}

/// Starts rolling file logs under `settings.dir` and installs the panic hook.
///
/// # Errors
/// - `StoreError::Config` when the directory cannot be created, the backend
///   fails to start, or logging is already active with other settings.
pub fn init_logging(settings: &LogSettings) -> StoreResult<()> {
    let (active, _) = ACTIVE.get_or_try_init(|| start_logger(settings))?;
    if active != settings {
        return Err(StoreError::Config(format!(
            "logging already active at `{}` with level {}",
            active.dir.display(),
            active.level
        )));
    }
    Ok(())
}

fn start_logger(settings: &LogSettings) -> StoreResult<(LogSettings, LoggerHandle)> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        StoreError::Config(format!(
            "cannot create log directory `{}`: {err}",
            settings.dir.display()
        ))
    })?;

    let spec = settings.level.as_str().to_ascii_lowercase();
    let handle = Logger::try_with_str(&spec)
        .and_then(|logger| {
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(settings.dir.as_path())
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        })
        .map_err(|err| StoreError::Config(format!("cannot start logger: {err}")))?;

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        log::error!(
            "event=panic module=store status=error location={location} payload={}",
            panic_summary(info.payload())
        );
        previous(info);
    }));

    log::info!(
        "event=logging_init module=store status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        spec,
        settings.dir.display()
    );
    Ok((settings.clone(), handle))
}

fn parse_level(level: &str) -> StoreResult<LevelFilter> {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    LevelFilter::from_str(level)
        .map_err(|_| StoreError::Config(format!("unsupported log level `{level}`")))
}

/// First line of a string panic payload, capped.
fn panic_summary(payload: &(dyn Any + Send)) -> String {
    let text = if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string payload>"
    };
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PANIC_SUMMARY_CHARS || line.len() < text.len() {
        let mut summary: String = line.chars().take(PANIC_SUMMARY_CHARS).collect();
        summary.push_str("...");
        summary
    } else {
        line.to_string()
    }
}

/// Leveled log sink handed to adapter components at construction.
///
/// Wraps any `log::Log`; `Diagnostics::default()` forwards to whatever global
/// logger the process installed (for example via [`init_logging`]).
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn Log>,
}

impl Diagnostics {
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink }
    }

    pub fn debug(&self, args: Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn info(&self, args: Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn error(&self, args: Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: Arguments<'_>) {
        self.sink.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(LOG_TARGET)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Arc::new(GlobalLogger))
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

struct GlobalLogger;

impl Log for GlobalLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            log::logger().log(record);
        }
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
