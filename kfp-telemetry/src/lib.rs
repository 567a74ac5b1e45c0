//! Structured logging for the submission tools.
//!
//! Development environments log pretty-printed lines to the terminal. Production-like
//! environments write JSON lines to daily rolling files, each line tagged with the experiment
//! and run it belongs to.

use kfp_config::Environment;
use serde_json::Value;
use std::io::{Error, Write};
use std::sync::OnceLock;
use std::{
    backtrace::{Backtrace, BacktraceStatus},
    panic::PanicHookInfo,
    sync::Once,
};
use thiserror::Error;
use tracing::subscriber::{SetGlobalDefaultError, set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, InitError},
};
use tracing_log::{LogTracer, log_tracer::SetLoggerError};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, FmtSubscriber, Registry, fmt, layer::SubscriberExt};

/// JSON field name for experiment identification in logs.
const EXPERIMENT_KEY_IN_LOG: &str = "experiment";
/// JSON field name for run identification in logs.
const RUN_NAME_KEY_IN_LOG: &str = "run_name";

/// Directory receiving the rolling log files.
const LOG_DIR: &str = "logs";
/// Number of daily log files kept around.
const MAX_LOG_FILES: usize = 5;

/// Errors that can occur during tracing initialization.
#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to build rolling file appender: {0}")]
    InitAppender(#[from] InitError),

    #[error("failed to init log tracer: {0}")]
    InitLogTracer(#[from] SetLoggerError),

    #[error("failed to set global default subscriber: {0}")]
    SetGlobalDefault(#[from] SetGlobalDefaultError),

    #[error("an io error occurred: {0}")]
    Io(#[from] Error),
}

/// Log flusher handle for ensuring logs are written before shutdown.
///
/// Must be kept alive until the process exits, otherwise buffered file logs are lost.
#[must_use]
pub enum LogFlusher {
    /// Flushes the non-blocking file appender on drop.
    Flusher(WorkerGuard),
    /// Terminal logging writes synchronously and needs no flushing.
    NullFlusher,
}

static INIT_TEST_TRACING: Once = Once::new();

/// Initializes tracing for tests.
///
/// Call once at the beginning of a test and set `ENABLE_TRACING=1` to see the output:
/// ```bash
/// ENABLE_TRACING=1 cargo test test_name
/// ```
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var("ENABLE_TRACING").is_ok() {
            // Without an environment we would default to prod and log to files.
            Environment::Dev.set();
            let _log_flusher =
                init_tracing("test").expect("Failed to initialize tracing for tests");
        }
    });
}

static EXPERIMENT: OnceLock<String> = OnceLock::new();
static RUN_NAME: OnceLock<String> = OnceLock::new();

/// Sets the experiment name injected into every JSON log entry.
pub fn set_global_experiment(experiment: String) {
    let _ = EXPERIMENT.set(experiment);
}

pub fn get_global_experiment() -> Option<&'static str> {
    EXPERIMENT.get().map(String::as_str)
}

/// Sets the run name injected into every JSON log entry.
pub fn set_global_run_name(run_name: String) {
    let _ = RUN_NAME.set(run_name);
}

pub fn get_global_run_name() -> Option<&'static str> {
    RUN_NAME.get().map(String::as_str)
}

/// Adds the `fields` missing from a JSON log line, keeping a trailing newline.
///
/// Returns `None` when the line is not a JSON object or nothing had to be added.
fn inject_fields(line: &str, fields: &[(&str, Option<&str>)]) -> Option<String> {
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(line) else {
        return None;
    };

    let mut modified = false;
    for (key, value) in fields {
        if let Some(value) = value
            && !map.contains_key(*key)
        {
            map.insert(key.to_string(), Value::String(value.to_string()));
            modified = true;
        }
    }

    if !modified {
        return None;
    }

    let serialized = serde_json::to_string(&map).ok()?;
    if line.ends_with('\n') {
        Some(format!("{serialized}\n"))
    } else {
        Some(serialized)
    }
}

/// Writer wrapper tagging JSON log entries with the global experiment and run name.
struct RunInjectingWriter<W> {
    inner: W,
}

impl<W> RunInjectingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W> Write for RunInjectingWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let fields = [
            (EXPERIMENT_KEY_IN_LOG, get_global_experiment()),
            (RUN_NAME_KEY_IN_LOG, get_global_run_name()),
        ];

        if let Ok(line) = std::str::from_utf8(buf)
            && let Some(modified) = inject_fields(line, &fields)
        {
            // Report the original length, callers track their own buffer.
            self.inner.write_all(modified.as_bytes())?;
            return Ok(buf.len());
        }

        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Initializes tracing for the application.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    init_tracing_with_run(app_name, None, None)
}

/// Initializes tracing, tagging JSON log entries with the given experiment and run name.
pub fn init_tracing_with_run(
    app_name: &str,
    experiment: Option<String>,
    run_name: Option<String>,
) -> Result<LogFlusher, TracingError> {
    if let Some(experiment) = experiment {
        set_global_experiment(experiment);
    }

    if let Some(run_name) = run_name {
        set_global_run_name(run_name);
    }

    // Forward records of libraries logging through the `log` crate.
    LogTracer::init()?;

    let is_prod = Environment::load()?.is_prod();

    // Default to `info` when `RUST_LOG` is not set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_flusher = if is_prod {
        configure_prod_tracing(filter, app_name)?
    } else {
        configure_dev_tracing(filter)?
    };

    set_tracing_panic_hook();

    Ok(log_flusher)
}

/// JSON logging to daily rotated files.
fn configure_prod_tracing(filter: EnvFilter, app_name: &str) -> Result<LogFlusher, TracingError> {
    let file_appender = rolling::Builder::new()
        .filename_prefix(app_name)
        .filename_suffix("log")
        .rotation(rolling::Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)?;

    let (file_appender, guard) = tracing_appender::non_blocking(file_appender);

    let format = fmt::format()
        .with_level(true)
        .with_ansi(false)
        .with_target(false);

    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .event_format(format)
            .with_writer(move || RunInjectingWriter::new(file_appender.make_writer()))
            .json()
            .with_current_span(true)
            .with_span_list(true),
    );

    set_global_default(subscriber)?;

    Ok(LogFlusher::Flusher(guard))
}

/// Pretty, colored logging to the terminal.
fn configure_dev_tracing(filter: EnvFilter) -> Result<LogFlusher, TracingError> {
    let format = fmt::format()
        .with_level(true)
        .with_ansi(true)
        .pretty()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let subscriber = FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .finish();

    set_global_default(subscriber)?;

    Ok(LogFlusher::NullFlusher)
}

/// Routes panics through `tracing` before running the previous hook, so they reach the log
/// files in production.
fn set_tracing_panic_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        panic_hook(info);
        prev_hook(info);
    }));
}

fn panic_hook(panic_info: &PanicHookInfo) {
    let backtrace = Backtrace::capture();
    let (backtrace, note) = match backtrace.status() {
        BacktraceStatus::Captured => (Some(backtrace), None),
        BacktraceStatus::Disabled => (
            None,
            Some("run with RUST_BACKTRACE=1 to display backtraces"),
        ),
        BacktraceStatus::Unsupported => {
            (None, Some("backtraces are not supported on this platform"))
        }
        _ => (None, Some("backtrace status is unknown")),
    };

    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    };

    let location = panic_info.location().map(|location| location.to_string());

    tracing::error!(
        panic.payload = payload,
        payload.location = location,
        panic.backtrace = backtrace.map(tracing::field::display),
        panic.note = note,
        "a panic occurred",
    );
}
