//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber
//! - Choose the destination: stderr or a daily-rolling file
//! - Configure log level from `RUST_LOG` or the verbosity flag
//!
//! # Design Decisions
//! - Writes go through a non-blocking writer; the returned guard flushes on drop
//! - An unusable log directory degrades to stderr instead of failing startup
//! - When logging to a file, ERROR events are also copied to stderr so fatal
//!   startup failures reach the operator's terminal

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// File name prefix of the rolling log.
pub const LOG_FILE_PREFIX: &str = "gateway.log";

/// Where log records are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

/// Destination actually opened, after any fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    Stderr,
    File(PathBuf),
}

/// Install the global subscriber. Keep the guard alive for the process lifetime.
pub fn init_logging(target: &LogTarget, level: &str) -> WorkerGuard {
    let (writer, guard, destination) = open_writer(target);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ledger_gateway={level},tower_http={level},warn")));

    let file_output = matches!(destination, LogDestination::File(_));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(!file_output))
        .with(file_output.then(|| error_echo_layer(std::io::stderr)))
        .try_init();

    if let LogDestination::File(dir) = &destination {
        tracing::info!(dir = %dir.display(), "Logging to file");
    }
    guard
}

/// Layer that repeats ERROR events to `make_writer`.
pub fn error_echo_layer<S, W>(make_writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(make_writer)
        .with_filter(LevelFilter::ERROR)
}

/// Open the writer for `target`, falling back to stderr.
pub fn open_writer(target: &LogTarget) -> (NonBlocking, WorkerGuard, LogDestination) {
    if let LogTarget::Directory(dir) = target {
        match rolling_file(dir) {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                return (writer, guard, LogDestination::File(dir.clone()));
            }
            Err(e) => {
                eprintln!(
                    "cannot log to {}: {}; logging to stderr instead",
                    dir.display(),
                    e
                );
            }
        }
    }
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    (writer, guard, LogDestination::Stderr)
}

fn rolling_file(dir: &Path) -> Result<RollingFileAppender, String> {
    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn error_echo_copies_only_errors() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::registry().with(error_echo_layer(move || sink.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("RPC listener bound");
            tracing::warn!("TLS disabled");
            tracing::error!(error = "Address already in use", "Startup aborted");
        });

        let text = captured.text();
        assert!(text.contains("Startup aborted"));
        assert!(text.contains("Address already in use"));
        assert!(!text.contains("RPC listener bound"));
        assert!(!text.contains("TLS disabled"));
    }

    #[test]
    fn stderr_target_stays_on_stderr() {
        let (_w, _g, dest) = open_writer(&LogTarget::Stderr);
        assert_eq!(dest, LogDestination::Stderr);
    }

    #[test]
    fn creates_missing_log_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("log");
        let (_w, _g, dest) = open_writer(&LogTarget::Directory(dir.clone()));
        assert_eq!(dest, LogDestination::File(dir.clone()));
        assert!(dir.is_dir());
    }

    #[test]
    fn unusable_directory_falls_back_to_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let (_w, _g, dest) = open_writer(&LogTarget::Directory(blocker.join("log")));
        assert_eq!(dest, LogDestination::Stderr);
    }
}
