//! The memory diagnostics logger.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::metrics::{MemlogMetrics, MemlogSnapshot};
use super::sink::{CallerIdentity, Sink, StdIdentity, render_line};
use super::{IncrementTracker, LogDestination, Severity, should_log_increment};
use crate::config::{MemlogConfig, ShimConfig};

/// Decides whether memory events are logged and writes the lines.
///
/// Configuration reads are plain field loads. The destination is opened on
/// the first line actually written and cached for the logger's lifetime; a
/// disabled logger never opens it. Write failures are counted and dropped,
/// never reported to the caller.
pub struct MemoryLogger {
    config: Arc<ShimConfig>,
    identity: Box<dyn CallerIdentity>,
    sink: OnceLock<Mutex<Sink>>,
    metrics: MemlogMetrics,
}

impl fmt::Debug for MemoryLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLogger")
            .field("config", &self.config.memlog)
            .field("sink_resolved", &self.sink.get().is_some())
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

impl MemoryLogger {
    #[must_use]
    pub fn new(config: Arc<ShimConfig>) -> Self {
        Self::with_identity(config, Box::new(StdIdentity))
    }

    #[must_use]
    pub fn with_identity(config: Arc<ShimConfig>, identity: Box<dyn CallerIdentity>) -> Self {
        Self {
            config,
            identity,
            sink: OnceLock::new(),
            metrics: MemlogMetrics::new(),
        }
    }

    /// Logger writing to `writer` instead of the configured destination.
    #[must_use]
    pub fn with_writer(
        config: Arc<ShimConfig>,
        identity: Box<dyn CallerIdentity>,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            config,
            identity,
            sink: OnceLock::from(Mutex::new(Sink::Writer(writer))),
            metrics: MemlogMetrics::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MemlogConfig {
        &self.config.memlog
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.config.memlog.enabled
    }

    #[must_use]
    pub fn logs_all_messages(&self) -> bool {
        self.config.memlog.verbosity.logs_all()
    }

    #[must_use]
    pub fn logs_warnings_only(&self) -> bool {
        self.config.memlog.verbosity.logs_warnings_only()
    }

    #[must_use]
    pub fn destination(&self) -> &LogDestination {
        &self.config.memlog.destination
    }

    #[must_use]
    pub fn metrics(&self) -> MemlogSnapshot {
        self.metrics.snapshot()
    }

    fn sink(&self) -> &Mutex<Sink> {
        self.sink.get_or_init(|| {
            let destination = &self.config.memlog.destination;
            let sink = Sink::open(destination).unwrap_or_else(|err| {
                let _ = writeln!(
                    std::io::stderr(),
                    "zcompat: cannot open memory log {}: {err}; memory diagnostics discarded",
                    destination.name()
                );
                Sink::Unavailable
            });
            Mutex::new(sink)
        })
    }

    /// Raw descriptor of the resolved destination, opening it if needed.
    ///
    /// `None` when logging is disabled or the destination has no descriptor.
    #[must_use]
    pub fn sink_descriptor(&self) -> Option<i32> {
        if !self.is_enabled() {
            return None;
        }
        self.sink().lock().raw_fd()
    }

    /// Increment check against the configured threshold.
    ///
    /// The caller must serialise calls sharing `tracker`.
    pub fn should_log_increment(&self, current: u64, tracker: &mut IncrementTracker) -> bool {
        let report = should_log_increment(self.config.memlog.increment_threshold, current, tracker);
        if !report {
            MemlogMetrics::inc(&self.metrics.increments_suppressed);
        }
        report
    }

    /// Format and write one line, optionally prefixed with the caller's
    /// process and thread ids. Returns the bytes written; 0 when disabled or
    /// when the write failed.
    pub fn emit(&self, args: fmt::Arguments<'_>, include_prefix: bool) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        self.write_message(None, args, include_prefix)
    }

    /// Like [`Self::emit`] with a prefix, filtered by severity against the
    /// configured verbosity. Errors always pass.
    pub fn log(&self, severity: Severity, args: fmt::Arguments<'_>) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        if !self.config.memlog.verbosity.permits(severity) {
            MemlogMetrics::inc(&self.metrics.lines_filtered);
            return 0;
        }
        self.write_message(Some(severity), args, true)
    }

    fn write_message(
        &self,
        severity: Option<Severity>,
        args: fmt::Arguments<'_>,
        include_prefix: bool,
    ) -> usize {
        let message = match args.as_str() {
            Some(s) => std::borrow::Cow::Borrowed(s),
            None => std::borrow::Cow::Owned(args.to_string()),
        };
        let prefix = include_prefix.then(|| (self.identity.pid(), self.identity.tid()));
        let line = render_line(self.config.memlog.format, prefix, severity, &message);

        match self.sink().lock().write_line(line.as_bytes()) {
            Ok(()) => {
                MemlogMetrics::inc(&self.metrics.lines_emitted);
                MemlogMetrics::add(&self.metrics.bytes_emitted, line.len() as u64);
                line.len()
            }
            Err(_) => {
                MemlogMetrics::inc(&self.metrics.lines_dropped);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memlog::{LineFormat, Verbosity};
    use std::io;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FixedIdentity;

    impl CallerIdentity for FixedIdentity {
        fn pid(&self) -> u32 {
            100
        }
        fn tid(&self) -> u64 {
            7
        }
    }

    fn config(enabled: bool, verbosity: Verbosity, threshold: u64) -> Arc<ShimConfig> {
        Arc::new(ShimConfig {
            memlog: MemlogConfig {
                enabled,
                verbosity,
                increment_threshold: threshold,
                ..MemlogConfig::default()
            },
            ..ShimConfig::default()
        })
    }

    fn capturing(config: Arc<ShimConfig>) -> (MemoryLogger, Capture) {
        let capture = Capture::default();
        let logger =
            MemoryLogger::with_writer(config, Box::new(FixedIdentity), Box::new(capture.clone()));
        (logger, capture)
    }

    #[test]
    fn disabled_logger_writes_nothing() {
        let (logger, capture) = capturing(config(false, Verbosity::All, 0));
        assert_eq!(logger.emit(format_args!("malloc {}", 16), true), 0);
        assert_eq!(logger.emit(format_args!("raw"), false), 0);
        assert_eq!(logger.log(Severity::Error, format_args!("oom")), 0);
        assert_eq!(logger.sink_descriptor(), None);
        assert!(capture.text().is_empty());
        assert_eq!(logger.metrics().lines_emitted, 0);
    }

    #[test]
    fn prefix_presence_follows_flag() {
        let (logger, capture) = capturing(config(true, Verbosity::ErrorsOnly, 0));
        let n = logger.emit(format_args!("alloc {} bytes", 32), true);
        assert_eq!(n, "100 7: alloc 32 bytes\n".len());
        logger.emit(format_args!("continuation"), false);
        assert_eq!(capture.text(), "100 7: alloc 32 bytes\ncontinuation\n");
        assert_eq!(logger.metrics().bytes_emitted, capture.text().len() as u64);
    }

    #[test]
    fn severity_filtering() {
        let (logger, capture) = capturing(config(true, Verbosity::WarningsAndErrors, 0));
        assert!(logger.log(Severity::Error, format_args!("e")) > 0);
        assert!(logger.log(Severity::Warning, format_args!("w")) > 0);
        assert_eq!(logger.log(Severity::Info, format_args!("i")), 0);
        assert_eq!(capture.text(), "100 7: e\n100 7: w\n");
        assert_eq!(logger.metrics().lines_filtered, 1);
        assert!(logger.logs_warnings_only());
        assert!(!logger.logs_all_messages());
    }

    #[test]
    fn write_failures_are_swallowed() {
        let logger = MemoryLogger::with_writer(
            config(true, Verbosity::All, 0),
            Box::new(FixedIdentity),
            Box::new(Broken),
        );
        assert_eq!(logger.emit(format_args!("lost"), true), 0);
        assert_eq!(logger.metrics().lines_dropped, 1);
    }

    #[test]
    fn unopenable_destination_drops_lines() {
        let cfg = Arc::new(ShimConfig {
            memlog: MemlogConfig {
                enabled: true,
                destination: LogDestination::Path("/nonexistent-dir/zcompat/mem.log".into()),
                ..MemlogConfig::default()
            },
            ..ShimConfig::default()
        });
        let logger = MemoryLogger::new(cfg);
        assert_eq!(logger.emit(format_args!("x"), false), 0);
        assert_eq!(logger.emit(format_args!("y"), false), 0);
        assert_eq!(logger.sink_descriptor(), None);
        assert_eq!(logger.metrics().lines_dropped, 2);
    }

    #[test]
    fn increment_checks_use_configured_threshold() {
        let (logger, _) = capturing(config(true, Verbosity::All, 100));
        let mut tracker = IncrementTracker::new();
        assert!(logger.should_log_increment(50, &mut tracker));
        assert!(!logger.should_log_increment(120, &mut tracker));
        assert!(logger.should_log_increment(151, &mut tracker));
        assert_eq!(tracker.last_reported(), Some(151));
        assert_eq!(logger.metrics().increments_suppressed, 1);
    }

    #[test]
    fn json_format_carries_level() {
        let cfg = Arc::new(ShimConfig {
            memlog: MemlogConfig {
                enabled: true,
                verbosity: Verbosity::All,
                format: LineFormat::Json,
                ..MemlogConfig::default()
            },
            ..ShimConfig::default()
        });
        let (logger, capture) = capturing(cfg);
        logger.log(Severity::Info, format_args!("total {}", 4096));
        let value: serde_json::Value = serde_json::from_str(capture.text().trim_end()).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["message"], "total 4096");
        assert_eq!(value["pid"], 100);
    }

    #[test]
    fn file_destination_is_appended() {
        let path = std::env::temp_dir().join(format!(
            "zcompat-memlog-{}-append.log",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        std::fs::write(&path, "existing\n").unwrap();
        let cfg = Arc::new(ShimConfig {
            memlog: MemlogConfig {
                enabled: true,
                destination: LogDestination::Path(path.clone()),
                ..MemlogConfig::default()
            },
            ..ShimConfig::default()
        });
        let logger = MemoryLogger::with_identity(cfg, Box::new(FixedIdentity));
        logger.emit(format_args!("appended"), true);
        assert!(logger.sink_descriptor().is_some_and(|fd| fd > 2));
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "existing\n100 7: appended\n");
        let _ = std::fs::remove_file(&path);
    }
}
