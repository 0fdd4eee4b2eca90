//! Log destinations, line layout and the caller identity prefix.

use std::cell::Cell;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::Severity;

/// Where memory diagnostics go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogDestination {
    Stdout,
    Stderr,
    Path(PathBuf),
}

impl LogDestination {
    /// Interpret a destination setting; the literals `stdout` and `stderr`
    /// select the standard streams and anything else is a path. An empty
    /// setting means stderr.
    #[must_use]
    pub fn from_setting(raw: &str) -> Self {
        match raw.trim() {
            "" | "stderr" => Self::Stderr,
            "stdout" => Self::Stdout,
            path => Self::Path(PathBuf::from(path)),
        }
    }

    /// The setting string this destination came from.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Stdout => "stdout".to_string(),
            Self::Stderr => "stderr".to_string(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Line layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineFormat {
    /// `<pid> <tid>: message`
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

impl LineFormat {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Plain,
        }
    }
}

/// Source of the process and thread identifiers used in line prefixes.
pub trait CallerIdentity: Send + Sync {
    fn pid(&self) -> u32;
    fn tid(&self) -> u64;
}

/// Process id from the OS, thread ids handed out sequentially per thread.
///
/// Portable default for embedders that have no kernel thread ids; the C
/// boundary installs an identity backed by `gettid`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdIdentity;

static NEXT_TID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TAG: Cell<u64> = const { Cell::new(0) };
}

impl CallerIdentity for StdIdentity {
    fn pid(&self) -> u32 {
        std::process::id()
    }

    fn tid(&self) -> u64 {
        THREAD_TAG.with(|tag| {
            if tag.get() == 0 {
                tag.set(NEXT_TID.fetch_add(1, Ordering::Relaxed));
            }
            tag.get()
        })
    }
}

#[derive(Serialize)]
struct LineRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tid: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<Severity>,
    message: &'a str,
}

/// Render one newline-terminated line.
pub(crate) fn render_line(
    format: LineFormat,
    prefix: Option<(u32, u64)>,
    severity: Option<Severity>,
    message: &str,
) -> String {
    let message = message.trim_end_matches(['\n', '\r']);
    let mut line = String::with_capacity(message.len() + 32);
    match format {
        LineFormat::Plain => {
            if let Some((pid, tid)) = prefix {
                let _ = write!(line, "{pid} {tid}: ");
            }
            line.push_str(message);
        }
        LineFormat::Json => {
            let record = LineRecord {
                pid: prefix.map(|(pid, _)| pid),
                tid: prefix.map(|(_, tid)| tid),
                level: severity,
                message,
            };
            match serde_json::to_string(&record) {
                Ok(json) => line.push_str(&json),
                Err(_) => line.push_str(message),
            }
        }
    }
    line.push('\n');
    line
}

/// Resolved, writable destination.
pub(crate) enum Sink {
    Stdout,
    Stderr,
    File(File),
    Writer(Box<dyn Write + Send>),
    /// The destination could not be opened; lines are dropped.
    Unavailable,
}

impl Sink {
    pub(crate) fn open(destination: &LogDestination) -> io::Result<Self> {
        match destination {
            LogDestination::Stdout => Ok(Self::Stdout),
            LogDestination::Stderr => Ok(Self::Stderr),
            LogDestination::Path(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(Self::File),
        }
    }

    pub(crate) fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(line)?;
                out.flush()
            }
            Self::Stderr => io::stderr().lock().write_all(line),
            Self::File(file) => file.write_all(line),
            Self::Writer(writer) => {
                writer.write_all(line)?;
                writer.flush()
            }
            Self::Unavailable => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "memory log destination unavailable",
            )),
        }
    }

    /// Raw descriptor of the destination, when it has one.
    pub(crate) fn raw_fd(&self) -> Option<i32> {
        match self {
            Self::Stdout => Some(1),
            Self::Stderr => Some(2),
            #[cfg(unix)]
            Self::File(file) => {
                use std::os::fd::AsRawFd;
                Some(file.as_raw_fd())
            }
            #[cfg(not(unix))]
            Self::File(_) => None,
            Self::Writer(_) | Self::Unavailable => None,
        }
    }
}
