//! Emission policy: verbosity filtering and increment-threshold suppression.

use serde::Serialize;

/// How much the memory logger reports. Errors are always reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verbosity {
    #[default]
    ErrorsOnly,
    WarningsAndErrors,
    All,
}

impl Verbosity {
    /// Parse from string (case-insensitive). Unknown values mean errors only.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "2" | "verbose" | "info" => Self::All,
            "warnings" | "warning" | "warn" | "1" => Self::WarningsAndErrors,
            _ => Self::ErrorsOnly,
        }
    }

    #[must_use]
    pub const fn logs_all(self) -> bool {
        matches!(self, Self::All)
    }

    /// True when warnings (and errors) but not informational lines are reported.
    #[must_use]
    pub const fn logs_warnings_only(self) -> bool {
        matches!(self, Self::WarningsAndErrors)
    }

    #[must_use]
    pub const fn permits(self, severity: Severity) -> bool {
        match severity {
            Severity::Error => true,
            Severity::Warning => !matches!(self, Self::ErrorsOnly),
            Severity::Info => matches!(self, Self::All),
        }
    }
}

/// Severity of a single memory diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Last value reported for one monitored counter.
///
/// Owned by the caller and mutated only through
/// [`should_log_increment`]; exclusive access (`&mut`) is the caller's
/// synchronisation, typically whatever lock already guards the counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IncrementTracker {
    last_reported: Option<u64>,
}

impl IncrementTracker {
    /// A tracker that has not observed anything yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_reported: None,
        }
    }

    /// Rebuild from C storage where 0 is the unobserved sentinel.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            last_reported: if raw == 0 { None } else { Some(raw) },
        }
    }

    /// C storage form; an unobserved tracker is 0.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        match self.last_reported {
            Some(v) => v,
            None => 0,
        }
    }

    #[must_use]
    pub const fn last_reported(self) -> Option<u64> {
        self.last_reported
    }
}

/// Decide whether `current` has grown enough since the last report.
///
/// A threshold of 0 always reports. Otherwise the first observation always
/// reports, and later ones report once `current >= last + threshold`. Only a
/// reporting decision replaces the tracked value.
pub fn should_log_increment(threshold: u64, current: u64, tracker: &mut IncrementTracker) -> bool {
    let report = match tracker.last_reported {
        _ if threshold == 0 => true,
        None => true,
        Some(last) => current >= last.saturating_add(threshold),
    };
    if report {
        tracker.last_reported = Some(current);
    }
    report
}
