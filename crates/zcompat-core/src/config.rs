//! Process configuration.
//!
//! Everything tunable is read from the environment exactly once and frozen
//! into a [`ShimConfig`], which both the encoding registry and the memory
//! logger hold through an `Arc`:
//!
//! - `ZCOMPAT_MEMLOG`: memory logging switch (`1|true|on|yes` / `0|false|off|no`).
//!   When unset, logging is on iff `ZCOMPAT_MEMLOG_FILE` is set.
//! - `ZCOMPAT_MEMLOG_FILE`: `stdout`, `stderr` (default) or a file path.
//! - `ZCOMPAT_MEMLOG_LEVEL`: `errors` (default), `warnings` or `all`.
//! - `ZCOMPAT_MEMLOG_INC`: increment threshold in bytes, `K`/`M`/`G` suffixes
//!   accepted. `0` (default) disables suppression.
//! - `ZCOMPAT_MEMLOG_FORMAT`: `plain` (default) or `json`.
//! - `ZCOMPAT_TEXT_CCSID`: CCSID applied by "set text" (default 819).
//! - `ZCOMPAT_PROGRAM_CCSID`: the program's own CCSID (default 1047).
//! - `ZCOMPAT_AUTOCVT`: ambient auto-conversion of untagged descriptors (default on).
//!
//! Unparseable values fall back to the default rather than failing startup.

use crate::ccsid::Ccsid;
use crate::error::ConfigError;
use crate::memlog::{LineFormat, LogDestination, Verbosity};

pub const MEMLOG_ENV: &str = "ZCOMPAT_MEMLOG";
pub const MEMLOG_FILE_ENV: &str = "ZCOMPAT_MEMLOG_FILE";
pub const MEMLOG_LEVEL_ENV: &str = "ZCOMPAT_MEMLOG_LEVEL";
pub const MEMLOG_INC_ENV: &str = "ZCOMPAT_MEMLOG_INC";
pub const MEMLOG_FORMAT_ENV: &str = "ZCOMPAT_MEMLOG_FORMAT";
pub const TEXT_CCSID_ENV: &str = "ZCOMPAT_TEXT_CCSID";
pub const PROGRAM_CCSID_ENV: &str = "ZCOMPAT_PROGRAM_CCSID";
pub const AUTOCVT_ENV: &str = "ZCOMPAT_AUTOCVT";

/// Memory diagnostics settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemlogConfig {
    /// Master switch. When false nothing is ever written.
    pub enabled: bool,
    pub verbosity: Verbosity,
    pub destination: LogDestination,
    /// Minimum growth before another increment line is emitted; 0 logs every event.
    pub increment_threshold: u64,
    pub format: LineFormat,
}

impl Default for MemlogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verbosity: Verbosity::ErrorsOnly,
            destination: LogDestination::Stderr,
            increment_threshold: 0,
            format: LineFormat::Plain,
        }
    }
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimConfig {
    pub memlog: MemlogConfig,
    /// CCSID pinned by "set text" requests.
    pub text_ccsid: Ccsid,
    /// CCSID the program itself works in; pinned descriptors in this CCSID
    /// need no transcoding.
    pub program_ccsid: Ccsid,
    /// Whether untagged descriptors are subject to the platform's ambient
    /// auto-conversion.
    pub ambient_autocvt: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            memlog: MemlogConfig::default(),
            text_ccsid: Ccsid::ISO8859_1,
            program_ccsid: Ccsid::IBM_1047,
            ambient_autocvt: true,
        }
    }
}

impl ShimConfig {
    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Invalid values are ignored in favour of the defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let file = lookup(MEMLOG_FILE_ENV).filter(|v| !v.trim().is_empty());
        let enabled = lookup(MEMLOG_ENV)
            .and_then(|v| parse_switch(MEMLOG_ENV, &v).ok())
            .unwrap_or(file.is_some());
        let destination = file
            .as_deref()
            .map(LogDestination::from_setting)
            .unwrap_or(defaults.memlog.destination);
        let verbosity = lookup(MEMLOG_LEVEL_ENV)
            .map(|v| Verbosity::from_str_loose(&v))
            .unwrap_or(defaults.memlog.verbosity);
        let increment_threshold = lookup(MEMLOG_INC_ENV)
            .and_then(|v| parse_byte_count(MEMLOG_INC_ENV, &v).ok())
            .unwrap_or(defaults.memlog.increment_threshold);
        let format = lookup(MEMLOG_FORMAT_ENV)
            .map(|v| LineFormat::from_str_loose(&v))
            .unwrap_or(defaults.memlog.format);

        Self {
            memlog: MemlogConfig {
                enabled,
                verbosity,
                destination,
                increment_threshold,
                format,
            },
            text_ccsid: lookup(TEXT_CCSID_ENV)
                .and_then(|v| parse_ccsid(TEXT_CCSID_ENV, &v).ok())
                .unwrap_or(defaults.text_ccsid),
            program_ccsid: lookup(PROGRAM_CCSID_ENV)
                .and_then(|v| parse_ccsid(PROGRAM_CCSID_ENV, &v).ok())
                .unwrap_or(defaults.program_ccsid),
            ambient_autocvt: lookup(AUTOCVT_ENV)
                .and_then(|v| parse_switch(AUTOCVT_ENV, &v).ok())
                .unwrap_or(defaults.ambient_autocvt),
        }
    }
}

/// Parse an on/off switch (case-insensitive).
pub fn parse_switch(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" | "y" => Ok(true),
        "0" | "false" | "off" | "no" | "n" => Ok(false),
        _ => Err(ConfigError::InvalidSwitch {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Parse a byte count such as `4096`, `64K`, `10m` or `1G`.
pub fn parse_byte_count(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidByteCount {
        key,
        value: raw.to_string(),
    };
    let trimmed = raw.trim();
    let (digits, shift) = match trimmed.as_bytes().last() {
        Some(b'k' | b'K') => (&trimmed[..trimmed.len() - 1], 10),
        Some(b'm' | b'M') => (&trimmed[..trimmed.len() - 1], 20),
        Some(b'g' | b'G') => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };
    let base: u64 = digits.trim().parse().map_err(|_| invalid())?;
    base.checked_mul(1u64 << shift).ok_or_else(invalid)
}

/// Parse a decimal CCSID that can pin a descriptor.
pub fn parse_ccsid(key: &'static str, raw: &str) -> Result<Ccsid, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .and_then(Ccsid::new)
        .ok_or_else(|| ConfigError::InvalidCcsid {
            key,
            value: raw.to_string(),
        })
}
