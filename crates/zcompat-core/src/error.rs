//! Error types for the registry and configuration layers.
//!
//! Registry errors are always recoverable and never partially applied: a
//! failed setter leaves the descriptor's previous state untouched. Logging
//! sink failures are not represented here; they are swallowed inside
//! [`crate::memlog::MemoryLogger`].

use thiserror::Error;

/// Failure of an encoding-state operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CcsidError {
    /// The descriptor is negative, out of the trackable range, or not open
    /// according to the surrounding I/O layer.
    #[error("descriptor {0} is not an open file descriptor")]
    InvalidDescriptor(i32),
    /// A codeset name has no known CCSID mapping.
    #[error("unknown codeset name {0:?}")]
    UnknownCodeset(String),
    /// The value cannot pin a descriptor: zero (untagged), the binary marker,
    /// or a packed tag word with bits outside the CCSID and text flag.
    #[error("value {0:#x} is not a usable ccsid")]
    InvalidCcsid(u32),
}

impl CcsidError {
    /// True for the invalid-descriptor class.
    #[must_use]
    pub const fn is_bad_descriptor(&self) -> bool {
        matches!(self, Self::InvalidDescriptor(_))
    }
}

/// Failure to parse a configuration value strictly.
///
/// [`crate::ShimConfig::from_lookup`] never surfaces these; it falls back to
/// defaults. They are returned by the `parse_*` helpers in [`crate::config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}: {value:?} is not a byte count")]
    InvalidByteCount { key: &'static str, value: String },
    #[error("{key}: {value:?} is not a ccsid")]
    InvalidCcsid { key: &'static str, value: String },
    #[error("{key}: {value:?} is not a boolean switch")]
    InvalidSwitch { key: &'static str, value: String },
}
