//! # zcompat-core
//!
//! Safe Rust core of the zcompat POSIX-compatibility shim for CCSID platforms.
//!
//! Two components share one immutable, environment-derived [`ShimConfig`]:
//!
//! - **Encoding state registry** (`ccsid`): tracks, per open file descriptor,
//!   whether transfers are raw binary, ambient auto-converted text, or text
//!   pinned to a specific CCSID, plus an orthogonal "auto-conversion disabled"
//!   flag.
//! - **Memory diagnostics policy** (`memlog`): decides on every allocation
//!   event whether a diagnostic line is written, where it goes, and suppresses
//!   lines until a monitored value has grown by a configured increment.
//!
//! No `unsafe` code is permitted at the crate level. The `extern "C"`
//! surface lives in `zcompat-abi`.

#![deny(unsafe_code)]

pub mod ccsid;
pub mod config;
pub mod error;
pub mod memlog;

pub use ccsid::{
    AssumeOpen, Ccsid, CcsidRegistry, CodesetResolver, CodesetTable, DescriptorOracle,
    EncodingMode, EncodingState, TransferPlan,
};
pub use config::{MemlogConfig, ShimConfig};
pub use error::{CcsidError, ConfigError};
pub use memlog::{
    IncrementTracker, LineFormat, LogDestination, MemoryAccount, MemoryLogger, Severity,
    Verbosity,
};
