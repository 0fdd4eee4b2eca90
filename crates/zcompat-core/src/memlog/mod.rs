//! Memory allocation diagnostics.
//!
//! The policy is cheap on the allocator hot path: a disabled
//! logger is one boolean load, and increment suppression is a compare on
//! caller-owned state with no locking of its own.
//!
//! - [`policy`]: verbosity levels and the increment-threshold decision.
//! - [`sink`]: destinations, line layout, caller identity.
//! - [`MemoryLogger`]: configuration reads, destination caching, emission.
//! - [`MemoryAccount`]: outstanding-bytes bookkeeping for allocator wrappers.

mod account;
mod logger;
mod metrics;
pub mod policy;
pub mod sink;

pub use account::{AccountSnapshot, MemoryAccount};
pub use logger::MemoryLogger;
pub use metrics::{MemlogMetrics, MemlogSnapshot};
pub use policy::{IncrementTracker, Severity, Verbosity, should_log_increment};
pub use sink::{CallerIdentity, LineFormat, LogDestination, StdIdentity};

/// Write a memory diagnostic line prefixed with the process and thread ids.
///
/// ```ignore
/// memlog!(logger, "malloc({}) = {:p}", size, ptr);
/// ```
#[macro_export]
macro_rules! memlog {
    ($logger:expr, $($arg:tt)+) => {
        $logger.emit(::std::format_args!($($arg)+), true)
    };
}

/// Write a memory diagnostic line without the id prefix.
#[macro_export]
macro_rules! memlogx {
    ($logger:expr, $($arg:tt)+) => {
        $logger.emit(::std::format_args!($($arg)+), false)
    };
}
