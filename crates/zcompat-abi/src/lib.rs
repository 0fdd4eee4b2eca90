// Every extern "C" export here takes raw values from C callers and validates
// them itself; per-function safety docs would restate the C contract.
#![allow(clippy::missing_safety_doc)]
//! # zcompat-abi
//!
//! `extern "C"` boundary of the zcompat shim. Produces `libzcompat_abi.so` with the
//! descriptor CCSID entry points and the memory-diagnostics entry points that
//! the compatibility layer's open/dup/read/write paths and allocator wrappers
//! call.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> process runtime -> zcompat-core -> return
//! ```
//!
//! Setters return `0` on success and `-1` with `errno` set on failure
//! (`EBADF` for descriptors that are not open, `EINVAL` for bad CCSIDs and
//! unknown codeset names). Nothing here aborts the process.

#[macro_use]
mod macros;

mod descriptor;
mod identity;
mod runtime;

pub mod ccsid_abi;
pub mod memlog_abi;
pub mod util;

pub use descriptor::KernelFdTable;
pub use identity::{KernelIdentity, current_tid};
