//! Memory diagnostics entry points.
//!
//! Query functions are cheap and safe to call from allocator wrappers before
//! deciding whether to format anything. Output goes through `__memputs`
//! (with the `pid tid: ` prefix) or `__memputsx` (without).

use std::ffi::{c_char, c_int, c_void};

use zcompat_core::IncrementTracker;

use crate::runtime;
use crate::util::c_str_bytes;

abi_fn! {
    /// Whether memory-usage logging is enabled for this process.
    fn __doLogMemoryUsage() -> bool {
        runtime::runtime().is_some_and(|rt| rt.logger.is_enabled())
    }
}

/// Destination name (`"stdout"`, `"stderr"` or a path), or null when logging
/// is disabled. The string lives for the rest of the process.
#[unsafe(no_mangle)]
pub extern "C" fn __getMemoryUsageLogFile() -> *const c_char {
    runtime::runtime()
        .and_then(|rt| rt.destination_name.as_deref())
        .map_or(std::ptr::null(), |name| name.as_ptr())
}

abi_fn! {
    /// Whether informational lines should be written.
    fn __doLogMemoryAll() -> bool {
        runtime::runtime().is_some_and(|rt| rt.logger.logs_all_messages())
    }
}

abi_fn! {
    /// Whether only warnings (and errors) are requested.
    fn __doLogMemoryWarning() -> bool {
        runtime::runtime().is_some_and(|rt| rt.logger.logs_warnings_only())
    }
}

/// Whether `curval` grew far enough past the last reported value to log again.
///
/// `*plastval == 0` means nothing was reported yet. When this returns true,
/// `*plastval` is updated to `curval`. A null `plastval` is evaluated as a
/// first observation and nothing is stored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __doLogMemoryInc(curval: usize, plastval: *mut usize) -> bool {
    let Some(rt) = runtime::runtime() else {
        return false;
    };
    if plastval.is_null() {
        let mut tracker = IncrementTracker::new();
        return rt.logger.should_log_increment(curval as u64, &mut tracker);
    }
    // SAFETY: non-null pointer to caller-owned storage.
    let mut tracker = IncrementTracker::from_raw(unsafe { *plastval } as u64);
    let report = rt.logger.should_log_increment(curval as u64, &mut tracker);
    if report {
        // SAFETY: same pointer as above; the stored value came from a usize.
        unsafe { *plastval = tracker.to_raw() as usize };
    }
    report
}

abi_fn! {
    /// Raw descriptor of the log destination, or `-1` when logging is
    /// disabled or the destination could not be opened.
    fn __getLogMemoryFileNo() -> c_int {
        runtime::runtime()
            .and_then(|rt| rt.logger.sink_descriptor())
            .unwrap_or(-1)
    }
}

/// Shared body of `__memputs`/`__memputsx`. Formatting allocates, so a call
/// made from inside an allocator wrapper that is already logging on this
/// thread is dropped.
unsafe fn put_message(msg: *const c_char, include_prefix: bool) -> c_int {
    let Some(_guard) = runtime::enter_report_guard() else {
        return 0;
    };
    let Some(rt) = runtime::runtime() else {
        return 0;
    };
    if !rt.logger.is_enabled() {
        return 0;
    }
    // SAFETY: caller passes a NUL-terminated string.
    let Some(bytes) = (unsafe { c_str_bytes(msg, None) }) else {
        return 0;
    };
    let text = String::from_utf8_lossy(bytes);
    let written = rt.logger.emit(format_args!("{text}"), include_prefix);
    c_int::try_from(written).unwrap_or(c_int::MAX)
}

/// Write `msg` to the memory log prefixed with `pid tid: `.
/// Returns the number of bytes written, `0` when disabled, on failure, or
/// when re-entered from an allocation the same call made.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __memputs(msg: *const c_char) -> c_int {
    unsafe { put_message(msg, true) }
}

/// Like `__memputs` without the prefix.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __memputsx(msg: *const c_char) -> c_int {
    unsafe { put_message(msg, false) }
}

/// Record a successful allocation of `size` bytes at `ptr`.
/// Returns whether a line was written.
#[unsafe(no_mangle)]
pub extern "C" fn __memlog_alloc(ptr: *const c_void, size: usize) -> bool {
    let Some(_guard) = runtime::enter_report_guard() else {
        return false;
    };
    runtime::runtime().is_some_and(|rt| rt.account.record_alloc(ptr as usize, size as u64))
}

/// Record that the `size`-byte block at `ptr` was released.
#[unsafe(no_mangle)]
pub extern "C" fn __memlog_free(ptr: *const c_void, size: usize) -> bool {
    let Some(_guard) = runtime::enter_report_guard() else {
        return false;
    };
    runtime::runtime().is_some_and(|rt| rt.account.record_free(ptr as usize, size as u64))
}

/// Record that an allocation of `size` bytes failed.
#[unsafe(no_mangle)]
pub extern "C" fn __memlog_alloc_failed(size: usize) -> bool {
    let Some(_guard) = runtime::enter_report_guard() else {
        return false;
    };
    runtime::runtime().is_some_and(|rt| rt.account.record_failure(size as u64))
}
