//! Shared internal utilities for ABI adapters.

use std::ffi::{c_char, c_int};

/// Scan a C string with an optional hard bound.
///
/// Returns `(len, terminated)` where `len` is the byte length before the first
/// NUL (or the bound) and `terminated` says whether a NUL was seen.
///
/// # Safety
///
/// `ptr` must be valid to read up to the discovered length (and bound when given).
pub unsafe fn scan_c_string(ptr: *const c_char, bound: Option<usize>) -> (usize, bool) {
    match bound {
        Some(limit) => {
            for i in 0..limit {
                if unsafe { *ptr.add(i) } == 0 {
                    return (i, true);
                }
            }
            (limit, false)
        }
        None => {
            let mut i = 0usize;
            while unsafe { *ptr.add(i) } != 0 {
                i += 1;
            }
            (i, true)
        }
    }
}

/// Borrow a NUL-terminated caller string as bytes.
///
/// Null pointers and strings that hit `bound` before a NUL yield `None`.
///
/// # Safety
///
/// A non-null `ptr` must be readable up to its NUL or `bound`, whichever comes
/// first, and stay valid for `'a`.
pub unsafe fn c_str_bytes<'a>(ptr: *const c_char, bound: Option<usize>) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    let (len, terminated) = unsafe { scan_c_string(ptr, bound) };
    if !terminated {
        return None;
    }
    // SAFETY: the scan above read `len` bytes from `ptr`.
    Some(unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) })
}

/// Store `val` into the calling thread's `errno`.
#[inline]
pub(crate) fn set_abi_errno(val: c_int) {
    // SAFETY: the errno location is thread-local and always writable.
    unsafe { *errno_location() = val };
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
unsafe fn errno_location() -> *mut c_int {
    #[cfg(target_os = "linux")]
    let p = unsafe { libc::__errno_location() };
    #[cfg(target_os = "android")]
    let p = unsafe { libc::__errno() };
    p
}

#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
#[inline]
unsafe fn errno_location() -> *mut c_int {
    unsafe { libc::__error() }
}
