//! Descriptor CCSID entry points.
//!
//! Called by the shim's open/dup/close wrappers and by programs that tag their
//! own descriptors. All setters follow the `0` / `-1 + errno` convention.

use std::ffi::{c_char, c_int, c_ushort};

use zcompat_core::{CcsidError, CcsidRegistry};

use crate::runtime;
use crate::util::{c_str_bytes, set_abi_errno};

/// Longest codeset name accepted by `__chgfdcodeset`, excluding the NUL.
const MAX_CODESET_NAME: usize = 64;

#[inline]
fn errno_for(err: &CcsidError) -> c_int {
    if err.is_bad_descriptor() {
        libc::EBADF
    } else {
        libc::EINVAL
    }
}

/// Run `op` against the process registry and fold the outcome into the C
/// return convention.
#[inline]
fn with_registry<F>(op: F) -> c_int
where
    F: FnOnce(&CcsidRegistry) -> Result<c_int, CcsidError>,
{
    let Some(rt) = runtime::runtime() else {
        set_abi_errno(libc::EAGAIN);
        return -1;
    };
    match op(&rt.registry) {
        Ok(rc) => rc,
        Err(err) => {
            set_abi_errno(errno_for(&err));
            -1
        }
    }
}

abi_fn! {
    /// Tag word of `fd`: bit 16 is the text flag, the low 16 bits the CCSID.
    /// Untracked descriptors report `0`; binary ones report `0xffff`.
    fn __getfdccsid(fd: c_int) -> c_int {
        with_registry(|reg| {
            if !reg.is_valid(fd) {
                return Err(CcsidError::InvalidDescriptor(fd));
            }
            // The tag word never exceeds 17 bits.
            Ok(reg.tag(fd) as c_int)
        })
    }
}

abi_fn! {
    /// Apply a full tag word to `fd`. Negative words carry bits above the
    /// text flag and are rejected as invalid.
    fn __setfdccsid(fd: c_int, t_ccsid: c_int) -> c_int {
        with_registry(|reg| reg.set_tag(fd, t_ccsid as u32).map(|()| 0))
    }
}

abi_fn! {
    /// Pin `fd` to a numeric CCSID.
    fn __chgfdccsid(fd: c_int, ccsid: c_ushort) -> c_int {
        with_registry(|reg| reg.set_ccsid(fd, ccsid).map(|()| 0))
    }
}

/// Pin `fd` to the CCSID named by `codeset`, e.g. `"ISO8859-1"` or `"IBM-1047"`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __chgfdcodeset(fd: c_int, codeset: *const c_char) -> c_int {
    // SAFETY: caller passes a NUL-terminated string; the scan is bounded.
    let name = unsafe { c_str_bytes(codeset, Some(MAX_CODESET_NAME + 1)) };
    with_registry(|reg| {
        if !reg.is_valid(fd) {
            return Err(CcsidError::InvalidDescriptor(fd));
        }
        let name = name.ok_or_else(|| CcsidError::UnknownCodeset(String::new()))?;
        let name = std::str::from_utf8(name)
            .map_err(|_| CcsidError::UnknownCodeset(String::from_utf8_lossy(name).into_owned()))?;
        reg.set_ccsid_from_codeset(fd, name).map(|()| 0)
    })
}

abi_fn! {
    /// Pin `fd` to the configured text CCSID.
    fn __setfdtext(fd: c_int) -> c_int {
        with_registry(|reg| reg.set_text(fd).map(|()| 0))
    }
}

abi_fn! {
    /// Mark `fd` binary: bytes move without conversion.
    fn __setfdbinary(fd: c_int) -> c_int {
        with_registry(|reg| reg.set_binary(fd).map(|()| 0))
    }
}

abi_fn! {
    /// Turn off automatic conversion on `fd` while keeping its tag.
    fn __disableautocvt(fd: c_int) -> c_int {
        with_registry(|reg| reg.disable_auto_convert(fd).map(|()| 0))
    }
}

abi_fn! {
    /// Give `destfd` the encoding mode of `sourcefd`.
    fn __copyfdccsid(sourcefd: c_int, destfd: c_int) -> c_int {
        with_registry(|reg| reg.copy_ccsid(sourcefd, destfd).map(|()| 0))
    }
}

abi_fn! {
    /// A fresh descriptor was opened with number `fd`; forget any stale state.
    fn __fdopened(fd: c_int) -> c_int {
        with_registry(|reg| {
            reg.notify_opened(fd);
            Ok(0)
        })
    }
}

abi_fn! {
    /// `newfd` was produced by duplicating `oldfd`.
    fn __fdduped(oldfd: c_int, newfd: c_int) -> c_int {
        with_registry(|reg| reg.notify_duplicated(oldfd, newfd).map(|()| 0))
    }
}

abi_fn! {
    /// `fd` was closed. Idempotent.
    fn __fdclosed(fd: c_int) -> c_int {
        with_registry(|reg| {
            reg.notify_closed(fd);
            Ok(0)
        })
    }
}
