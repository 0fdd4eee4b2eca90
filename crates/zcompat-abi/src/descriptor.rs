//! Descriptor validity backed by the kernel fd table.

use std::ffi::c_int;

use zcompat_core::DescriptorOracle;

/// Treats a descriptor as open when `fcntl(fd, F_GETFD)` succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelFdTable;

impl DescriptorOracle for KernelFdTable {
    fn is_open(&self, fd: i32) -> bool {
        if fd < 0 {
            return false;
        }
        // SAFETY: F_GETFD takes no pointer argument and only inspects the fd table.
        let rc: c_int = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        rc != -1
    }
}
