//! Process and thread ids as the operating system reports them.

use zcompat_core::memlog::CallerIdentity;

/// Prefixes lines with `getpid()` and the kernel thread id, so a line can be
/// matched against `/proc/<pid>/task/<tid>`, `ps -L` or a debugger.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelIdentity;

impl CallerIdentity for KernelIdentity {
    fn pid(&self) -> u32 {
        // SAFETY: getpid has no preconditions and cannot fail.
        unsafe { libc::getpid() as u32 }
    }

    fn tid(&self) -> u64 {
        current_tid()
    }
}

/// Kernel thread id of the caller.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn current_tid() -> u64 {
    // SAFETY: SYS_gettid takes no arguments and cannot fail.
    unsafe { libc::syscall(libc::SYS_gettid) as u64 }
}

/// Thread handle of the caller where no kernel thread id is exposed.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn current_tid() -> u64 {
    // SAFETY: pthread_self has no preconditions.
    unsafe { libc::pthread_self() as usize as u64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_matches_std() {
        assert_eq!(KernelIdentity.pid(), std::process::id());
    }

    #[test]
    fn threads_get_distinct_stable_ids() {
        let here = KernelIdentity.tid();
        assert_eq!(here, KernelIdentity.tid());
        let other = std::thread::spawn(|| KernelIdentity.tid()).join().unwrap();
        assert_ne!(here, other);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn tid_is_listed_under_proc_task() {
        let task = format!("/proc/self/task/{}", KernelIdentity.tid());
        assert!(std::path::Path::new(&task).exists());
    }
}
