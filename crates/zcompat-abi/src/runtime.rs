//! Process-wide shim runtime shared by every ABI entry point.
//!
//! The registry, the memory logger and the allocation account are built once
//! from the process environment and live for the rest of the process.

use std::cell::Cell;
use std::ffi::CString;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering as AtomicOrdering};

use zcompat_core::{CcsidRegistry, CodesetTable, MemoryAccount, MemoryLogger, ShimConfig};

use crate::descriptor::KernelFdTable;
use crate::identity::KernelIdentity;

const STATE_UNINIT: u8 = 0;
const STATE_INITIALIZING: u8 = 1;
const STATE_READY: u8 = 2;

// OnceLock::get_or_init blocks on a futex when it sees init in progress, which
// deadlocks if building the runtime re-enters an entry point on the same
// thread (the logger allocates, and allocator wrappers report into us).
static RUNTIME_STATE: AtomicU8 = AtomicU8::new(STATE_UNINIT);
static RUNTIME_PTR: AtomicPtr<ShimRuntime> = AtomicPtr::new(std::ptr::null_mut());

thread_local! {
    static BUILDING_HERE: Cell<bool> = const { Cell::new(false) };
}

pub(crate) struct ShimRuntime {
    pub(crate) registry: CcsidRegistry,
    pub(crate) logger: Arc<MemoryLogger>,
    pub(crate) account: MemoryAccount,
    /// NUL-terminated destination name handed out by `__getMemoryUsageLogFile`.
    pub(crate) destination_name: Option<CString>,
}

impl ShimRuntime {
    fn from_env() -> Self {
        let config = Arc::new(ShimConfig::from_env());
        let registry = CcsidRegistry::with_collaborators(
            Arc::clone(&config),
            Box::new(KernelFdTable),
            Box::new(CodesetTable),
        );
        let logger = Arc::new(MemoryLogger::with_identity(
            Arc::clone(&config),
            Box::new(KernelIdentity),
        ));
        let destination_name = logger
            .is_enabled()
            .then(|| CString::new(logger.destination().name()).ok())
            .flatten();
        let account = MemoryAccount::new(Arc::clone(&logger));
        Self {
            registry,
            logger,
            account,
            destination_name,
        }
    }
}

#[inline]
fn ready() -> &'static ShimRuntime {
    // SAFETY: once READY, RUNTIME_PTR points at a leaked runtime that is never freed.
    unsafe { &*RUNTIME_PTR.load(AtomicOrdering::Acquire) }
}

/// The shared runtime, or `None` for a call that re-enters while this thread
/// is still building it.
pub(crate) fn runtime() -> Option<&'static ShimRuntime> {
    if RUNTIME_STATE.load(AtomicOrdering::Acquire) == STATE_READY {
        return Some(ready());
    }
    if BUILDING_HERE.with(Cell::get) {
        return None;
    }

    if RUNTIME_STATE
        .compare_exchange(
            STATE_UNINIT,
            STATE_INITIALIZING,
            AtomicOrdering::SeqCst,
            AtomicOrdering::Relaxed,
        )
        .is_err()
    {
        // Another thread owns the build; it never calls back into this thread.
        while RUNTIME_STATE.load(AtomicOrdering::Acquire) != STATE_READY {
            std::hint::spin_loop();
        }
        return Some(ready());
    }

    BUILDING_HERE.with(|b| b.set(true));
    let ptr = Box::into_raw(Box::new(ShimRuntime::from_env()));
    RUNTIME_PTR.store(ptr, AtomicOrdering::Release);
    RUNTIME_STATE.store(STATE_READY, AtomicOrdering::Release);
    BUILDING_HERE.with(|b| b.set(false));

    Some(ready())
}

thread_local! {
    static REPORT_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Held while an allocator report is being logged on this thread.
pub(crate) struct ReportGuard;

impl Drop for ReportGuard {
    fn drop(&mut self) {
        REPORT_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Claim the per-thread report slot. `None` means an allocation made while
/// logging a report came back through the allocator wrapper.
#[inline]
pub(crate) fn enter_report_guard() -> Option<ReportGuard> {
    REPORT_DEPTH.with(|depth| {
        if depth.get() > 0 {
            None
        } else {
            depth.set(1);
            Some(ReportGuard)
        }
    })
}
